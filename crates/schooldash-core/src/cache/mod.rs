//! In-memory caching for dashboard data.
//!
//! This module provides:
//! - `TtlCache`: key/value store whose entries expire after a time-to-live
//! - `RequestDeduplicator`: collapses concurrent identical fetches into one
//! - `Clock`: injectable time source so expiry is testable
//!
//! Both stores are constructed explicitly and shared by `Arc`; nothing is
//! global. They live for the process only and are wiped on sign-out so one
//! user's data never leaks to the next.

pub mod clock;
pub mod dedup;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dedup::{RequestDeduplicator, DEFAULT_DEDUP_TTL_SECS};
pub use ttl::{CacheEntry, TtlCache, DEFAULT_TTL_SECS};
