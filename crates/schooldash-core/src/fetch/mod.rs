//! Concurrent, failure-tolerant fetching.
//!
//! `Orchestrator` settles a set of independent fetches (never fail-fast),
//! routing each through the request deduplicator and the TTL cache.
//! `CancelToken` lets an owner abort everything a load started.

pub mod cancel;
pub mod orchestrator;

pub use cancel::CancelToken;
pub use orchestrator::{CachePolicy, FetchDescriptor, FetchResult, Orchestrator, SliceOutcome};
