//! Dashboard data loaders.
//!
//! A dashboard is a set of independently loaded slices. Each slice moves
//! through `Loading → Success | Error` on its own; one slice failing never
//! blanks or blocks another.

pub mod parent;
pub mod slice;

pub use parent::{DashboardSnapshot, ParentDashboard, SliceKind, CACHE_NAMESPACE};
pub use slice::{LoadState, Slice, SliceStatus};
