//! Client for the hosted school backend.
//!
//! This module provides:
//! - `SchoolBackend`: the auth + row API seam, implemented over HTTP by
//!   `RestBackend`
//! - `SchoolApi`: typed fetchers for each collection
//! - `Query`: the row filter/order/limit builder
//!
//! Requests carry the project's anonymous key plus the user's bearer token
//! once signed in.

pub mod backend;
pub mod client;
pub mod error;
pub mod query;
pub mod school;

#[cfg(test)]
pub mod fake;

pub use backend::{AuthSession, AuthUser, SchoolBackend};
pub use client::RestBackend;
pub use error::{ApiError, SharedError};
pub use query::{Filter, Query};
pub use school::SchoolApi;
