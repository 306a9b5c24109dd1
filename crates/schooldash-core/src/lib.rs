//! Core library for schooldash.
//!
//! Data layer for the school management dashboards:
//! - `api`: backend client and typed collection fetchers
//! - `cache`: TTL cache and request deduplicator
//! - `fetch`: all-settled parallel fetching with cancellation
//! - `aggregate`: attendance and fee summaries
//! - `dashboard`: per-slice dashboard loaders
//! - `auth`: sessions, sign-in and profile edits

pub mod aggregate;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod models;
pub mod utils;

pub use config::Config;
