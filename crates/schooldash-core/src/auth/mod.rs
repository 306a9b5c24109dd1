//! Authentication and account management.
//!
//! This module provides:
//! - `AuthService`: sign-in/up/out and profile edits against the backend
//! - `Session`: the signed-in session persisted to `session.json`
//! - `CredentialStore`: remembered passwords via the OS keychain
//! - `SignInForm` / `SignUpForm`: validated before any network call

pub mod credentials;
pub mod error;
pub mod forms;
pub mod service;
pub mod session;

pub use credentials::CredentialStore;
pub use error::AuthError;
pub use forms::{SignInForm, SignUpForm};
pub use service::{AuthService, DEFAULT_AUTH_TIMEOUT_SECS};
pub use session::{Session, SessionData};
