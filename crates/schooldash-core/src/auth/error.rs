use thiserror::Error;
use validator::ValidationErrors;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Please confirm your email address before signing in")]
    EmailNotConfirmed,

    #[error("Too many attempts - please wait a moment and try again")]
    RateLimited,

    #[error("New sign-ups are currently disabled")]
    SignupsDisabled,

    #[error("Could not reach the server: {0}")]
    Network(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("{0}")]
    Backend(String),
}

impl AuthError {
    /// Classify the auth service's human-readable error text.
    pub fn from_backend_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("invalid login credentials") {
            AuthError::InvalidCredentials
        } else if lower.contains("email not confirmed") {
            AuthError::EmailNotConfirmed
        } else if lower.contains("rate limit") || lower.contains("too many requests") {
            AuthError::RateLimited
        } else if lower.contains("signups not allowed") || lower.contains("signup is disabled") {
            AuthError::SignupsDisabled
        } else {
            AuthError::Backend(message.to_string())
        }
    }

    /// Field name to messages, for showing next to form inputs.
    pub fn field_messages(&self) -> Vec<(String, String)> {
        let AuthError::Validation(errors) = self else {
            return Vec::new();
        };
        let mut messages: Vec<(String, String)> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let text = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    (field.to_string(), text)
                })
            })
            .collect();
        messages.sort();
        messages
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::BadRequest(msg) | ApiError::AccessDenied(msg) => {
                AuthError::from_backend_message(&msg)
            }
            ApiError::Unauthorized => AuthError::InvalidCredentials,
            ApiError::RateLimited => AuthError::RateLimited,
            ApiError::NetworkError(_) | ApiError::Timeout(_) => AuthError::Network(err.to_string()),
            other => AuthError::Backend(other.to_string()),
        }
    }
}
