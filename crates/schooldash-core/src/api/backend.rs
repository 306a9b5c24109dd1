use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiError, Query};

/// User identity as returned by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

/// Tokens issued by a successful password sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    pub user: AuthUser,
}

/// The remote data backend: an auth service plus a row API over named
/// collections.
///
/// Rows come back as raw JSON so the trait stays object-safe; `SchoolApi`
/// decodes them into typed models.
#[async_trait]
pub trait SchoolBackend: Send + Sync {
    /// Bearer token used for subsequent requests; `None` falls back to the
    /// anonymous key.
    fn set_access_token(&self, token: Option<String>);

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<AuthSession, ApiError>;

    async fn sign_up(&self, email: &str, password: &str, full_name: &str)
        -> Result<AuthUser, ApiError>;

    async fn sign_out(&self) -> Result<(), ApiError>;

    async fn get_user(&self) -> Result<AuthUser, ApiError>;

    async fn select(&self, query: &Query) -> Result<Vec<Value>, ApiError>;

    /// Patch every row matching the query's filters and return the updated rows.
    async fn update(&self, query: &Query, patch: &Value) -> Result<Vec<Value>, ApiError>;
}
