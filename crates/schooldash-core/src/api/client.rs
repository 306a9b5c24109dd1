//! HTTP implementation of `SchoolBackend` for the hosted backend.
//!
//! Auth calls go to `/auth/v1/*`, row reads and writes to `/rest/v1/<table>`.
//! Every request carries the project's anonymous key in the `apikey` header
//! and a bearer token (the user's access token once signed in).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use reqwest::{header, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::backend::{AuthSession, AuthUser, SchoolBackend};
use super::{ApiError, Query};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) reads.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Upper bound on random jitter added to each backoff step.
const BACKOFF_JITTER_MS: u64 = 250;

/// API client for the hosted backend.
/// Clone is cheap - reqwest::Client and the token slot are reference counted.
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    token: Arc<RwLock<Option<String>>>,
}

impl RestBackend {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self
            .token
            .read()
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());

        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(bearer)
    }

    fn map_send_error(err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(REQUEST_TIMEOUT_SECS)
        } else {
            ApiError::NetworkError(err)
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Like `check_response`, but returns Ok(None) for a 429 so the caller can
    /// back off and retry.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            Self::check_response(response).await.map(Some)
        }
    }

    async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T, ApiError> {
        let text = response.text().await.map_err(Self::map_send_error)?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    /// Send a read, backing off on 429s.
    async fn send_with_retry(
        &self,
        build: impl Fn() -> RequestBuilder,
        url: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build().send().await.map_err(Self::map_send_error)?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    let jitter = rand::thread_rng().gen_range(0..=BACKOFF_JITTER_MS);
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms + jitter)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }
}

#[async_trait]
impl SchoolBackend for RestBackend {
    fn set_access_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ApiError> {
        let url = self.auth_url("token?grant_type=password");
        let body = serde_json::json!({ "email": email, "password": password });

        let response = self
            .request(Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let response = Self::check_response(response).await?;
        let session: AuthSession = Self::parse_json(response, "auth response").await?;
        debug!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthUser, ApiError> {
        let url = self.auth_url("signup");
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        });

        let response = self
            .request(Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let response = Self::check_response(response).await?;
        let value: Value = Self::parse_json(response, "signup response").await?;

        // With email confirmation enabled the user object comes back bare;
        // otherwise it is wrapped in a session.
        let user = match value.get("user") {
            Some(user) => user.clone(),
            None => value,
        };
        serde_json::from_value(user)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse signup user: {}", e)))
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        let url = self.auth_url("logout");
        let response = self
            .request(Method::POST, &url)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn get_user(&self) -> Result<AuthUser, ApiError> {
        let url = self.auth_url("user");
        let response = self
            .send_with_retry(|| self.request(Method::GET, &url), &url)
            .await?;
        Self::parse_json(response, "user response").await
    }

    async fn select(&self, query: &Query) -> Result<Vec<Value>, ApiError> {
        let url = self.rest_url(query.table_name());
        let params = query.to_params();
        debug!(table = query.table_name(), ?params, "Selecting rows");

        let response = self
            .send_with_retry(|| self.request(Method::GET, &url).query(&params), &url)
            .await?;
        Self::parse_json(response, query.table_name()).await
    }

    async fn update(&self, query: &Query, patch: &Value) -> Result<Vec<Value>, ApiError> {
        let url = self.rest_url(query.table_name());
        let params = query.filter_params();

        let response = self
            .request(Method::PATCH, &url)
            .query(&params)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response, query.table_name()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_strip_trailing_slash() {
        let backend = RestBackend::new("https://example.test/", "anon").unwrap();
        assert_eq!(backend.rest_url("fees"), "https://example.test/rest/v1/fees");
        assert_eq!(
            backend.auth_url("token?grant_type=password"),
            "https://example.test/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn test_set_access_token_shared_between_clones() {
        let backend = RestBackend::new("https://example.test", "anon").unwrap();
        let clone = backend.clone();
        backend.set_access_token(Some("jwt".to_string()));
        assert_eq!(clone.token.read().as_deref(), Some("jwt"));
        backend.set_access_token(None);
        assert!(clone.token.read().is_none());
    }
}
