use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use validator::Validate;

use super::{AuthError, Session, SessionData, SignInForm, SignUpForm};
use crate::api::{ApiError, AuthSession, AuthUser, SchoolApi, SchoolBackend};
use crate::cache::{RequestDeduplicator, TtlCache};
use crate::models::{Profile, ProfileUpdate};

/// Default time allowed for one sign-in or sign-up call.
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 10;

/// Cache key prefix for profile rows.
const PROFILE_NAMESPACE: &str = "profile_";

/// Sign-in, sign-up, sign-out and profile edits for the current user.
///
/// Owns the persisted session and, on sign-out, wipes the shared cache and
/// deduplicator so nothing from one account leaks into the next.
pub struct AuthService {
    backend: Arc<dyn SchoolBackend>,
    api: SchoolApi,
    cache: Arc<TtlCache>,
    dedup: Arc<RequestDeduplicator>,
    session: Mutex<Session>,
    timeout: Duration,
}

impl AuthService {
    pub fn new(
        backend: Arc<dyn SchoolBackend>,
        cache: Arc<TtlCache>,
        dedup: Arc<RequestDeduplicator>,
        session_dir: PathBuf,
    ) -> Self {
        Self {
            api: SchoolApi::new(backend.clone()),
            backend,
            cache,
            dedup,
            session: Mutex::new(Session::new(session_dir)),
            timeout: Duration::from_secs(DEFAULT_AUTH_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn sign_in(&self, form: &SignInForm) -> Result<SessionData, AuthError> {
        form.validate()?;
        debug!(email = %form.email, "Signing in");

        let auth = match self.attempt_sign_in(form).await {
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "Sign-in failed on transport, retrying once");
                self.attempt_sign_in(form).await
            }
            other => other,
        }?;

        self.backend.set_access_token(Some(auth.access_token.clone()));
        let data = SessionData::from_auth(&auth, Utc::now());
        {
            let mut session = self.session.lock();
            session.update(data.clone());
            if let Err(e) = session.save() {
                warn!(error = %e, "Failed to persist session");
            }
        }
        info!(user_id = %data.user_id, "Signed in");
        Ok(data)
    }

    async fn attempt_sign_in(&self, form: &SignInForm) -> Result<AuthSession, ApiError> {
        let call = self.backend.sign_in_with_password(&form.email, &form.password);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(self.timeout.as_secs())),
        }
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<AuthUser, AuthError> {
        form.validate()?;
        let call = self
            .backend
            .sign_up(&form.email, &form.password, form.full_name.trim());
        let user = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result?,
            Err(_) => return Err(ApiError::Timeout(self.timeout.as_secs()).into()),
        };
        info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    /// Sign out locally even when the backend cannot be reached.
    pub async fn sign_out(&self) {
        if let Err(e) = self.backend.sign_out().await {
            warn!(error = %e, "Backend sign-out failed, clearing local session anyway");
        }
        self.backend.set_access_token(None);
        if let Err(e) = self.session.lock().clear() {
            warn!(error = %e, "Failed to remove session file");
        }
        let removed = self.cache.clear(None);
        self.dedup.clear();
        info!(removed, "Signed out");
    }

    /// The active session, restoring an unexpired one from disk if needed.
    pub fn current_session(&self) -> Option<SessionData> {
        let mut session = self.session.lock();
        if !session.is_valid() {
            match session.load() {
                Ok(true) => debug!("Restored session from disk"),
                Ok(false) => return None,
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable session file");
                    return None;
                }
            }
        }
        let data = session.data.clone()?;
        self.backend.set_access_token(Some(data.token.clone()));
        Some(data)
    }

    fn require_user(&self) -> Result<String, AuthError> {
        self.current_session()
            .map(|s| s.user_id)
            .ok_or(AuthError::NotSignedIn)
    }

    /// The signed-in user's profile, served from cache when fresh.
    pub async fn profile(&self) -> Result<Profile, AuthError> {
        let user_id = self.require_user()?;
        let key = format!("{}{}", PROFILE_NAMESPACE, user_id);
        if let Some(profile) = self.cache.get::<Profile>(&key) {
            return Ok(profile);
        }
        let profile = self.api.fetch_profile(&user_id).await?;
        self.cache.set(key, profile.clone());
        Ok(profile)
    }

    /// Validate and apply an edit to the signed-in user's profile.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, AuthError> {
        update.validate()?;
        let user_id = self.require_user()?;
        if update.is_empty() {
            return self.profile().await;
        }
        let profile = self.api.update_profile(&user_id, update).await?;
        let removed = self
            .cache
            .clear(Some(&format!("{}{}", PROFILE_NAMESPACE, user_id)));
        debug!(user_id = %user_id, removed, "Profile updated, cache invalidated");
        Ok(profile)
    }
}
