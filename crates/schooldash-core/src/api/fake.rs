//! In-memory `SchoolBackend` for tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::backend::{AuthSession, AuthUser, SchoolBackend};
use super::{ApiError, Filter, Query};

#[derive(Default)]
pub struct FakeBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failures: Mutex<HashMap<String, String>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<HashMap<String, usize>>,
    sign_in_results: Mutex<VecDeque<Result<AuthSession, ApiError>>>,
    sign_up_result: Mutex<Option<Result<AuthUser, ApiError>>>,
    sign_in_calls: Mutex<usize>,
    sign_in_delay: Mutex<Option<Duration>>,
    sign_out_calls: Mutex<usize>,
    token: Mutex<Option<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.tables.lock().insert(table.to_string(), rows);
        self
    }

    pub fn set_rows(&self, table: &str, rows: Vec<Value>) {
        self.tables.lock().insert(table.to_string(), rows);
    }

    pub fn fail_table(&self, table: &str, message: &str) {
        self.failures
            .lock()
            .insert(table.to_string(), message.to_string());
    }

    pub fn heal_table(&self, table: &str) {
        self.failures.lock().remove(table);
    }

    pub fn delay_table(&self, table: &str, delay: Duration) {
        self.delays.lock().insert(table.to_string(), delay);
    }

    pub fn push_sign_in(&self, result: Result<AuthSession, ApiError>) {
        self.sign_in_results.lock().push_back(result);
    }

    pub fn delay_sign_in(&self, delay: Duration) {
        *self.sign_in_delay.lock() = Some(delay);
    }

    pub fn set_sign_up(&self, result: Result<AuthUser, ApiError>) {
        *self.sign_up_result.lock() = Some(result);
    }

    pub fn calls(&self, table: &str) -> usize {
        self.calls.lock().get(table).copied().unwrap_or(0)
    }

    pub fn sign_in_calls(&self) -> usize {
        *self.sign_in_calls.lock()
    }

    pub fn sign_out_calls(&self) -> usize {
        *self.sign_out_calls.lock()
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn matches(row: &Value, filters: &[Filter]) -> bool {
        filters.iter().all(|filter| match filter {
            Filter::Eq(col, expected) => match row.get(col) {
                Some(Value::String(s)) => s == expected,
                Some(other) => other.to_string() == *expected,
                None => false,
            },
            _ => true,
        })
    }

    pub fn session_for(user_id: &str, email: &str) -> AuthSession {
        AuthSession {
            access_token: format!("token-{}", user_id),
            refresh_token: Some(format!("refresh-{}", user_id)),
            expires_in: 3600,
            user: AuthUser {
                id: user_id.to_string(),
                email: Some(email.to_string()),
                email_confirmed_at: None,
            },
        }
    }
}

#[async_trait]
impl SchoolBackend for FakeBackend {
    fn set_access_token(&self, token: Option<String>) {
        *self.token.lock() = token;
    }

    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<AuthSession, ApiError> {
        *self.sign_in_calls.lock() += 1;
        let delay = *self.sign_in_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.sign_in_results.lock().pop_front();
        next.unwrap_or_else(|| Err(ApiError::BadRequest("Invalid login credentials".to_string())))
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        _full_name: &str,
    ) -> Result<AuthUser, ApiError> {
        let result = self.sign_up_result.lock().take();
        result.unwrap_or_else(|| {
            Ok(AuthUser {
                id: "new-user".to_string(),
                email: Some(email.to_string()),
                email_confirmed_at: None,
            })
        })
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        *self.sign_out_calls.lock() += 1;
        Ok(())
    }

    async fn get_user(&self) -> Result<AuthUser, ApiError> {
        match self.token() {
            Some(token) => Ok(AuthUser {
                id: token.trim_start_matches("token-").to_string(),
                email: None,
                email_confirmed_at: None,
            }),
            None => Err(ApiError::Unauthorized),
        }
    }

    async fn select(&self, query: &Query) -> Result<Vec<Value>, ApiError> {
        let table = query.table_name().to_string();
        *self.calls.lock().entry(table.clone()).or_insert(0) += 1;

        let delay = self.delays.lock().get(&table).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.failures.lock().get(&table) {
            return Err(ApiError::ServerError(message.clone()));
        }

        let tables = self.tables.lock();
        Ok(tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| Self::matches(row, query.filters()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(&self, query: &Query, patch: &Value) -> Result<Vec<Value>, ApiError> {
        let table = query.table_name().to_string();
        *self.calls.lock().entry(table.clone()).or_insert(0) += 1;

        if let Some(message) = self.failures.lock().get(&table) {
            return Err(ApiError::ServerError(message.clone()));
        }

        let mut tables = self.tables.lock();
        let rows = tables.entry(table).or_default();
        let mut updated = Vec::new();
        for row in rows.iter_mut() {
            if !Self::matches(row, query.filters()) {
                continue;
            }
            if let (Value::Object(target), Value::Object(changes)) = (&mut *row, patch) {
                for (k, v) in changes {
                    target.insert(k.clone(), v.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }
}
