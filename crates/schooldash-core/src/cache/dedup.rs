use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared, TryFutureExt};
use parking_lot::Mutex;
use tracing::debug;

use super::{Clock, SystemClock};
use crate::api::{ApiError, SharedError};

/// Default dedup window.
pub const DEFAULT_DEDUP_TTL_SECS: i64 = 30;

type SharedRequest<T> = Shared<BoxFuture<'static, Result<T, SharedError>>>;

struct InFlight {
    id: u64,
    // Always a `SharedRequest<T>` for the T the key was registered with.
    request: Box<dyn Any + Send + Sync>,
    started_at: DateTime<Utc>,
    ttl: Duration,
}

impl InFlight {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.started_at > self.ttl
    }
}

/// Collapses concurrent requests for the same key into one underlying call.
///
/// The first caller for a key runs its producer; every caller that arrives
/// while the registration is live awaits the same shared result. Explicit
/// refreshes use `run_fresh`, which joins a pending request but never replays
/// a settled one. A failed
/// request is unregistered as soon as it settles so the next caller retries.
/// A registration also lapses once `ttl` has passed since it started, whether
/// or not it settled, so a request that never completes cannot pin the key.
pub struct RequestDeduplicator {
    in_flight: Mutex<HashMap<String, InFlight>>,
    next_id: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl RequestDeduplicator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            clock,
        }
    }

    pub async fn run<T, F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> Result<T, SharedError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        self.run_inner(key, ttl, producer, true).await
    }

    /// Like `run`, but only joins a request that is still pending. A result
    /// that already settled is replaced by a new call to `producer`.
    pub async fn run_fresh<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<T, SharedError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        self.run_inner(key, ttl, producer, false).await
    }

    async fn run_inner<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
        join_settled: bool,
    ) -> Result<T, SharedError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let (request, id) = {
            let now = self.clock.now();
            let mut in_flight = self.in_flight.lock();
            in_flight.retain(|_, entry| !entry.is_expired(now));

            let existing = match in_flight.get(key) {
                Some(entry) => match entry.request.downcast_ref::<SharedRequest<T>>() {
                    Some(request) if join_settled || request.peek().is_none() => {
                        Some((request.clone(), entry.id))
                    }
                    Some(_) => {
                        debug!(key, "Replacing settled request with a fresh call");
                        None
                    }
                    None => {
                        debug!(key, "Registered request has a different type, replacing it");
                        None
                    }
                },
                None => None,
            };

            match existing {
                Some(joined) => {
                    debug!(key, "Joining in-flight request");
                    joined
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let request: SharedRequest<T> =
                        producer().map_err(Arc::new).boxed().shared();
                    in_flight.insert(
                        key.to_string(),
                        InFlight {
                            id,
                            request: Box::new(request.clone()),
                            started_at: now,
                            ttl,
                        },
                    );
                    (request, id)
                }
            }
        };

        let result = request.await;

        if result.is_err() {
            let mut in_flight = self.in_flight.lock();
            // A newer registration may have replaced ours after expiry.
            if in_flight.get(key).map(|e| e.id == id).unwrap_or(false) {
                in_flight.remove(key);
                debug!(key, "Dropped failed request so the next caller retries");
            }
        }

        result
    }

    /// Whether a live registration exists for `key`.
    pub fn is_in_flight(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.in_flight
            .lock()
            .get(key)
            .map(|e| !e.is_expired(now))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.in_flight.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.lock().is_empty()
    }

    /// Drop every registration (on sign-out).
    pub fn clear(&self) {
        self.in_flight.lock().clear();
    }
}

impl Default for RequestDeduplicator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
