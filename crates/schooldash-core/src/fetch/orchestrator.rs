use std::future::Future;
use std::sync::Arc;

use chrono::Duration;
use futures::future::{join_all, BoxFuture, FutureExt};
use tracing::{debug, warn};

use super::CancelToken;
use crate::api::{ApiError, SharedError};
use crate::cache::{RequestDeduplicator, TtlCache};

/// Outcome of one fetch: the value, or the error shared with every caller
/// that joined the same request.
pub type FetchResult<T> = Result<T, SharedError>;

/// Whether a fresh cache entry may satisfy the fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Serve a fresh cached value without touching the backend.
    PreferCached,
    /// Always go to the backend (explicit refresh).
    Refresh,
}

/// One independent resource to fetch, addressed by its cache key.
pub struct FetchDescriptor<T> {
    pub key: String,
    pub ttl: Option<Duration>,
    fetch: BoxFuture<'static, Result<T, ApiError>>,
}

impl<T> FetchDescriptor<T> {
    pub fn new<F>(key: impl Into<String>, fetch: F) -> Self
    where
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        Self {
            key: key.into(),
            ttl: None,
            fetch: fetch.boxed(),
        }
    }

    /// Cache the result for `ttl` instead of the cache's default.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Result of settling one descriptor.
#[derive(Debug)]
pub struct SliceOutcome<T> {
    pub key: String,
    pub result: FetchResult<T>,
    /// On failure, whatever fresh value the cache still holds for `key`.
    pub stale: Option<T>,
    /// True when the value came from the cache rather than the backend.
    pub from_cache: bool,
}

impl<T> SliceOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(&self.result, Err(e) if matches!(**e, ApiError::Cancelled))
    }
}

/// Issues independent fetches concurrently and settles every one of them.
///
/// Each fetch goes through the deduplicator, and a success is written to the
/// TTL cache under the descriptor's key. A failure is logged and reported on
/// its own slice; it never short-circuits siblings and is not retried.
/// Clone is cheap - both stores are shared.
#[derive(Clone)]
pub struct Orchestrator {
    cache: Arc<TtlCache>,
    dedup: Arc<RequestDeduplicator>,
    dedup_ttl: Duration,
}

impl Orchestrator {
    pub fn new(cache: Arc<TtlCache>, dedup: Arc<RequestDeduplicator>, dedup_ttl: Duration) -> Self {
        Self {
            cache,
            dedup,
            dedup_ttl,
        }
    }

    pub fn cache(&self) -> &Arc<TtlCache> {
        &self.cache
    }

    pub fn dedup(&self) -> &Arc<RequestDeduplicator> {
        &self.dedup
    }

    pub async fn settle<T>(
        &self,
        descriptor: FetchDescriptor<T>,
        policy: CachePolicy,
        cancel: &CancelToken,
    ) -> SliceOutcome<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let FetchDescriptor { key, ttl, fetch } = descriptor;

        if policy == CachePolicy::PreferCached {
            if let Some(value) = self.cache.get::<T>(&key) {
                debug!(key = %key, "Served from cache");
                return SliceOutcome {
                    key,
                    result: Ok(value),
                    stale: None,
                    from_cache: true,
                };
            }
        }

        let deduped = match policy {
            CachePolicy::PreferCached => {
                cancel
                    .run(self.dedup.run(&key, self.dedup_ttl, move || fetch))
                    .await
            }
            // A refresh must reach the backend unless an identical call is
            // still pending.
            CachePolicy::Refresh => {
                cancel
                    .run(self.dedup.run_fresh(&key, self.dedup_ttl, move || fetch))
                    .await
            }
        };
        let result = match deduped {
            Ok(result) => result,
            Err(cancelled) => Err(Arc::new(cancelled)),
        };

        let stale = match &result {
            Ok(value) => {
                let ttl = ttl.unwrap_or_else(|| self.cache.default_ttl());
                self.cache.set_with_ttl(key.clone(), value.clone(), ttl);
                None
            }
            Err(e) if matches!(**e, ApiError::Cancelled) => {
                debug!(key = %key, "Fetch cancelled");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Fetch failed");
                self.cache.get::<T>(&key)
            }
        };

        SliceOutcome {
            key,
            result,
            stale,
            from_cache: false,
        }
    }

    /// Settle every descriptor concurrently. The output has one outcome per
    /// descriptor; callers address them by `key`, not by position.
    pub async fn settle_all<T>(
        &self,
        descriptors: Vec<FetchDescriptor<T>>,
        policy: CachePolicy,
        cancel: &CancelToken,
    ) -> Vec<SliceOutcome<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let count = descriptors.len();
        let outcomes = join_all(
            descriptors
                .into_iter()
                .map(|descriptor| self.settle(descriptor, policy, cancel)),
        )
        .await;

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        debug!(count, failed, "All fetches settled");
        outcomes
    }
}
