use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::api::ApiError;

/// Cooperative cancellation signal shared by a load and everything it spawns.
///
/// Cloning yields another handle to the same signal. Once cancelled, every
/// future wrapped with `run` resolves to `ApiError::Cancelled` and the
/// wrapped work is dropped.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `cancel` has been called on any handle.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Every sender is gone, so cancellation can no longer happen.
                futures::future::pending::<()>().await;
            }
        }
    }

    /// Drive `fut` unless the token fires first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ApiError> {
        if self.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(ApiError::Cancelled),
            output = fut => Ok(output),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
