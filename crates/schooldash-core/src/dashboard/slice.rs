use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Combined state of every slice on a dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Success,
    /// Some slices loaded, others failed.
    PartialSuccess,
    Error,
}

impl LoadState {
    pub fn from_statuses(statuses: &[SliceStatus]) -> Self {
        if statuses.iter().any(|s| *s == SliceStatus::Loading) {
            return LoadState::Loading;
        }
        let ok = statuses.iter().filter(|s| **s == SliceStatus::Success).count();
        let failed = statuses.iter().filter(|s| **s == SliceStatus::Error).count();
        match (ok, failed) {
            (0, 0) => LoadState::Idle,
            (_, 0) => LoadState::Success,
            (0, _) => LoadState::Error,
            _ => LoadState::PartialSuccess,
        }
    }
}

/// One independently loaded collection on a dashboard.
#[derive(Debug, Clone)]
pub struct Slice<T> {
    data: Option<T>,
    loading: bool,
    error: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl<T> Slice<T> {
    /// A slice that has not loaded yet. Dashboards start every slice loading.
    pub fn new() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
            updated_at: None,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn status(&self) -> SliceStatus {
        if self.loading {
            SliceStatus::Loading
        } else if self.error.is_some() {
            SliceStatus::Error
        } else if self.data.is_some() {
            SliceStatus::Success
        } else {
            SliceStatus::Idle
        }
    }

    /// Re-enter loading; existing data stays visible.
    pub fn begin_loading(&mut self) {
        self.loading = true;
    }

    pub fn succeed(&mut self, data: T, at: DateTime<Utc>) {
        self.data = Some(data);
        self.error = None;
        self.loading = false;
        self.updated_at = Some(at);
    }

    /// Record a failure. Existing data is kept; with none, `stale` (a value
    /// the cache still had) is shown instead.
    pub fn fail(&mut self, message: impl Into<String>, stale: Option<T>) {
        if self.data.is_none() {
            self.data = stale;
        }
        self.error = Some(message.into());
        self.loading = false;
    }

    /// Leave loading without a result (the load was cancelled).
    pub fn abandon(&mut self) {
        self.loading = false;
    }
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Self::new()
    }
}
