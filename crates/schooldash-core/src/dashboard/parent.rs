//! Parent dashboard loader.
//!
//! A `ParentDashboard` owns the five slices a parent sees for one selected
//! child (attendance, fees, assignments, events, messages) and drives their
//! load lifecycle:
//!
//! - `mount` starts the first load for a child
//! - `select_student` reloads when the selected child changes
//! - `refresh` / `refresh_slice` reload from the backend, bypassing the cache
//! - `unmount` (or drop) cancels whatever is still in flight
//!
//! Loads run in a spawned task and report each slice through an MPSC
//! channel as soon as it settles; the owner applies them with
//! `poll_updates` or `wait_until_settled`. Every slice remembers the
//! generation of the load it is waiting for, so a late result from a
//! superseded load is discarded instead of overwriting newer state.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use futures::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::aggregate::{AttendanceSummary, FeeSummary};
use crate::api::{ApiError, SchoolApi};
use crate::fetch::{CachePolicy, CancelToken, FetchDescriptor, Orchestrator, SliceOutcome};
use crate::models::{AttendanceRecord, Assignment, FeeRecord, Message, SchoolEvent, Student};

use super::slice::{LoadState, Slice, SliceStatus};

/// Channel buffer for slice updates; one load produces at most five.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Cache key prefix for everything this dashboard stores.
pub const CACHE_NAMESPACE: &str = "parent_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceKind {
    Attendance,
    Fees,
    Assignments,
    Events,
    Messages,
}

impl SliceKind {
    pub const ALL: [SliceKind; 5] = [
        SliceKind::Attendance,
        SliceKind::Fees,
        SliceKind::Assignments,
        SliceKind::Events,
        SliceKind::Messages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SliceKind::Attendance => "attendance",
            SliceKind::Fees => "fees",
            SliceKind::Assignments => "assignments",
            SliceKind::Events => "events",
            SliceKind::Messages => "messages",
        }
    }
}

impl std::fmt::Display for SliceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a parent dashboard shows for the selected child.
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub attendance: Slice<Vec<AttendanceRecord>>,
    pub fees: Slice<Vec<FeeRecord>>,
    pub assignments: Slice<Vec<Assignment>>,
    pub events: Slice<Vec<SchoolEvent>>,
    pub messages: Slice<Vec<Message>>,
}

impl DashboardSnapshot {
    pub fn status(&self, kind: SliceKind) -> SliceStatus {
        match kind {
            SliceKind::Attendance => self.attendance.status(),
            SliceKind::Fees => self.fees.status(),
            SliceKind::Assignments => self.assignments.status(),
            SliceKind::Events => self.events.status(),
            SliceKind::Messages => self.messages.status(),
        }
    }

    pub fn error(&self, kind: SliceKind) -> Option<&str> {
        match kind {
            SliceKind::Attendance => self.attendance.error(),
            SliceKind::Fees => self.fees.error(),
            SliceKind::Assignments => self.assignments.error(),
            SliceKind::Events => self.events.error(),
            SliceKind::Messages => self.messages.error(),
        }
    }

    pub fn state(&self) -> LoadState {
        let statuses: Vec<SliceStatus> = SliceKind::ALL.iter().map(|k| self.status(*k)).collect();
        LoadState::from_statuses(&statuses)
    }

    fn begin_loading(&mut self, kind: SliceKind) {
        match kind {
            SliceKind::Attendance => self.attendance.begin_loading(),
            SliceKind::Fees => self.fees.begin_loading(),
            SliceKind::Assignments => self.assignments.begin_loading(),
            SliceKind::Events => self.events.begin_loading(),
            SliceKind::Messages => self.messages.begin_loading(),
        }
    }

    pub fn attendance_summary(&self) -> Option<AttendanceSummary> {
        self.attendance.data().map(|r| AttendanceSummary::from_records(r))
    }

    pub fn fee_summary(&self) -> Option<FeeSummary> {
        self.fees.data().map(|f| FeeSummary::from_fees(f))
    }
}

/// Result of one slice's fetch, tagged with the load that produced it.
struct SliceUpdate {
    generation: u64,
    payload: SlicePayload,
}

enum SlicePayload {
    Attendance(SliceOutcome<Vec<AttendanceRecord>>),
    Fees(SliceOutcome<Vec<FeeRecord>>),
    Assignments(SliceOutcome<Vec<Assignment>>),
    Events(SliceOutcome<Vec<SchoolEvent>>),
    Messages(SliceOutcome<Vec<Message>>),
}

impl SlicePayload {
    fn kind(&self) -> SliceKind {
        match self {
            SlicePayload::Attendance(_) => SliceKind::Attendance,
            SlicePayload::Fees(_) => SliceKind::Fees,
            SlicePayload::Assignments(_) => SliceKind::Assignments,
            SlicePayload::Events(_) => SliceKind::Events,
            SlicePayload::Messages(_) => SliceKind::Messages,
        }
    }
}

/// Inputs a load needs, captured when it starts.
#[derive(Debug, Clone)]
struct LoadParams {
    user_id: String,
    student_id: String,
    class_id: Option<String>,
    today: NaiveDate,
}

impl LoadParams {
    fn key(&self, kind: SliceKind) -> String {
        match kind {
            // Events are school-wide, messages belong to the parent.
            SliceKind::Events => format!("{}events", CACHE_NAMESPACE),
            SliceKind::Messages => format!("{}messages_{}", CACHE_NAMESPACE, self.user_id),
            _ => format!("{}{}_{}", CACHE_NAMESPACE, kind, self.student_id),
        }
    }
}

pub struct ParentDashboard {
    api: SchoolApi,
    orchestrator: Orchestrator,
    user_id: String,
    student: Option<Student>,
    snapshot: DashboardSnapshot,

    generation: u64,
    slice_generation: HashMap<SliceKind, u64>,
    pending: HashSet<SliceKind>,
    cancel: CancelToken,
    mounted: bool,

    // Background task channel
    tx: mpsc::Sender<SliceUpdate>,
    rx: mpsc::Receiver<SliceUpdate>,
}

impl ParentDashboard {
    /// `user_id` is the signed-in parent; no load starts until `mount`.
    pub fn new(api: SchoolApi, orchestrator: Orchestrator, user_id: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            api,
            orchestrator,
            user_id: user_id.into(),
            student: None,
            snapshot: DashboardSnapshot::default(),
            generation: 0,
            slice_generation: HashMap::new(),
            pending: HashSet::new(),
            cancel: CancelToken::new(),
            mounted: false,
            tx,
            rx,
        }
    }

    pub fn snapshot(&self) -> &DashboardSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> LoadState {
        self.snapshot.state()
    }

    pub fn student(&self) -> Option<&Student> {
        self.student.as_ref()
    }

    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    /// The parent's children, cached like any other collection. Independent
    /// of mount state: dropping the returned future abandons the fetch.
    pub async fn children(&self) -> SliceOutcome<Vec<Student>> {
        let api = self.api.clone();
        let parent_id = self.user_id.clone();
        let key = format!("{}children_{}", CACHE_NAMESPACE, self.user_id);
        self.orchestrator
            .settle(
                FetchDescriptor::new(key, async move {
                    api.fetch_students_for_parent(&parent_id).await
                }),
                CachePolicy::PreferCached,
                &CancelToken::new(),
            )
            .await
    }

    /// First load for `student`.
    pub fn mount(&mut self, student: Student) {
        info!(student_id = %student.id, "Mounting parent dashboard");
        self.mounted = true;
        self.replace_student(student);
    }

    /// Switch the selected child. Reloads only when the child actually changed.
    pub fn select_student(&mut self, student: Student) {
        if !self.mounted {
            self.mount(student);
            return;
        }
        if self.student.as_ref().map(|s| s.id == student.id).unwrap_or(false) {
            debug!(student_id = %student.id, "Student unchanged, not reloading");
            return;
        }
        self.replace_student(student);
    }

    /// Reload every slice from the backend.
    pub fn refresh(&mut self) {
        self.start_load(&SliceKind::ALL, CachePolicy::Refresh);
    }

    /// Reload one slice from the backend; the others are left alone.
    pub fn refresh_slice(&mut self, kind: SliceKind) {
        self.start_load(&[kind], CachePolicy::Refresh);
    }

    /// Stop caring about this dashboard: cancel in-flight work and ignore
    /// anything that still arrives.
    pub fn unmount(&mut self) {
        if self.mounted {
            info!("Unmounting parent dashboard");
        }
        self.mounted = false;
        self.cancel.cancel();
        self.pending.clear();
    }

    fn replace_student(&mut self, student: Student) {
        // Results for the previous child are worthless now.
        self.cancel.cancel();
        self.cancel = CancelToken::new();
        // Per-child data never carries over; events and messages are not
        // keyed by child and stay visible.
        self.snapshot.attendance = Slice::new();
        self.snapshot.fees = Slice::new();
        self.snapshot.assignments = Slice::new();
        self.student = Some(student);
        self.start_load(&SliceKind::ALL, CachePolicy::PreferCached);
    }

    fn start_load(&mut self, kinds: &[SliceKind], policy: CachePolicy) {
        if !self.mounted {
            debug!("Dashboard not mounted, ignoring load request");
            return;
        }
        let student = match &self.student {
            Some(s) => s,
            None => return,
        };

        self.generation += 1;
        let generation = self.generation;
        for kind in kinds {
            self.slice_generation.insert(*kind, generation);
            self.pending.insert(*kind);
            self.snapshot.begin_loading(*kind);
        }

        let params = LoadParams {
            user_id: self.user_id.clone(),
            student_id: student.id.clone(),
            class_id: student.class_id.clone(),
            today: Utc::now().date_naive(),
        };
        debug!(generation, ?kinds, student_id = %params.student_id, "Starting dashboard load");

        let tx = self.tx.clone();
        let api = self.api.clone();
        let orchestrator = self.orchestrator.clone();
        let cancel = self.cancel.clone();
        let kinds = kinds.to_vec();

        tokio::spawn(async move {
            Self::execute_load(tx, api, orchestrator, params, kinds, policy, generation, cancel).await;
        });
    }

    /// Fetch the requested slices concurrently, sending each one back as it
    /// settles.
    #[allow(clippy::too_many_arguments)]
    async fn execute_load(
        tx: mpsc::Sender<SliceUpdate>,
        api: SchoolApi,
        orchestrator: Orchestrator,
        params: LoadParams,
        kinds: Vec<SliceKind>,
        policy: CachePolicy,
        generation: u64,
        cancel: CancelToken,
    ) {
        let fetches: Vec<BoxFuture<'_, ()>> = kinds
            .iter()
            .map(|kind| {
                let api = api.clone();
                let params = params.clone();
                let orchestrator = &orchestrator;
                let cancel = &cancel;
                let tx = &tx;
                let kind = *kind;
                async move {
                    let key = params.key(kind);
                    let student_id = params.student_id.clone();
                    let payload = match kind {
                        SliceKind::Attendance => SlicePayload::Attendance(
                            orchestrator
                                .settle(
                                    FetchDescriptor::new(key, async move {
                                        api.fetch_attendance(&student_id, None).await
                                    }),
                                    policy,
                                    cancel,
                                )
                                .await,
                        ),
                        SliceKind::Fees => SlicePayload::Fees(
                            orchestrator
                                .settle(
                                    FetchDescriptor::new(key, async move {
                                        api.fetch_fees(&student_id).await
                                    }),
                                    policy,
                                    cancel,
                                )
                                .await,
                        ),
                        SliceKind::Assignments => {
                            let class_id = params.class_id.clone();
                            SlicePayload::Assignments(
                                orchestrator
                                    .settle(
                                        FetchDescriptor::new(key, async move {
                                            match class_id {
                                                Some(class_id) => api.fetch_assignments(&class_id).await,
                                                None => Ok(Vec::new()),
                                            }
                                        }),
                                        policy,
                                        cancel,
                                    )
                                    .await,
                            )
                        }
                        SliceKind::Events => {
                            let today = params.today;
                            SlicePayload::Events(
                                orchestrator
                                    .settle(
                                        FetchDescriptor::new(key, async move {
                                            api.fetch_events(today).await
                                        }),
                                        policy,
                                        cancel,
                                    )
                                    .await,
                            )
                        }
                        SliceKind::Messages => {
                            let user_id = params.user_id.clone();
                            SlicePayload::Messages(
                                orchestrator
                                    .settle(
                                        FetchDescriptor::new(key, async move {
                                            api.fetch_messages(&user_id).await
                                        }),
                                        policy,
                                        cancel,
                                    )
                                    .await,
                            )
                        }
                    };
                    Self::send_update(tx, SliceUpdate { generation, payload }).await;
                }
                .boxed()
            })
            .collect();

        join_all(fetches).await;
        debug!(generation, "Dashboard load finished");
    }

    async fn send_update(tx: &mpsc::Sender<SliceUpdate>, update: SliceUpdate) {
        if tx.send(update).await.is_err() {
            // Receiver is gone: the dashboard was dropped mid-load.
            debug!("Slice update dropped - dashboard no longer listening");
        }
    }

    /// Apply every update that has already arrived. Returns how many were
    /// applied (stale ones are dropped and not counted).
    pub fn poll_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.rx.try_recv() {
            if self.apply(update) {
                applied += 1;
            }
        }
        applied
    }

    /// Apply updates until every slice of the latest loads has settled.
    pub async fn wait_until_settled(&mut self) {
        while !self.pending.is_empty() {
            match self.rx.recv().await {
                Some(update) => {
                    self.apply(update);
                }
                None => break,
            }
        }
    }

    fn apply(&mut self, update: SliceUpdate) -> bool {
        let kind = update.payload.kind();
        if !self.mounted || self.slice_generation.get(&kind) != Some(&update.generation) {
            debug!(%kind, generation = update.generation, "Discarding stale slice update");
            return false;
        }
        self.pending.remove(&kind);

        let now = Utc::now();
        match update.payload {
            SlicePayload::Attendance(o) => Self::settle_slice(&mut self.snapshot.attendance, o, now),
            SlicePayload::Fees(o) => Self::settle_slice(&mut self.snapshot.fees, o, now),
            SlicePayload::Assignments(o) => Self::settle_slice(&mut self.snapshot.assignments, o, now),
            SlicePayload::Events(o) => Self::settle_slice(&mut self.snapshot.events, o, now),
            SlicePayload::Messages(o) => Self::settle_slice(&mut self.snapshot.messages, o, now),
        }
        true
    }

    fn settle_slice<T>(slice: &mut Slice<T>, outcome: SliceOutcome<T>, now: chrono::DateTime<Utc>) {
        match outcome.result {
            Ok(data) => slice.succeed(data, now),
            Err(e) if matches!(*e, ApiError::Cancelled) => slice.abandon(),
            Err(e) => slice.fail(e.to_string(), outcome.stale),
        }
    }
}

impl Drop for ParentDashboard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;
    use crate::api::school::{ASSIGNMENTS, ATTENDANCE, FEES, MESSAGES, SCHOOL_EVENTS};
    use crate::cache::{
        ManualClock, RequestDeduplicator, TtlCache, DEFAULT_DEDUP_TTL_SECS, DEFAULT_TTL_SECS,
    };
    use chrono::Duration;
    use serde_json::json;
    use std::sync::Arc;

    struct Harness {
        backend: Arc<FakeBackend>,
        cache: Arc<TtlCache>,
        dashboard: ParentDashboard,
    }

    fn student(id: &str) -> Student {
        Student {
            id: id.to_string(),
            first_name: "Kid".to_string(),
            last_name: id.to_uppercase(),
            grade: Some("5".to_string()),
            section: None,
            class_id: Some("c5".to_string()),
            parent_id: Some("p1".to_string()),
            roll_number: None,
        }
    }

    fn seeded_backend() -> FakeBackend {
        FakeBackend::new()
            .with_rows(
                ATTENDANCE,
                vec![
                    json!({"id":"a1","student_id":"s1","date":"2024-01-08","status":"present"}),
                    json!({"id":"a2","student_id":"s1","date":"2024-01-09","status":"absent"}),
                    json!({"id":"a3","student_id":"s2","date":"2024-01-09","status":"present"}),
                ],
            )
            .with_rows(
                FEES,
                vec![
                    json!({"id":"f1","student_id":"s1","amount":5000,"due_date":"2024-02-01","status":"pending"}),
                    json!({"id":"f2","student_id":"s1","amount":1500,"due_date":"2024-01-15","status":"paid"}),
                ],
            )
            .with_rows(
                ASSIGNMENTS,
                vec![json!({"id":"as1","title":"Fractions","class_id":"c5","due_date":"2099-01-01"})],
            )
            .with_rows(
                SCHOOL_EVENTS,
                vec![json!({"id":"e1","title":"Sports day","event_date":"2099-03-01","created_at":"2024-01-01T00:00:00Z"})],
            )
            .with_rows(
                MESSAGES,
                vec![json!({"id":"m1","sender_id":"t1","recipient_id":"p1","body":"Hello","created_at":"2024-01-01T00:00:00Z"})],
            )
    }

    fn harness(backend: FakeBackend) -> Harness {
        let backend = Arc::new(backend);
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(TtlCache::new(Duration::seconds(DEFAULT_TTL_SECS), clock.clone()));
        let dedup = Arc::new(RequestDeduplicator::new(clock));
        let orchestrator =
            Orchestrator::new(cache.clone(), dedup, Duration::seconds(DEFAULT_DEDUP_TTL_SECS));
        let dashboard = ParentDashboard::new(SchoolApi::new(backend.clone()), orchestrator, "p1");
        Harness {
            backend,
            cache,
            dashboard,
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_loading() {
        let h = harness(seeded_backend());
        assert_eq!(h.dashboard.state(), LoadState::Loading);
        for kind in SliceKind::ALL {
            assert_eq!(h.dashboard.snapshot().status(kind), SliceStatus::Loading);
        }
    }

    #[tokio::test]
    async fn test_mount_loads_every_slice() {
        let mut h = harness(seeded_backend());
        h.dashboard.mount(student("s1"));
        h.dashboard.wait_until_settled().await;

        assert_eq!(h.dashboard.state(), LoadState::Success);
        let snap = h.dashboard.snapshot();
        assert_eq!(snap.attendance.data().unwrap().len(), 2);
        assert_eq!(snap.attendance_summary().unwrap().percentage, 50);
        let fees = snap.fee_summary().unwrap();
        assert_eq!(fees.total_due, 5000.0);
        assert_eq!(fees.next_due_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(snap.assignments.data().unwrap().len(), 1);
        assert_eq!(snap.events.data().unwrap().len(), 1);
        assert_eq!(snap.messages.data().unwrap().len(), 1);

        assert!(h.cache.contains("parent_fees_s1"));
        assert!(h.cache.contains("parent_messages_p1"));
    }

    #[tokio::test]
    async fn test_one_failed_collection_is_isolated() {
        let mut h = harness(seeded_backend());
        h.backend.fail_table(MESSAGES, "messages service down");
        h.dashboard.mount(student("s1"));
        h.dashboard.wait_until_settled().await;

        assert_eq!(h.dashboard.state(), LoadState::PartialSuccess);
        let snap = h.dashboard.snapshot();
        assert_eq!(snap.status(SliceKind::Messages), SliceStatus::Error);
        assert!(snap.error(SliceKind::Messages).unwrap().contains("messages service down"));
        for kind in [SliceKind::Attendance, SliceKind::Fees, SliceKind::Assignments, SliceKind::Events] {
            assert_eq!(snap.status(kind), SliceStatus::Success, "{} should load", kind);
        }
        // Each collection was requested exactly once.
        assert_eq!(h.backend.calls(MESSAGES), 1);
        assert_eq!(h.backend.calls(FEES), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_data() {
        let mut h = harness(seeded_backend());
        h.dashboard.mount(student("s1"));
        h.dashboard.wait_until_settled().await;

        h.backend.fail_table(FEES, "fees down");
        h.dashboard.refresh_slice(SliceKind::Fees);
        assert_eq!(h.dashboard.snapshot().status(SliceKind::Fees), SliceStatus::Loading);
        assert_eq!(
            h.dashboard.snapshot().status(SliceKind::Attendance),
            SliceStatus::Success,
            "other slices are not blanked"
        );
        h.dashboard.wait_until_settled().await;

        let snap = h.dashboard.snapshot();
        assert_eq!(snap.status(SliceKind::Fees), SliceStatus::Error);
        assert_eq!(snap.fees.data().unwrap().len(), 2);
        assert_eq!(h.backend.calls(FEES), 2);
        assert_eq!(h.backend.calls(ATTENDANCE), 1);

        h.backend.heal_table(FEES);
        h.dashboard.refresh_slice(SliceKind::Fees);
        h.dashboard.wait_until_settled().await;
        assert_eq!(h.dashboard.snapshot().status(SliceKind::Fees), SliceStatus::Success);
        assert!(h.dashboard.snapshot().fees.error().is_none());
    }

    #[tokio::test]
    async fn test_refresh_within_dedup_window_hits_backend() {
        let mut h = harness(seeded_backend());
        h.dashboard.mount(student("s1"));
        h.dashboard.wait_until_settled().await;
        assert_eq!(h.backend.calls(FEES), 1);

        h.backend.set_rows(
            FEES,
            vec![json!({"id":"f3","student_id":"s1","amount":700,"due_date":"2024-03-01","status":"overdue"})],
        );
        h.dashboard.refresh();
        h.dashboard.wait_until_settled().await;

        assert_eq!(h.backend.calls(FEES), 2);
        let ids: Vec<&str> = h
            .dashboard
            .snapshot()
            .fees
            .data()
            .unwrap()
            .iter()
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(ids, vec!["f3"]);
        assert_eq!(h.backend.calls(ATTENDANCE), 2);
    }

    #[tokio::test]
    async fn test_switch_student_failure_does_not_show_previous_child() {
        let mut h = harness(seeded_backend());
        h.dashboard.mount(student("s1"));
        h.dashboard.wait_until_settled().await;
        assert!(h.dashboard.snapshot().fees.data().is_some());

        h.backend.fail_table(FEES, "fees down");
        h.dashboard.select_student(student("s2"));
        assert!(
            h.dashboard.snapshot().fees.data().is_none(),
            "previous child's fees are not shown while loading"
        );
        assert!(h.dashboard.snapshot().messages.data().is_some());
        h.dashboard.wait_until_settled().await;

        let snap = h.dashboard.snapshot();
        assert_eq!(snap.status(SliceKind::Fees), SliceStatus::Error);
        assert!(snap.fees.data().is_none());
        let records = snap.attendance.data().unwrap();
        assert!(records.iter().all(|r| r.student_id == "s2"));
    }

    #[tokio::test]
    async fn test_children_load_after_unmount() {
        let mut h = harness(FakeBackend::new().with_rows(
            crate::api::school::STUDENTS,
            vec![json!({"id":"s1","first_name":"A","last_name":"B","parent_id":"p1"})],
        ));
        h.dashboard.mount(student("s1"));
        h.dashboard.unmount();

        let children = h.dashboard.children().await;
        assert!(!children.is_cancelled());
        assert_eq!(children.result.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_select_student_reloads_only_on_change() {
        let mut h = harness(seeded_backend());
        h.dashboard.mount(student("s1"));
        h.dashboard.wait_until_settled().await;
        assert_eq!(h.backend.calls(ATTENDANCE), 1);

        h.dashboard.select_student(student("s1"));
        assert!(h.dashboard.is_settled());
        assert_eq!(h.backend.calls(ATTENDANCE), 1);

        h.dashboard.select_student(student("s2"));
        h.dashboard.wait_until_settled().await;
        assert_eq!(h.backend.calls(ATTENDANCE), 2);
        let records = h.dashboard.snapshot().attendance.data().unwrap();
        assert!(records.iter().all(|r| r.student_id == "s2"));

        // Switching back is served from the cache.
        h.dashboard.select_student(student("s1"));
        h.dashboard.wait_until_settled().await;
        assert_eq!(h.backend.calls(ATTENDANCE), 2);
        assert_eq!(h.dashboard.snapshot().attendance.data().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_student_discards_superseded_load() {
        let mut h = harness(seeded_backend());
        h.backend.delay_table(ATTENDANCE, std::time::Duration::from_secs(5));
        h.dashboard.mount(student("s1"));
        tokio::task::yield_now().await;

        h.dashboard.select_student(student("s2"));
        h.dashboard.wait_until_settled().await;

        let records = h.dashboard.snapshot().attendance.data().unwrap();
        assert!(!records.is_empty());
        assert!(records.iter().all(|r| r.student_id == "s2"));
        assert!(!h.cache.contains("parent_attendance_s1"), "cancelled load never cached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_cancels_and_ignores_results() {
        let mut h = harness(seeded_backend());
        h.backend.delay_table(FEES, std::time::Duration::from_secs(5));
        h.dashboard.mount(student("s1"));
        tokio::task::yield_now().await;

        h.dashboard.unmount();
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        assert_eq!(h.dashboard.poll_updates(), 0);
        assert!(!h.cache.contains("parent_fees_s1"));
    }

    #[tokio::test]
    async fn test_student_without_class_has_no_assignments() {
        let mut h = harness(seeded_backend());
        let mut kid = student("s1");
        kid.class_id = None;
        h.dashboard.mount(kid);
        h.dashboard.wait_until_settled().await;
        assert!(h.dashboard.snapshot().assignments.data().unwrap().is_empty());
        assert_eq!(h.backend.calls(ASSIGNMENTS), 0);
    }

    #[tokio::test]
    async fn test_children_are_cached() {
        let h = harness(FakeBackend::new().with_rows(
            crate::api::school::STUDENTS,
            vec![
                json!({"id":"s1","first_name":"A","last_name":"B","parent_id":"p1"}),
                json!({"id":"s9","first_name":"C","last_name":"D","parent_id":"p9"}),
            ],
        ));
        let first = h.dashboard.children().await;
        assert_eq!(first.result.unwrap().len(), 1);
        let second = h.dashboard.children().await;
        assert!(second.from_cache);
        assert_eq!(h.backend.calls(crate::api::school::STUDENTS), 1);
    }
}
