//! Analytics Dispatch
//!
//! Gameplay hands outcomes to an [`AnalyticsSink`] and moves on. The
//! recorder turns them into [`AnalyticsRecord`]s and passes each to a
//! transport without waiting: the channel transport uses `try_send`, so a
//! full or closed channel drops the record with a warning instead of
//! stalling a tick. A tokio task drains the channel into a backend.
//! Nothing is retried.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::analytics::record::{AnalyticsEvent, AnalyticsRecord};
use crate::analytics::store::AnalyticsStore;

/// Points per match in the completion score.
pub const SCORE_PER_MATCH: i64 = 10;

/// Points lost per mismatch in the completion score.
pub const SCORE_PER_MISMATCH: i64 = 20;

/// Analytics delivery errors.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Delivery queue is full.
    #[error("analytics queue full")]
    QueueFull,
    /// Delivery task has stopped.
    #[error("analytics queue closed")]
    QueueClosed,
    /// Backend refused the record.
    #[error("analytics backend error: {0}")]
    Backend(String),
}

// =============================================================================
// SINK
// =============================================================================

/// Fire-and-forget gameplay analytics.
pub trait AnalyticsSink {
    /// A gate was passed.
    fn record_match(&mut self, level: &str);

    /// A gate was failed at track position `y`.
    fn record_mismatch(&mut self, level: &str, y: f32);

    /// The run was lost.
    fn record_death(&mut self, level: &str);

    /// The level was finished with `health` left.
    fn record_level_completion(&mut self, level: &str, health: i32);
}

/// Sink that drops everything. Used for replays.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAnalytics;

impl AnalyticsSink for NullAnalytics {
    fn record_match(&mut self, _level: &str) {}
    fn record_mismatch(&mut self, _level: &str, _y: f32) {}
    fn record_death(&mut self, _level: &str) {}
    fn record_level_completion(&mut self, _level: &str, _health: i32) {}
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Non-blocking hand-off of a record.
pub trait AnalyticsTransport {
    /// Queue or deliver `record`. Must not block.
    fn send(&mut self, record: AnalyticsRecord) -> Result<(), AnalyticsError>;
}

/// Transport backed by a bounded tokio channel.
#[derive(Clone, Debug)]
pub struct ChannelTransport {
    tx: mpsc::Sender<AnalyticsRecord>,
}

impl ChannelTransport {
    /// Transport plus the receiving end for [`spawn_delivery`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AnalyticsRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl AnalyticsTransport for ChannelTransport {
    fn send(&mut self, record: AnalyticsRecord) -> Result<(), AnalyticsError> {
        self.tx.try_send(record).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AnalyticsError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => AnalyticsError::QueueClosed,
        })
    }
}

// =============================================================================
// RECORDER
// =============================================================================

/// Turns gameplay outcomes into records.
///
/// Keeps match and mismatch counters for the current session; they are
/// reported and reset on each level completion.
#[derive(Debug)]
pub struct AnalyticsRecorder<T: AnalyticsTransport> {
    user_id: Uuid,
    transport: T,
    session_matches: u32,
    session_mismatches: u32,
    dropped: u64,
}

impl<T: AnalyticsTransport> AnalyticsRecorder<T> {
    /// Recorder for a known user.
    pub fn new(user_id: Uuid, transport: T) -> Self {
        info!(%user_id, "analytics initialized");
        Self {
            user_id,
            transport,
            session_matches: 0,
            session_mismatches: 0,
            dropped: 0,
        }
    }

    /// Recorder for a fresh anonymous user.
    pub fn with_new_user(transport: T) -> Self {
        Self::new(Uuid::new_v4(), transport)
    }

    /// Anonymous user id.
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// (matches, mismatches) since the last completion.
    pub fn session_counts(&self) -> (u32, u32) {
        (self.session_matches, self.session_mismatches)
    }

    /// Records the transport refused.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Score for the current session counters.
    pub fn session_score(&self) -> i64 {
        i64::from(self.session_matches) * SCORE_PER_MATCH
            - i64::from(self.session_mismatches) * SCORE_PER_MISMATCH
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn dispatch(&mut self, level: &str, event: AnalyticsEvent) {
        let record = AnalyticsRecord::new(self.user_id, level, event);
        let path = record.path();
        match self.transport.send(record) {
            Ok(()) => debug!(%path, "analytics record queued"),
            Err(e) => {
                self.dropped += 1;
                warn!(%path, error = %e, "analytics record dropped");
            }
        }
    }
}

impl<T: AnalyticsTransport> AnalyticsSink for AnalyticsRecorder<T> {
    fn record_match(&mut self, level: &str) {
        self.session_matches += 1;
        self.dispatch(level, AnalyticsEvent::Match);
    }

    fn record_mismatch(&mut self, level: &str, y: f32) {
        self.session_mismatches += 1;
        debug!(y, session_mismatches = self.session_mismatches, "mismatch recorded");
        self.dispatch(level, AnalyticsEvent::Mismatch { y });
    }

    fn record_death(&mut self, level: &str) {
        self.dispatch(level, AnalyticsEvent::Death);
    }

    fn record_level_completion(&mut self, level: &str, health: i32) {
        let event = AnalyticsEvent::LevelCompleted {
            health,
            matches: self.session_matches,
            mismatches: self.session_mismatches,
            score: self.session_score(),
        };
        info!(
            level,
            health,
            matches = self.session_matches,
            mismatches = self.session_mismatches,
            "level completion recorded"
        );
        self.dispatch(level, event);
        self.session_matches = 0;
        self.session_mismatches = 0;
    }
}

// =============================================================================
// BACKEND
// =============================================================================

/// Final destination of delivered records.
pub trait AnalyticsBackend: Send + 'static {
    /// Store one record.
    fn deliver(&mut self, record: &AnalyticsRecord) -> Result<(), AnalyticsError>;
}

/// Shared in-memory store.
#[derive(Clone, Debug, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<AnalyticsStore>>,
}

impl SharedStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current tree.
    pub fn snapshot(&self) -> Result<AnalyticsStore, AnalyticsError> {
        self.inner
            .lock()
            .map(|store| store.clone())
            .map_err(|e| AnalyticsError::Backend(e.to_string()))
    }
}

impl AnalyticsBackend for SharedStore {
    fn deliver(&mut self, record: &AnalyticsRecord) -> Result<(), AnalyticsError> {
        let mut store = self
            .inner
            .lock()
            .map_err(|e| AnalyticsError::Backend(e.to_string()))?;
        store.apply(record);
        Ok(())
    }
}

/// Delivers straight into a store, without a task. Used where no runtime
/// is available.
impl AnalyticsTransport for SharedStore {
    fn send(&mut self, record: AnalyticsRecord) -> Result<(), AnalyticsError> {
        self.deliver(&record)
    }
}

/// Counts from a finished delivery task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Records stored
    pub delivered: u64,
    /// Records the backend refused
    pub failed: u64,
}

/// Drain `rx` into `backend` until every sender is dropped.
pub fn spawn_delivery<B: AnalyticsBackend>(
    mut rx: mpsc::Receiver<AnalyticsRecord>,
    mut backend: B,
) -> JoinHandle<DeliveryStats> {
    tokio::spawn(async move {
        let mut stats = DeliveryStats::default();
        while let Some(record) = rx.recv().await {
            match backend.deliver(&record) {
                Ok(()) => stats.delivered += 1,
                Err(e) => {
                    stats.failed += 1;
                    error!(path = %record.path(), error = %e, "analytics delivery failed");
                }
            }
        }
        info!(delivered = stats.delivered, failed = stats.failed, "analytics delivery finished");
        stats
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct VecTransport(Vec<AnalyticsRecord>);

    impl AnalyticsTransport for VecTransport {
        fn send(&mut self, record: AnalyticsRecord) -> Result<(), AnalyticsError> {
            self.0.push(record);
            Ok(())
        }
    }

    struct FailingBackend;

    impl AnalyticsBackend for FailingBackend {
        fn deliver(&mut self, _record: &AnalyticsRecord) -> Result<(), AnalyticsError> {
            Err(AnalyticsError::Backend("offline".into()))
        }
    }

    #[test]
    fn test_completion_reports_and_resets_session() {
        let mut recorder = AnalyticsRecorder::new(Uuid::nil(), VecTransport::default());
        recorder.record_match("Level1");
        recorder.record_match("Level1");
        recorder.record_match("Level1");
        recorder.record_mismatch("Level1", 4.0);
        recorder.record_level_completion("Level1", 72);

        assert_eq!(recorder.session_counts(), (0, 0));
        let last = recorder.transport().0.last().unwrap();
        assert_eq!(
            last.event,
            AnalyticsEvent::LevelCompleted { health: 72, matches: 3, mismatches: 1, score: 10 }
        );
    }

    #[test]
    fn test_death_keeps_session_counters() {
        let mut recorder = AnalyticsRecorder::new(Uuid::nil(), VecTransport::default());
        recorder.record_mismatch("Level2", 1.0);
        recorder.record_death("Level2");
        assert_eq!(recorder.session_counts(), (0, 1));
        assert_eq!(recorder.session_score(), -20);
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let (transport, _rx) = ChannelTransport::channel(1);
        let mut recorder = AnalyticsRecorder::new(Uuid::nil(), transport);
        recorder.record_match("Level1");
        recorder.record_match("Level1");
        assert_eq!(recorder.dropped(), 1);
    }

    #[test]
    fn test_closed_channel_drops() {
        let (transport, rx) = ChannelTransport::channel(4);
        drop(rx);
        let mut recorder = AnalyticsRecorder::new(Uuid::nil(), transport);
        recorder.record_death("Level1");
        assert_eq!(recorder.dropped(), 1);
    }

    #[test]
    fn test_direct_store_transport() {
        let store = SharedStore::new();
        let mut recorder = AnalyticsRecorder::new(Uuid::nil(), store.clone());
        recorder.record_match("Level3");

        let snapshot = store.snapshot().unwrap();
        let path = format!("users/{}/match_stats/Level3/obstacle_match_count", Uuid::nil());
        assert_eq!(snapshot.counter(&path), 1);
    }

    #[tokio::test]
    async fn test_delivery_task_fills_store() {
        let store = SharedStore::new();
        let (transport, rx) = ChannelTransport::channel(16);
        let handle = spawn_delivery(rx, store.clone());

        let mut recorder = AnalyticsRecorder::new(Uuid::nil(), transport);
        recorder.record_match("Level1");
        recorder.record_mismatch("Level1", 2.5);
        recorder.record_level_completion("Level1", 90);
        drop(recorder);

        let stats = handle.await.unwrap();
        assert_eq!(stats, DeliveryStats { delivered: 3, failed: 0 });

        let snapshot = store.snapshot().unwrap();
        let base = format!("users/{}", Uuid::nil());
        assert_eq!(snapshot.counter(&format!("{base}/completion_stats/Level1/score")), -10);
    }

    #[tokio::test]
    async fn test_delivery_failures_are_counted_not_retried() {
        let (transport, rx) = ChannelTransport::channel(4);
        let handle = spawn_delivery(rx, FailingBackend);

        let mut recorder = AnalyticsRecorder::new(Uuid::nil(), transport);
        recorder.record_death("Level1");
        recorder.record_death("Level1");
        drop(recorder);

        let stats = handle.await.unwrap();
        assert_eq!(stats, DeliveryStats { delivered: 0, failed: 2 });
    }
}
