//! Write coordinator
//!
//! Wraps the [`WritePipeline`] and keeps lifecycle metrics: writes started,
//! committed, conflicted, rolled back, and rollbacks that failed. Read-side
//! [`ReadStats`] from every reconciled page are folded into [`ReadMetrics`].
//!
//! # Memory Ordering
//!
//! Counters use Relaxed ordering. They are observational only and do not
//! synchronize any other memory.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;
use verity_concurrency::{CommittedEntity, WriteError, WritePipeline};
use verity_core::{Entity, Id};
use verity_search::ReadStats;

/// Write coordinator for one store
pub struct WriteCoordinator {
    pipeline: WritePipeline,
    /// Writes currently between start and outcome
    active_count: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_marked: AtomicU64,
    /// Writes whose ACTIVE marker never made it to the log
    total_start_failed: AtomicU64,
    total_conflicted: AtomicU64,
    total_rolled_back: AtomicU64,
    total_rollback_failed: AtomicU64,
}

impl WriteCoordinator {
    /// Create a coordinator around a pipeline
    pub fn new(pipeline: WritePipeline) -> Self {
        Self {
            pipeline,
            active_count: AtomicU64::new(0),
            total_started: AtomicU64::new(0),
            total_committed: AtomicU64::new(0),
            total_marked: AtomicU64::new(0),
            total_start_failed: AtomicU64::new(0),
            total_conflicted: AtomicU64::new(0),
            total_rolled_back: AtomicU64::new(0),
            total_rollback_failed: AtomicU64::new(0),
        }
    }

    /// The pipeline writes run through
    pub fn pipeline(&self) -> &WritePipeline {
        &self.pipeline
    }

    /// Commit an entity through the pipeline, recording the outcome
    pub async fn commit(&self, entity: Entity) -> Result<CommittedEntity, WriteError> {
        self.record_start();
        let id = entity.id().clone();
        match self.pipeline.commit(entity).await {
            Ok(committed) => {
                self.record_commit();
                Ok(committed)
            }
            Err(e) => {
                self.record_failure(&e);
                warn!(target: "verity::write", id = %id, error = %e, "Write failed");
                Err(e)
            }
        }
    }

    /// Tombstone an entity through the pipeline, recording the outcome
    pub async fn mark(&self, id: Id) -> Result<CommittedEntity, WriteError> {
        self.record_start();
        match self.pipeline.mark(id.clone()).await {
            Ok(committed) => {
                self.record_commit();
                self.total_marked.fetch_add(1, Ordering::Relaxed);
                Ok(committed)
            }
            Err(e) => {
                self.record_failure(&e);
                warn!(target: "verity::write", id = %id, error = %e, "Mark failed");
                Err(e)
            }
        }
    }

    fn record_start(&self) {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self) {
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
    }

    fn record_commit(&self) {
        self.finish();
        self.total_committed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self, error: &WriteError) {
        self.finish();
        match error {
            WriteError::WriteStart { .. } => {
                self.total_start_failed.fetch_add(1, Ordering::Relaxed);
            }
            WriteError::Rollback { .. } => {
                self.total_rollback_failed.fetch_add(1, Ordering::Relaxed);
            }
            other => {
                if other.is_conflict() {
                    self.total_conflicted.fetch_add(1, Ordering::Relaxed);
                }
                self.total_rolled_back.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Snapshot of the write counters
    pub fn metrics(&self) -> WriteMetrics {
        let started = self.total_started.load(Ordering::Relaxed);
        let committed = self.total_committed.load(Ordering::Relaxed);
        WriteMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: started,
            total_committed: committed,
            total_marked: self.total_marked.load(Ordering::Relaxed),
            total_start_failed: self.total_start_failed.load(Ordering::Relaxed),
            total_conflicted: self.total_conflicted.load(Ordering::Relaxed),
            total_rolled_back: self.total_rolled_back.load(Ordering::Relaxed),
            total_rollback_failed: self.total_rollback_failed.load(Ordering::Relaxed),
            commit_rate: if started > 0 {
                committed as f64 / started as f64
            } else {
                0.0
            },
        }
    }
}

/// Write lifecycle metrics
#[derive(Debug, Clone, PartialEq)]
pub struct WriteMetrics {
    /// Writes in flight
    pub active_count: u64,
    /// Writes and marks started
    pub total_started: u64,
    /// Writes and marks committed
    pub total_committed: u64,
    /// Marks committed (included in `total_committed`)
    pub total_marked: u64,
    /// Writes that failed before their ACTIVE marker was logged
    pub total_start_failed: u64,
    /// Writes that lost a first-writer-wins conflict
    pub total_conflicted: u64,
    /// Writes that failed and were fully compensated
    pub total_rolled_back: u64,
    /// Writes whose compensation itself failed
    pub total_rollback_failed: u64,
    /// committed / started
    pub commit_rate: f64,
}

impl WriteMetrics {
    /// Writes that reached an outcome
    pub fn total_completed(&self) -> u64 {
        self.total_committed
            + self.total_start_failed
            + self.total_rolled_back
            + self.total_rollback_failed
    }
}

/// Accumulated read-side counters
#[derive(Debug, Default)]
pub struct ReadMetrics {
    pages: AtomicU64,
    totals: Mutex<ReadStats>,
}

impl ReadMetrics {
    /// Create empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one reconciled page
    pub fn record(&self, stats: &ReadStats) {
        self.pages.fetch_add(1, Ordering::Relaxed);
        *self.totals.lock() += *stats;
    }

    /// Pages reconciled so far
    pub fn pages(&self) -> u64 {
        self.pages.load(Ordering::Relaxed)
    }

    /// Totals across all pages
    pub fn totals(&self) -> ReadStats {
        *self.totals.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;
    use verity_concurrency::WriteContext;
    use verity_core::{ApplicationScope, Field, FieldValue};
    use verity_storage::{
        FailPoint, FailPoints, InMemoryClaimStore, InMemoryVersionLog, ShardedEntityStore,
        Trigger,
    };

    fn coordinator(fail: &FailPoints) -> WriteCoordinator {
        let ctx = WriteContext::new(
            ApplicationScope::for_application(Uuid::new_v4()),
            Arc::new(InMemoryVersionLog::with_fail_points(fail.clone())),
            Arc::new(InMemoryClaimStore::with_fail_points(fail.clone())),
            Arc::new(ShardedEntityStore::with_fail_points(fail.clone())),
        );
        WriteCoordinator::new(WritePipeline::new(ctx))
    }

    fn user(email: &str) -> Entity {
        Entity::new(Id::generate("user"))
            .with_field(Field::unique("email", FieldValue::String(email.into())))
    }

    /// Collects the message of every `verity::write` event
    #[derive(Clone, Default)]
    struct WriteMessages(Arc<parking_lot::Mutex<Vec<String>>>);

    struct MessageVisitor<'a>(&'a mut Option<String>);

    impl tracing::field::Visit for MessageVisitor<'_> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                *self.0 = Some(format!("{:?}", value));
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WriteMessages {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if event.metadata().target() != "verity::write" {
                return;
            }
            let mut message = None;
            event.record(&mut MessageVisitor(&mut message));
            if let Some(message) = message {
                self.0.lock().push(message);
            }
        }
    }

    #[tokio::test]
    async fn test_commit_logged_once() {
        use tracing_subscriber::layer::SubscriberExt;

        let messages = WriteMessages::default();
        let subscriber = tracing_subscriber::registry().with(messages.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        coordinator(&FailPoints::new()).commit(user("a@x.io")).await.unwrap();

        let committed = messages
            .0
            .lock()
            .iter()
            .filter(|m| m.as_str() == "Write committed")
            .count();
        assert_eq!(committed, 1);
    }

    #[tokio::test]
    async fn test_new_coordinator_has_zero_metrics() {
        let metrics = coordinator(&FailPoints::new()).metrics();
        assert_eq!(metrics.total_started, 0);
        assert_eq!(metrics.total_completed(), 0);
        assert_eq!(metrics.commit_rate, 0.0);
    }

    #[tokio::test]
    async fn test_commit_and_mark_counted() {
        let c = coordinator(&FailPoints::new());
        let committed = c.commit(user("a@x.io")).await.unwrap();
        c.mark(committed.id().clone()).await.unwrap();

        let metrics = c.metrics();
        assert_eq!(metrics.total_started, 2);
        assert_eq!(metrics.total_committed, 2);
        assert_eq!(metrics.total_marked, 1);
        assert_eq!(metrics.active_count, 0);
        assert_eq!(metrics.commit_rate, 1.0);
    }

    #[tokio::test]
    async fn test_failures_classified() {
        let fail = FailPoints::new();
        let c = coordinator(&fail);

        fail.arm(FailPoint::LogAppendActive, Trigger::Once);
        assert!(c.commit(user("a@x.io")).await.is_err());

        c.commit(user("b@x.io")).await.unwrap();
        assert!(c.commit(user("b@x.io")).await.is_err());

        fail.arm(FailPoint::StoreWrite, Trigger::Once);
        fail.arm(FailPoint::ClaimDelete, Trigger::Once);
        let err = c.commit(user("c@x.io")).await.unwrap_err();
        assert!(err.is_rollback_failure());

        let metrics = c.metrics();
        assert_eq!(metrics.total_start_failed, 1);
        assert_eq!(metrics.total_rolled_back, 1);
        assert_eq!(metrics.total_rollback_failed, 1);
        assert_eq!(metrics.total_committed, 1);
        assert_eq!(metrics.total_completed(), metrics.total_started);
    }

    #[test]
    fn test_read_metrics_fold_pages() {
        let metrics = ReadMetrics::new();
        metrics.record(&ReadStats {
            accepted: 2,
            stale: 1,
            deindexed: 1,
            ..ReadStats::default()
        });
        metrics.record(&ReadStats {
            accepted: 1,
            ..ReadStats::default()
        });
        assert_eq!(metrics.pages(), 2);
        assert_eq!(metrics.totals().accepted, 3);
        assert_eq!(metrics.totals().deindexed, 1);
    }
}
