//! Unit tests for tuist-queue

use crate::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tuist_graph::*;
use uuid::Uuid;

/// Records deliveries; fails the first `failures` attempts.
struct RecordingDispatcher {
    id: &'static str,
    failures: AtomicUsize,
    attempts: AtomicUsize,
    delivered: Mutex<Vec<Uuid>>,
}

impl RecordingDispatcher {
    fn new(id: &'static str) -> Arc<Self> {
        Self::failing(id, 0)
    }

    fn failing(id: &'static str, failures: usize) -> Arc<Self> {
        Arc::new(RecordingDispatcher {
            id,
            failures: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
        })
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn delivered(&self) -> Vec<Uuid> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl QueueDispatching for RecordingDispatcher {
    fn identifier(&self) -> &str {
        self.id
    }

    async fn dispatch(&self, event: &QueueEvent) -> Result<(), QueueError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failures = self.failures.load(Ordering::SeqCst);
        if failures > 0 {
            self.failures.store(failures - 1, Ordering::SeqCst);
            return Err(QueueError::Dispatch("server unavailable".into()));
        }
        self.delivered.lock().unwrap().push(event.id);
        Ok(())
    }
}

fn persistor(dir: &Path) -> Arc<QueuePersistor> {
    Arc::new(QueuePersistor::new(dir, Arc::new(FileHandler)))
}

fn queue(dir: &Path, ci: bool) -> AsyncQueue {
    AsyncQueue::new(persistor(dir), Arc::new(StaticCiChecker(ci)))
        .with_retry_policy(RetryPolicy::immediate(3))
}

fn event(dispatcher_id: &str) -> QueueEvent {
    QueueEvent::new(dispatcher_id, serde_json::json!({ "name": "generate" }), &SystemClock)
}

fn files(dir: &Path) -> Vec<PathBuf> {
    FileHandler.list(dir).unwrap_or_default()
}

#[tokio::test]
async fn test_dispatch_persists_before_returning() {
    let dir = tempfile::tempdir().unwrap();
    let queue = queue(dir.path(), false);
    queue.register(RecordingDispatcher::new("analytics"));

    let event = event("analytics");
    queue.dispatch(event.clone()).unwrap();

    // Nothing has been polled yet on this single-threaded runtime.
    assert_eq!(files(dir.path()), vec![dir.path().join(event.file_name())]);
}

#[tokio::test]
async fn test_delivered_events_are_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let queue = queue(dir.path(), false);
    let analytics = RecordingDispatcher::new("analytics");
    let other = RecordingDispatcher::new("other");
    queue.register(analytics.clone());
    queue.register(other.clone());

    let event = event("analytics");
    queue.dispatch(event.clone()).unwrap();
    queue.wait_until_finished().await;

    assert_eq!(analytics.delivered(), vec![event.id]);
    assert_eq!(other.attempts(), 0);
    assert!(files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_dispatch_is_attempted_three_times() {
    let dir = tempfile::tempdir().unwrap();
    let queue = queue(dir.path(), false);
    let analytics = RecordingDispatcher::failing("analytics", usize::MAX);
    queue.register(analytics.clone());

    queue.dispatch(event("analytics")).unwrap();
    queue.wait_until_finished().await;

    assert_eq!(analytics.attempts(), 3);
    assert!(analytics.delivered().is_empty());
    assert_eq!(files(dir.path()).len(), 1);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let queue = queue(dir.path(), false);
    let analytics = RecordingDispatcher::failing("analytics", 2);
    queue.register(analytics.clone());

    queue.dispatch(event("analytics")).unwrap();
    queue.wait_until_finished().await;

    assert_eq!(analytics.attempts(), 3);
    assert_eq!(analytics.delivered().len(), 1);
    assert!(files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_undelivered_events_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let event = event("analytics");
    {
        let first_run = queue(dir.path(), false);
        first_run.register(RecordingDispatcher::failing("analytics", usize::MAX));
        first_run.dispatch(event.clone()).unwrap();
        first_run.wait_until_finished().await;
    }

    let second_run = queue(dir.path(), true);
    let analytics = RecordingDispatcher::new("analytics");
    second_run.register(analytics.clone());
    second_run.start().await;

    assert_eq!(analytics.delivered(), vec![event.id]);
    assert!(files(dir.path()).is_empty());

    // Delivered once; a third run has nothing left.
    let third_run = queue(dir.path(), true);
    let again = RecordingDispatcher::new("analytics");
    third_run.register(again.clone());
    third_run.start().await;
    assert_eq!(again.attempts(), 0);
}

#[tokio::test]
async fn test_start_waits_only_on_ci() {
    let dir = tempfile::tempdir().unwrap();
    let persistor = persistor(dir.path());
    for _ in 0..3 {
        persistor.write(&event("analytics")).unwrap();
    }

    let local = queue(dir.path(), false);
    let analytics = RecordingDispatcher::new("analytics");
    local.register(analytics.clone());
    local.start().await;
    assert_eq!(analytics.attempts(), 0);
    local.wait_until_finished().await;
    assert_eq!(analytics.delivered().len(), 3);
}

#[tokio::test]
async fn test_unknown_dispatchers_leave_events_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let persistor = persistor(dir.path());
    persistor.write(&event("retired")).unwrap();

    let queue = queue(dir.path(), true);
    queue.register(RecordingDispatcher::new("analytics"));
    queue.start().await;

    assert_eq!(files(dir.path()).len(), 1);
}

#[test]
fn test_malformed_files_are_deleted_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let persistor = persistor(dir.path());
    let good = event("analytics");
    persistor.write(&good).unwrap();
    std::fs::write(dir.path().join("garbage.json"), "{}").unwrap();
    let bad_body = QueueEvent {
        id: Uuid::new_v4(),
        ..good.clone()
    };
    std::fs::write(dir.path().join(bad_body.file_name()), "not json").unwrap();

    let events = persistor.read_all().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, good.id);
    assert_eq!(events[0].dispatcher_id, "analytics");
    assert_eq!(events[0].file_name(), good.file_name());
    assert_eq!(files(dir.path()), vec![dir.path().join(good.file_name())]);
}

#[test]
fn test_missing_queue_directory_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let persistor = persistor(&dir.path().join("Queue"));
    assert!(persistor.read_all().unwrap().is_empty());
}

#[test]
fn test_queue_lives_in_the_cache_directory() {
    let dir = tempfile::tempdir().unwrap();
    let directories = CacheDirectories::new(dir.path());
    let persistor = QueuePersistor::in_cache(&directories, Arc::new(FileHandler));
    assert_eq!(persistor.directory(), dir.path().join("Queue"));
}
