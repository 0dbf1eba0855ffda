//! Persisted events delivered in the background

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use tuist_graph::{CacheDirectories, CiChecking, Context};

use crate::dispatcher::QueueDispatching;
use crate::error::QueueError;
use crate::event::{PersistedEvent, QueueEvent};
use crate::persistor::{QueuePersisting, QueuePersistor};
use crate::retry::RetryPolicy;

const DEFAULT_CONCURRENCY: usize = 4;

/// Delivers events through their registered dispatchers.
///
/// An event is on disk before [`AsyncQueue::dispatch`] returns and stays
/// there until a dispatcher accepts it, so events that couldn't be delivered
/// are picked up again by [`AsyncQueue::start`] on a later run.
#[derive(Clone)]
pub struct AsyncQueue {
    persistor: Arc<dyn QueuePersisting>,
    dispatchers: Arc<DashMap<String, Arc<dyn QueueDispatching>>>,
    permits: Arc<Semaphore>,
    tasks: Arc<Mutex<JoinSet<()>>>,
    retry: RetryPolicy,
    ci: Arc<dyn CiChecking>,
}

enum Job {
    Event(QueueEvent),
    Persisted(PersistedEvent),
}

impl AsyncQueue {
    pub fn new(persistor: Arc<dyn QueuePersisting>, ci: Arc<dyn CiChecking>) -> Self {
        AsyncQueue {
            persistor,
            dispatchers: Arc::new(DashMap::new()),
            permits: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
            tasks: Arc::new(Mutex::new(JoinSet::new())),
            retry: RetryPolicy::default(),
            ci,
        }
    }

    /// Events under `<cache>/Queue`, CI detection from the context.
    pub fn from_context(context: &Context, directories: &CacheDirectories) -> Self {
        let persistor = QueuePersistor::in_cache(directories, context.file_handler.clone());
        AsyncQueue::new(Arc::new(persistor), context.ci.clone())
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Maximum number of events delivered at the same time.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(concurrency.max(1)));
        self
    }

    pub fn register(&self, dispatcher: Arc<dyn QueueDispatching>) {
        self.dispatchers
            .insert(dispatcher.identifier().to_string(), dispatcher);
    }

    /// Persists the event, then delivers it in the background.
    ///
    /// Only persisting can fail. Must be called from within a tokio runtime.
    pub fn dispatch(&self, event: QueueEvent) -> Result<(), QueueError> {
        self.persistor.write(&event)?;
        self.enqueue(Job::Event(event));
        Ok(())
    }

    /// Re-dispatches whatever previous runs left on disk. On CI, waits for
    /// every delivery so nothing is lost when the job ends.
    pub async fn start(&self) {
        match self.persistor.read_all() {
            Ok(events) => {
                if !events.is_empty() {
                    tracing::debug!("Re-dispatching {} persisted events", events.len());
                }
                for event in events {
                    self.enqueue(Job::Persisted(event));
                }
            }
            Err(e) => tracing::warn!("Couldn't read persisted events: {}", e),
        }
        if self.ci.is_ci() {
            self.wait_until_finished().await;
        }
    }

    /// Waits for every delivery started so far, including ones started while
    /// waiting.
    pub async fn wait_until_finished(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.lock_tasks());
            if tasks.is_empty() {
                return;
            }
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    tracing::error!("Queue task failed: {}", e);
                }
            }
        }
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, job: Job) {
        let (dispatcher_id, id) = match &job {
            Job::Event(event) => (event.dispatcher_id.clone(), event.id),
            Job::Persisted(event) => (event.dispatcher_id.clone(), event.id),
        };
        let Some(dispatcher) = self
            .dispatchers
            .get(&dispatcher_id)
            .map(|entry| entry.value().clone())
        else {
            tracing::warn!(
                "{}, event {} stays on disk",
                QueueError::DispatcherNotFound(dispatcher_id),
                id
            );
            return;
        };

        let persistor = self.persistor.clone();
        let permits = self.permits.clone();
        let retry = self.retry;
        let mut tasks = self.lock_tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let delivered = retry
                .run(|_| async {
                    match &job {
                        Job::Event(event) => dispatcher.dispatch(event).await,
                        Job::Persisted(event) => dispatcher.dispatch_persisted(&event.data).await,
                    }
                })
                .await;
            let deleted = match (&delivered, &job) {
                (Err(_), _) => Ok(()),
                (Ok(()), Job::Event(event)) => persistor.delete(event),
                (Ok(()), Job::Persisted(event)) => persistor.delete_file(&event.file_name()),
            };
            match delivered {
                Ok(()) => tracing::debug!("Dispatched event {}", id),
                Err(exhausted) => tracing::warn!(
                    "Giving up on event {} after {} attempts: {}",
                    id,
                    exhausted.attempts,
                    exhausted.error
                ),
            }
            if let Err(e) = deleted {
                tracing::warn!("Couldn't delete dispatched event {}: {}", id, e);
            }
        });
    }
}
