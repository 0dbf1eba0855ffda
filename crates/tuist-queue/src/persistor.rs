//! Events on disk until they've been delivered

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tuist_graph::{CacheDirectories, FileHandling};

use crate::error::QueueError;
use crate::event::{parse_file_name, PersistedEvent, QueueEvent};

pub trait QueuePersisting: Send + Sync {
    /// Writes the event atomically and returns where it went.
    fn write(&self, event: &QueueEvent) -> Result<PathBuf, QueueError>;

    /// Every well-formed persisted event, oldest first. Files that can't be
    /// read back as events are deleted.
    fn read_all(&self) -> Result<Vec<PersistedEvent>, QueueError>;

    fn delete(&self, event: &QueueEvent) -> Result<(), QueueError>;

    fn delete_file(&self, file_name: &str) -> Result<(), QueueError>;
}

#[derive(Clone)]
pub struct QueuePersistor {
    directory: PathBuf,
    file_handler: Arc<dyn FileHandling>,
}

impl QueuePersistor {
    pub fn new(directory: impl Into<PathBuf>, file_handler: Arc<dyn FileHandling>) -> Self {
        QueuePersistor {
            directory: directory.into(),
            file_handler,
        }
    }

    /// Persists under `<cache>/Queue`.
    pub fn in_cache(directories: &CacheDirectories, file_handler: Arc<dyn FileHandling>) -> Self {
        QueuePersistor::new(directories.queue(), file_handler)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn read(&self, path: &Path) -> Option<PersistedEvent> {
        let name = path.file_name()?.to_str()?;
        let (date, dispatcher_id, id) = parse_file_name(name)?;
        let data = self.file_handler.read(path).ok()?;
        serde_json::from_slice::<QueueEvent>(&data).ok()?;
        Some(PersistedEvent {
            date,
            dispatcher_id,
            id,
            data,
            path: path.to_path_buf(),
        })
    }
}

impl QueuePersisting for QueuePersistor {
    fn write(&self, event: &QueueEvent) -> Result<PathBuf, QueueError> {
        let data = serde_json::to_vec(event).map_err(|source| QueueError::Encode {
            id: event.id,
            source,
        })?;
        let path = self.directory.join(event.file_name());
        self.file_handler.write(&path, &data)?;
        tracing::debug!("Persisted event {} at {}", event.id, path.display());
        Ok(path)
    }

    fn read_all(&self) -> Result<Vec<PersistedEvent>, QueueError> {
        if !self.file_handler.is_dir(&self.directory) {
            return Ok(Vec::new());
        }
        let mut events = Vec::new();
        for path in self.file_handler.list(&self.directory)? {
            if self.file_handler.is_dir(&path) {
                continue;
            }
            match self.read(&path) {
                Some(event) => events.push(event),
                None => {
                    tracing::warn!("Deleting unreadable queue event {}", path.display());
                    self.file_handler.delete(&path)?;
                }
            }
        }
        events.sort_by(|a, b| (a.date, &a.path).cmp(&(b.date, &b.path)));
        Ok(events)
    }

    fn delete(&self, event: &QueueEvent) -> Result<(), QueueError> {
        self.delete_file(&event.file_name())
    }

    fn delete_file(&self, file_name: &str) -> Result<(), QueueError> {
        let path = self.directory.join(file_name);
        self.file_handler.delete(&path)?;
        tracing::debug!("Deleted queue event {}", path.display());
        Ok(())
    }
}
