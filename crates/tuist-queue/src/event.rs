use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tuist_graph::Clock;

/// Something to deliver through the dispatcher registered as `dispatcher_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEvent {
    pub dispatcher_id: String,
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl QueueEvent {
    pub fn new(dispatcher_id: impl Into<String>, payload: serde_json::Value, clock: &dyn Clock) -> Self {
        QueueEvent {
            dispatcher_id: dispatcher_id.into(),
            id: Uuid::new_v4(),
            date: clock.now(),
            payload,
        }
    }

    /// `<unix seconds>.<dispatcher id>.<uuid>.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}.{}.{}.json",
            self.date.timestamp(),
            self.dispatcher_id,
            self.id
        )
    }
}

/// An event read back from disk. `data` is the encoded [`QueueEvent`].
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedEvent {
    pub date: DateTime<Utc>,
    pub dispatcher_id: String,
    pub id: Uuid,
    pub data: Vec<u8>,
    pub path: PathBuf,
}

impl PersistedEvent {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Splits a persisted file name into date, dispatcher id and event id.
///
/// Dispatcher ids may contain dots; the first and last segments are the date
/// and the uuid.
pub(crate) fn parse_file_name(name: &str) -> Option<(DateTime<Utc>, String, Uuid)> {
    let stem = name.strip_suffix(".json")?;
    let (seconds, rest) = stem.split_once('.')?;
    let (dispatcher_id, id) = rest.rsplit_once('.')?;
    if dispatcher_id.is_empty() {
        return None;
    }
    let date = Utc.timestamp_opt(seconds.parse().ok()?, 0).single()?;
    let id = Uuid::parse_str(id).ok()?;
    Some((date, dispatcher_id.to_string(), id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuist_graph::FixedClock;

    fn event() -> QueueEvent {
        let clock = FixedClock(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        QueueEvent {
            id: Uuid::from_u128(0x42),
            ..QueueEvent::new("tuist.analytics", serde_json::json!({}), &clock)
        }
    }

    #[test]
    fn file_name_layout() {
        insta::assert_snapshot!(
            event().file_name(),
            @"1700000000.tuist.analytics.00000000-0000-0000-0000-000000000042.json"
        );
    }

    #[test]
    fn file_names_parse_back() {
        let event = event();
        let (date, dispatcher_id, id) = parse_file_name(&event.file_name()).unwrap();
        assert_eq!(date, event.date);
        assert_eq!(dispatcher_id, "tuist.analytics");
        assert_eq!(id, event.id);
    }

    #[test]
    fn malformed_file_names() {
        assert!(parse_file_name("notes.txt").is_none());
        assert!(parse_file_name("abc.dispatcher.00000000-0000-0000-0000-000000000042.json").is_none());
        assert!(parse_file_name("1700000000.dispatcher.not-a-uuid.json").is_none());
        assert!(parse_file_name("1700000000.00000000-0000-0000-0000-000000000042.json").is_none());
    }
}
