use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::calendar::{is_same_calendar_day, OperatingZone};

/// Labels attached to one calendar day of a student's calendar.
/// The label list only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub date: DateTime<Utc>,
    #[serde(rename = "eventType")]
    pub labels: Vec<String>,
}

/// A single `(date, title)` pair submitted by a washerman.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInput {
    pub date: DateTime<Utc>,
    pub title: String,
}

impl EventInput {
    pub fn new(date: DateTime<Utc>, title: impl Into<String>) -> Self {
        Self {
            date,
            title: title.into(),
        }
    }
}

/// Merge `incoming` into `events`. A title whose date already has an entry
/// is appended to that entry; otherwise a new entry is created.
/// Repeated titles are kept as-is.
pub fn merge_events(events: &mut Vec<Event>, incoming: &[EventInput], zone: OperatingZone) {
    for input in incoming {
        match events
            .iter_mut()
            .find(|e| is_same_calendar_day(e.date, input.date, zone))
        {
            Some(existing) => existing.labels.push(input.title.clone()),
            None => events.push(Event {
                date: input.date,
                labels: vec![input.title.clone()],
            }),
        }
    }
}
