use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::calendar::{is_same_calendar_day, is_today, OperatingZone};

pub type RecordId = Uuid;

/// One kind of garment in a drop-off, e.g. 3 shirts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cloth {
    #[serde(rename = "type")]
    pub cloth_type: String,
    pub quantity: i64,
}

impl Cloth {
    pub fn new(cloth_type: impl Into<String>, quantity: i64) -> Self {
        Self {
            cloth_type: cloth_type.into(),
            quantity,
        }
    }
}

/// A wash drop-off submitted by a student.
/// Only `accepted` ever changes after creation, and only from false to true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub date: DateTime<Utc>,
    pub clothes: Vec<Cloth>,
    pub accepted: bool,
}

impl Record {
    pub fn new(date: DateTime<Utc>, clothes: Vec<Cloth>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            clothes,
            accepted: false,
        }
    }

    pub fn cloth_count(&self) -> i64 {
        self.clothes.iter().map(|c| c.quantity).sum()
    }

    pub fn falls_on(&self, day: DateTime<Utc>, zone: OperatingZone) -> bool {
        is_same_calendar_day(self.date, day, zone)
    }

    /// Unaccepted and dated on the current operating day.
    pub fn is_pending_today(&self, now: DateTime<Utc>, zone: OperatingZone) -> bool {
        !self.accepted && is_today(self.date, now, zone)
    }
}
