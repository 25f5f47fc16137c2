use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type WashermanId = Uuid;
pub type HallId = Uuid;
pub type WingId = Uuid;

/// The service-side actor. Identified by contact; owns a set of halls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Washerman {
    pub id: WashermanId,
    pub contact: String,
    pub name: Option<String>,
    /// Next scheduled collection day, overwritten on every update
    pub upcoming_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Washerman {
    pub fn new(contact: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact: contact.into(),
            name: None,
            upcoming_date: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hall {
    pub id: HallId,
    pub washerman_id: WashermanId,
    pub name: String,
}

impl Hall {
    pub fn new(washerman_id: WashermanId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            washerman_id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wing {
    pub id: WingId,
    pub hall_id: HallId,
    pub name: String,
}

impl Wing {
    pub fn new(hall_id: HallId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            hall_id,
            name: name.into(),
        }
    }
}

/// Directory level at which a lookup stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Washerman,
    Hall,
    Wing,
    Student,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Washerman => "washerman",
            Level::Hall => "hall",
            Level::Wing => "wing",
            Level::Student => "student",
        }
    }

    /// Message shown to the client for a lookup that failed at this level.
    pub fn not_found_message(&self) -> &'static str {
        match self {
            Level::Washerman => "Washerman not found",
            Level::Hall => "Hall not found for this washerman",
            Level::Wing => "Wing not found for this hall",
            Level::Student => "Student not found in this wing",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
