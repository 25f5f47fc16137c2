use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::calendar::month_name;
use crate::domain::{CashRequest, OperatingZone, Paise, Record, Student};

/// Today's unaccepted wash records for one student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRecords {
    pub name: String,
    pub roll: String,
    pub wing: String,
    pub hall: String,
    pub records: Vec<Record>,
}

/// The latest cash request of a student, when it is waiting for today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCashRequest {
    pub name: String,
    pub roll: String,
    pub wing: String,
    pub hall: String,
    #[serde(rename = "cashRequests")]
    pub cash_requests: Vec<CashRequest>,
}

/// The record a student dropped off on a given day, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentDayRecord {
    pub name: String,
    pub roll: String,
    pub record: Option<Record>,
}

/// One line of the monthly summary. The JSON, CSV and PDF renderings are
/// all produced from this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Wing")]
    pub wing: String,
    #[serde(rename = "Hall")]
    pub hall: String,
    #[serde(rename = "Roll")]
    pub roll: String,
    #[serde(rename = "Total Clothes")]
    pub total_clothes: i64,
    #[serde(rename = "Total Dues")]
    pub total_dues: Paise,
    #[serde(rename = "Month")]
    pub month: String,
}

pub fn pending_records(
    students: &[Student],
    now: DateTime<Utc>,
    zone: OperatingZone,
) -> Vec<PendingRecords> {
    students
        .iter()
        .filter_map(|student| {
            let records: Vec<Record> = student
                .pending_today_records(now, zone)
                .into_iter()
                .cloned()
                .collect();
            if records.is_empty() {
                return None;
            }
            Some(PendingRecords {
                name: student.name.clone(),
                roll: student.roll.clone(),
                wing: student.wing.clone(),
                hall: student.hall.clone(),
                records,
            })
        })
        .collect()
}

pub fn pending_cash_requests(
    students: &[Student],
    now: DateTime<Utc>,
    zone: OperatingZone,
) -> Vec<PendingCashRequest> {
    students
        .iter()
        .filter_map(|student| {
            let latest = student.latest_pending_cash_request(now, zone)?;
            Some(PendingCashRequest {
                name: student.name.clone(),
                roll: student.roll.clone(),
                wing: student.wing.clone(),
                hall: student.hall.clone(),
                cash_requests: vec![latest.clone()],
            })
        })
        .collect()
}

pub fn records_on_day(
    students: &[Student],
    day: DateTime<Utc>,
    zone: OperatingZone,
) -> Vec<StudentDayRecord> {
    students
        .iter()
        .map(|student| StudentDayRecord {
            name: student.name.clone(),
            roll: student.roll.clone(),
            record: student.records_on(day, zone).first().map(|r| (*r).clone()),
        })
        .collect()
}

/// Students with at least one accepted record, with their accepted garment
/// total and current dues.
pub fn summarize(students: &[Student], now: DateTime<Utc>, zone: OperatingZone) -> Vec<SummaryRow> {
    let month = month_name(now, zone);
    students
        .iter()
        .filter(|s| s.has_accepted_record())
        .map(|s| SummaryRow {
            name: s.name.clone(),
            wing: s.wing.clone(),
            hall: s.hall.clone(),
            roll: s.roll.clone(),
            total_clothes: s.accepted_cloth_total(),
            total_dues: s.due_amount,
            month: month.to_string(),
        })
        .collect()
}
