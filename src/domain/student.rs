use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::calendar::OperatingZone;
use super::cash_request::{sort_newest_first, CashRequestId};
use super::event::{merge_events, EventInput};
use super::record::RecordId;
use super::{CashRequest, Event, Paise, Record, WingId};

pub type StudentId = Uuid;

/// A student and everything the laundry ledger tracks for them.
///
/// `records` are kept in storage (creation) order. `cash_requests` are kept
/// newest first. `version` is bumped by the repository on every committed
/// change and guards against lost updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub wing_id: WingId,
    pub roll: String,
    pub name: String,
    /// Display copies of the hall and wing names
    pub hall: String,
    pub wing: String,
    /// Outstanding balance; negative means the student is in credit
    pub due_amount: Paise,
    pub version: i64,
    pub records: Vec<Record>,
    pub cash_requests: Vec<CashRequest>,
    pub events: Vec<Event>,
}

/// A change the acceptance workflow made to a student.
/// The repository commits exactly what is described here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentChange {
    RecordAccepted {
        record_id: RecordId,
    },
    CashAccepted {
        request_id: CashRequestId,
        amount: Paise,
        due_before: Paise,
        due_after: Paise,
    },
    EventsMerged {
        events: Vec<Event>,
    },
}

impl Student {
    pub fn new(
        wing_id: WingId,
        roll: impl Into<String>,
        name: impl Into<String>,
        hall: impl Into<String>,
        wing: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wing_id,
            roll: roll.into(),
            name: name.into(),
            hall: hall.into(),
            wing: wing.into(),
            due_amount: 0,
            version: 0,
            records: Vec::new(),
            cash_requests: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_due_amount(mut self, due_amount: Paise) -> Self {
        self.due_amount = due_amount;
        self
    }

    /// Restore the newest-first invariant on `cash_requests`.
    pub fn normalize(&mut self) {
        sort_newest_first(&mut self.cash_requests);
    }

    // ========================
    // Record ledger
    // ========================

    pub fn records_on(&self, day: DateTime<Utc>, zone: OperatingZone) -> Vec<&Record> {
        self.records.iter().filter(|r| r.falls_on(day, zone)).collect()
    }

    pub fn pending_today_records(&self, now: DateTime<Utc>, zone: OperatingZone) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|r| r.is_pending_today(now, zone))
            .collect()
    }

    /// Total garments across accepted records.
    pub fn accepted_cloth_total(&self) -> i64 {
        self.records
            .iter()
            .filter(|r| r.accepted)
            .map(Record::cloth_count)
            .sum()
    }

    pub fn has_accepted_record(&self) -> bool {
        self.records.iter().any(|r| r.accepted)
    }

    // ========================
    // Cash request ledger
    // ========================

    pub fn latest_cash_request(&self) -> Option<&CashRequest> {
        self.cash_requests.first()
    }

    /// The latest request, if it is the one waiting for today.
    /// Older unaccepted requests behind it are not actionable here.
    pub fn latest_pending_cash_request(
        &self,
        now: DateTime<Utc>,
        zone: OperatingZone,
    ) -> Option<&CashRequest> {
        self.latest_cash_request()
            .filter(|r| r.is_pending_today(now, zone))
    }

    // ========================
    // Mutations
    // ========================

    /// Accept the first pending record of today, in storage order.
    pub fn accept_pending_record(
        &mut self,
        now: DateTime<Utc>,
        zone: OperatingZone,
    ) -> Option<StudentChange> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.is_pending_today(now, zone))?;
        record.accepted = true;

        Some(StudentChange::RecordAccepted {
            record_id: record.id,
        })
    }

    /// Accept the latest cash request if it is pending today, and settle its
    /// amount against the balance. Older requests behind it are superseded
    /// and never accepted here.
    pub fn accept_pending_cash(
        &mut self,
        now: DateTime<Utc>,
        zone: OperatingZone,
    ) -> Option<StudentChange> {
        let request = self
            .cash_requests
            .first_mut()
            .filter(|r| r.is_pending_today(now, zone))?;
        request.accepted = true;

        let due_before = self.due_amount;
        self.due_amount -= request.amount;

        Some(StudentChange::CashAccepted {
            request_id: request.id,
            amount: request.amount,
            due_before,
            due_after: self.due_amount,
        })
    }

    pub fn add_events(&mut self, incoming: &[EventInput], zone: OperatingZone) -> StudentChange {
        merge_events(&mut self.events, incoming, zone);
        StudentChange::EventsMerged {
            events: self.events.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::domain::Cloth;

    fn today() -> DateTime<Utc> {
        // 2024-05-01 10:00 in Kolkata
        Utc.with_ymd_and_hms(2024, 5, 1, 4, 30, 0).unwrap()
    }

    fn student() -> Student {
        Student::new(Uuid::new_v4(), "21CS001", "Asha", "Hall 1", "A")
    }

    #[test]
    fn test_accept_record_flips_first_pending_today() {
        let zone = OperatingZone::kolkata();
        let mut s = student();
        s.records
            .push(Record::new(today() - Duration::days(1), vec![Cloth::new("shirt", 9)]));
        s.records.push(Record::new(today(), vec![Cloth::new("shirt", 3)]));
        s.records.push(Record::new(today(), vec![Cloth::new("towel", 1)]));

        let change = s.accept_pending_record(today(), zone).unwrap();
        assert_eq!(
            change,
            StudentChange::RecordAccepted {
                record_id: s.records[1].id
            }
        );
        assert!(!s.records[0].accepted);
        assert!(s.records[1].accepted);
        assert!(!s.records[2].accepted);
        assert_eq!(s.accepted_cloth_total(), 3);
    }

    #[test]
    fn test_accept_record_without_pending_is_none() {
        let zone = OperatingZone::kolkata();
        let mut s = student();
        s.records
            .push(Record::new(today() - Duration::days(1), vec![Cloth::new("shirt", 2)]));

        assert!(s.accept_pending_record(today(), zone).is_none());
        assert!(!s.records[0].accepted);
    }

    #[test]
    fn test_accept_cash_updates_balance_with_flag() {
        let zone = OperatingZone::kolkata();
        let mut s = student().with_due_amount(50000);
        s.cash_requests.push(CashRequest::new(today(), 20000));

        let change = s.accept_pending_cash(today(), zone).unwrap();
        assert_eq!(
            change,
            StudentChange::CashAccepted {
                request_id: s.cash_requests[0].id,
                amount: 20000,
                due_before: 50000,
                due_after: 30000,
            }
        );
        assert_eq!(s.due_amount, 30000);
        assert!(s.cash_requests[0].accepted);

        assert!(s.accept_pending_cash(today(), zone).is_none());
        assert_eq!(s.due_amount, 30000);
    }

    #[test]
    fn test_balance_may_go_negative() {
        let zone = OperatingZone::kolkata();
        let mut s = student().with_due_amount(1000);
        s.cash_requests.push(CashRequest::new(today(), 1500));

        s.accept_pending_cash(today(), zone).unwrap();
        assert_eq!(s.due_amount, -500);
    }

    #[test]
    fn test_latest_pending_ignores_older_requests() {
        let zone = OperatingZone::kolkata();
        let mut s = student();
        let mut newer = CashRequest::new(today(), 100);
        newer.accepted = true;
        s.cash_requests
            .push(CashRequest::new(today() - Duration::hours(1), 200));
        s.cash_requests.push(newer);
        s.normalize();

        assert!(s.latest_cash_request().unwrap().accepted);
        assert!(s.latest_pending_cash_request(today(), zone).is_none());
    }

    #[test]
    fn test_superseded_cash_request_is_not_accepted() {
        let zone = OperatingZone::kolkata();
        let mut s = student().with_due_amount(50000);
        let mut newer = CashRequest::new(today(), 100);
        newer.accepted = true;
        s.cash_requests
            .push(CashRequest::new(today() - Duration::hours(1), 200));
        s.cash_requests.push(newer);
        s.normalize();

        assert!(s.accept_pending_cash(today(), zone).is_none());
        assert_eq!(s.due_amount, 50000);
        assert!(!s.cash_requests[1].accepted);
    }

    #[test]
    fn test_records_on_date() {
        let zone = OperatingZone::kolkata();
        let mut s = student();
        s.records.push(Record::new(today(), vec![Cloth::new("shirt", 1)]));
        s.records
            .push(Record::new(today() + Duration::days(1), vec![Cloth::new("shirt", 1)]));

        assert_eq!(s.records_on(today(), zone).len(), 1);
        assert_eq!(s.records_on(today() + Duration::days(2), zone).len(), 0);
    }
}
