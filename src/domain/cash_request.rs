use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::calendar::{is_today, OperatingZone};
use super::Paise;

pub type CashRequestId = Uuid;

/// A student's request to settle part of their dues in cash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashRequest {
    pub id: CashRequestId,
    pub date: DateTime<Utc>,
    /// Amount the student hands over, in paise
    #[serde(rename = "dueAmountcash")]
    pub amount: Paise,
    pub accepted: bool,
}

impl CashRequest {
    pub fn new(date: DateTime<Utc>, amount: Paise) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            amount,
            accepted: false,
        }
    }

    pub fn is_pending_today(&self, now: DateTime<Utc>, zone: OperatingZone) -> bool {
        !self.accepted && is_today(self.date, now, zone)
    }
}

/// Sort newest first. Requests sharing a timestamp keep their relative
/// storage order reversed, so the later submission wins.
pub fn sort_newest_first(requests: &mut [CashRequest]) {
    requests.reverse();
    requests.sort_by(|a, b| b.date.cmp(&a.date));
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_sort_newest_first() {
        let now = Utc::now();
        let old = CashRequest::new(now - Duration::days(2), 100);
        let newer = CashRequest::new(now - Duration::days(1), 200);
        let newest = CashRequest::new(now, 300);

        let mut requests = vec![newer.clone(), newest.clone(), old.clone()];
        sort_newest_first(&mut requests);

        let ids: Vec<_> = requests.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newest.id, newer.id, old.id]);
    }

    #[test]
    fn test_same_timestamp_prefers_later_submission() {
        let now = Utc::now();
        let first = CashRequest::new(now, 100);
        let second = CashRequest::new(now, 200);

        let mut requests = vec![first.clone(), second.clone()];
        sort_newest_first(&mut requests);
        assert_eq!(requests[0].id, second.id);
    }

    #[test]
    fn test_serialized_amount_key() {
        let json = serde_json::to_value(CashRequest::new(Utc::now(), 20000)).unwrap();
        assert_eq!(json["dueAmountcash"], 20000);
        assert_eq!(json["accepted"], false);
    }
}
