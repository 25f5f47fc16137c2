//! Wire shapes for washerman operations.
//!
//! Every successful call renders as `{success: true, message?, ...payload}`.
//! Failures carry a status and a body with `success: false`; server-side
//! failures are logged here and answered with a generic message.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::error;

use crate::domain::StudentChange;

use super::reporting::{PendingCashRequest, PendingRecords, StudentDayRecord, SummaryRow};
use super::{AcceptOutcome, AppError};

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

/// Failure rendering: an HTTP-equivalent status plus the JSON body.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: u16,
    pub body: Value,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            message: None,
            payload,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            error!(error = %e, "failed to serialize response");
            json!({ "success": false, "message": "Internal server error" })
        })
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        if !err.is_client_error() {
            error!(error = %err, "request failed");
        }
        ApiError {
            status: err.status(),
            body: json!({ "success": false, "message": err.client_message() }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, Serialize)]
pub struct RecordsPayload<R: Serialize> {
    pub records: Vec<R>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentsPayload {
    pub students: Vec<PendingCashRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryPayload {
    pub summary: Vec<SummaryRow>,
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

pub fn pending_records(
    result: Result<Vec<PendingRecords>, AppError>,
) -> ApiResult<RecordsPayload<PendingRecords>> {
    Ok(ApiResponse::ok(RecordsPayload { records: result? }))
}

pub fn pending_cash_requests(
    result: Result<Vec<PendingCashRequest>, AppError>,
) -> ApiResult<StudentsPayload> {
    Ok(ApiResponse::ok(StudentsPayload { students: result? }))
}

pub fn records_on_date(
    result: Result<Vec<StudentDayRecord>, AppError>,
) -> ApiResult<RecordsPayload<StudentDayRecord>> {
    Ok(ApiResponse::ok(RecordsPayload { records: result? }))
}

pub fn accept_record(result: Result<AcceptOutcome, AppError>) -> ApiResult<Empty> {
    let message = match result? {
        AcceptOutcome::Accepted(_) => "Record updated successfully",
        AcceptOutcome::NothingPending => "No records to update for today",
    };
    Ok(ApiResponse::ok(Empty {}).with_message(message))
}

pub fn accept_cash_payment(result: Result<AcceptOutcome, AppError>) -> ApiResult<Map<String, Value>> {
    let mut payload = Map::new();
    let message = match result? {
        AcceptOutcome::Accepted(StudentChange::CashAccepted { due_after, .. }) => {
            payload.insert("dueAmount".into(), json!(due_after));
            "Cash payment accepted and due amount updated successfully"
        }
        AcceptOutcome::Accepted(_) => "Cash payment accepted and due amount updated successfully",
        AcceptOutcome::NothingPending => "No cash requests to update for today",
    };
    Ok(ApiResponse::ok(payload).with_message(message))
}

pub fn add_events(result: Result<usize, AppError>) -> ApiResult<Empty> {
    result?;
    Ok(ApiResponse::ok(Empty {}))
}

pub fn summary(result: Result<Vec<SummaryRow>, AppError>) -> ApiResult<SummaryPayload> {
    Ok(ApiResponse::ok(SummaryPayload { summary: result? }))
}

pub fn set_upcoming_date<T>(result: Result<T, AppError>) -> ApiResult<Empty> {
    result?;
    Ok(ApiResponse::ok(Empty {}).with_message("Upcoming date updated successfully"))
}

pub fn upcoming_date(result: Result<Option<DateTime<Utc>>, AppError>) -> ApiResult<Value> {
    Ok(ApiResponse::ok(json!({ "upcomingDate": result? })))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::Level;

    #[test]
    fn test_nothing_pending_is_success() {
        let response = accept_record(Ok(AcceptOutcome::NothingPending)).unwrap();
        let json = response.to_json();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "No records to update for today");
    }

    #[test]
    fn test_cash_acceptance_reports_balance() {
        let change = StudentChange::CashAccepted {
            request_id: Uuid::new_v4(),
            amount: 20000,
            due_before: 50000,
            due_after: 30000,
        };
        let json = accept_cash_payment(Ok(AcceptOutcome::Accepted(change)))
            .unwrap()
            .to_json();
        assert_eq!(json["success"], true);
        assert_eq!(json["dueAmount"], 30000);
    }

    #[test]
    fn test_not_found_becomes_404() {
        let err = pending_records(Err(AppError::not_found(Level::Wing, "B"))).unwrap_err();
        assert_eq!(err.status, 404);
        assert_eq!(err.body["success"], false);
        assert_eq!(err.body["message"], "Wing not found for this hall");
    }

    #[test]
    fn test_empty_cash_list_is_success() {
        let json = pending_cash_requests(Ok(Vec::new())).unwrap().to_json();
        assert_eq!(json["success"], true);
        assert_eq!(json["students"], json!([]));
    }

    #[test]
    fn test_internal_error_is_generic() {
        let err = summary(Err(AppError::Database(anyhow::anyhow!("no such table: students"))))
            .unwrap_err();
        assert_eq!(err.status, 500);
        assert_eq!(err.body["message"], "Internal server error");
    }
}
