// Application layer - use cases and orchestration over the directory and
// the student ledgers. `api` renders results into the wire envelope.

pub mod api;
pub mod directory;
pub mod error;
pub mod reporting;
mod service;

pub use error::*;
pub use reporting::{PendingCashRequest, PendingRecords, StudentDayRecord, SummaryRow};
pub use service::*;
