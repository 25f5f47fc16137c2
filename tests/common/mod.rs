// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use washday::application::LaundryService;
use washday::config::ServiceConfig;
use washday::domain::Cloth;

pub const WASHERMAN: &str = "9876543210";
pub const HALL: &str = "H1";
pub const WING: &str = "A";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LaundryService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LaundryService::init(db_path.to_str().unwrap(), ServiceConfig::default()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse an RFC 3339 timestamp into DateTime<Utc>
pub fn at(timestamp: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(timestamp)
        .unwrap()
        .with_timezone(&Utc)
}

/// Test fixture: one washerman serving hall H1, wing A
pub struct Campus;

impl Campus {
    /// Washerman, hall H1 and wing A, no students
    pub async fn create_empty(service: &LaundryService) -> Result<()> {
        service
            .register_washerman(WASHERMAN, Some("Ramu".into()))
            .await?;
        service.add_hall(WASHERMAN, HALL).await?;
        service.add_wing(WASHERMAN, HALL, WING).await?;
        Ok(())
    }

    /// Empty campus plus two students: 21CS001 owing 500.00, 21CS002 owing nothing
    pub async fn create_with_students(service: &LaundryService) -> Result<()> {
        Self::create_empty(service).await?;
        service
            .add_student(WASHERMAN, HALL, WING, "21CS001", "Asha", 50000)
            .await?;
        service
            .add_student(WASHERMAN, HALL, WING, "21CS002", "Ravi", 0)
            .await?;
        Ok(())
    }

    pub async fn drop_off(
        service: &LaundryService,
        roll: &str,
        date: DateTime<Utc>,
        clothes: &[(&str, i64)],
    ) -> Result<()> {
        let clothes = clothes
            .iter()
            .map(|(kind, quantity)| Cloth::new(*kind, *quantity))
            .collect();
        service
            .submit_wash_request(WASHERMAN, HALL, WING, roll, date, clothes)
            .await?;
        Ok(())
    }

    pub async fn hand_cash(
        service: &LaundryService,
        roll: &str,
        date: DateTime<Utc>,
        amount: i64,
    ) -> Result<()> {
        service
            .submit_cash_request(WASHERMAN, HALL, WING, roll, date, amount)
            .await?;
        Ok(())
    }
}
