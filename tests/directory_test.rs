mod common;

use anyhow::Result;
use common::{Campus, HALL, WASHERMAN, WING, at, test_service};
use washday::application::{AppError, api};
use washday::domain::Level;

fn not_found_level(err: AppError) -> Level {
    match err {
        AppError::NotFound { level, .. } => level,
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_resolution_stops_at_first_missing_level() -> Result<()> {
    let (service, _temp) = test_service().await?;
    Campus::create_with_students(&service).await?;

    let now = at("2024-05-10T18:00:00+05:30");

    let err = service
        .pending_record_students("0000000000", HALL, WING, now)
        .await
        .unwrap_err();
    assert_eq!(not_found_level(err), Level::Washerman);

    // Both hall and wing are wrong: the hall is reported
    let err = service
        .pending_record_students(WASHERMAN, "H9", "Z", now)
        .await
        .unwrap_err();
    assert_eq!(not_found_level(err), Level::Hall);

    let err = service
        .pending_record_students(WASHERMAN, HALL, "Z", now)
        .await
        .unwrap_err();
    assert_eq!(not_found_level(err), Level::Wing);

    let err = service
        .accept_record(WASHERMAN, HALL, WING, "99XX999", now)
        .await
        .unwrap_err();
    assert_eq!(not_found_level(err), Level::Student);

    Ok(())
}

#[tokio::test]
async fn test_not_found_envelope_names_level() -> Result<()> {
    let (service, _temp) = test_service().await?;
    Campus::create_with_students(&service).await?;

    let err = api::summary(
        service
            .summarize(WASHERMAN, HALL, "Z", at("2024-05-10T18:00:00+05:30"))
            .await,
    )
    .unwrap_err();
    assert_eq!(err.status, 404);
    assert_eq!(err.body["success"], false);
    assert_eq!(err.body["message"], "Wing not found for this hall");

    let err = api::accept_cash_payment(
        service
            .accept_cash_payment(
                WASHERMAN,
                HALL,
                WING,
                "99XX999",
                at("2024-05-10T18:00:00+05:30"),
            )
            .await,
    )
    .unwrap_err();
    assert_eq!(err.status, 404);
    assert_eq!(err.body["message"], "Student not found in this wing");

    Ok(())
}

#[tokio::test]
async fn test_same_names_under_other_washerman_are_separate() -> Result<()> {
    let (service, _temp) = test_service().await?;
    Campus::create_with_students(&service).await?;

    service.register_washerman("1111111111", None).await?;
    service.add_hall("1111111111", HALL).await?;

    // H1 exists for the other washerman but has no wing A there
    let err = service
        .pending_record_students("1111111111", HALL, WING, at("2024-05-10T18:00:00+05:30"))
        .await
        .unwrap_err();
    assert_eq!(not_found_level(err), Level::Wing);

    Ok(())
}

#[tokio::test]
async fn test_duplicates_are_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    Campus::create_with_students(&service).await?;

    assert!(matches!(
        service.register_washerman(WASHERMAN, None).await,
        Err(AppError::AlreadyExists { level: Level::Washerman, .. })
    ));
    assert!(matches!(
        service.add_hall(WASHERMAN, HALL).await,
        Err(AppError::AlreadyExists { level: Level::Hall, .. })
    ));
    assert!(matches!(
        service.add_wing(WASHERMAN, HALL, WING).await,
        Err(AppError::AlreadyExists { level: Level::Wing, .. })
    ));
    assert!(matches!(
        service
            .add_student(WASHERMAN, HALL, WING, "21CS001", "Someone", 0)
            .await,
        Err(AppError::AlreadyExists { level: Level::Student, .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_students_listed_by_roll() -> Result<()> {
    let (service, _temp) = test_service().await?;
    Campus::create_empty(&service).await?;

    service
        .add_student(WASHERMAN, HALL, WING, "21CS003", "Meera", 0)
        .await?;
    service
        .add_student(WASHERMAN, HALL, WING, "21CS001", "Asha", 0)
        .await?;

    let records = service
        .wing_records_on_date(WASHERMAN, HALL, WING, at("2024-05-10T18:00:00+05:30"))
        .await?;
    let rolls: Vec<&str> = records.iter().map(|r| r.roll.as_str()).collect();
    assert_eq!(rolls, vec!["21CS001", "21CS003"]);

    Ok(())
}
