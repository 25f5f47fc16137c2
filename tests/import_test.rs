mod common;

use anyhow::Result;
use common::{Campus, HALL, WASHERMAN, WING, at, test_service};
use washday::io::{ImportOptions, RosterImporter};

const ROSTER: &str = "hall,wing,roll,name,due_amount
H1,A,21CS001,Asha,120.50
H1,A,21CS002,Ravi,
H1,B,21CS101,Meera,10
H2,A,21EE001,Kiran,0
";

#[tokio::test]
async fn test_roster_import_creates_halls_and_wings() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.register_washerman(WASHERMAN, None).await?;

    let result = RosterImporter::new(&service)
        .import_csv(WASHERMAN, ROSTER.as_bytes(), ImportOptions::default())
        .await?;
    assert_eq!(result.imported, 4);
    assert!(result.errors.is_empty());

    let asha = service.student(WASHERMAN, HALL, WING, "21CS001").await?;
    assert_eq!(asha.due_amount, 12050);
    assert_eq!(asha.hall, HALL);
    service.student(WASHERMAN, "H1", "B", "21CS101").await?;
    service.student(WASHERMAN, "H2", "A", "21EE001").await?;

    Ok(())
}

#[tokio::test]
async fn test_roster_import_into_existing_wing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    Campus::create_with_students(&service).await?;

    // Without skip, existing rolls are reported per line
    let result = RosterImporter::new(&service)
        .import_csv(WASHERMAN, ROSTER.as_bytes(), ImportOptions::default())
        .await?;
    assert_eq!(result.imported, 2);
    assert_eq!(result.errors.len(), 2);
    assert_eq!(result.errors[0].line, 2);

    let result = RosterImporter::new(&service)
        .import_csv(
            WASHERMAN,
            ROSTER.as_bytes(),
            ImportOptions {
                dry_run: false,
                skip_duplicates: true,
            },
        )
        .await?;
    assert_eq!(result.imported, 0);
    assert_eq!(result.skipped, 4);

    // Existing balances are untouched
    let asha = service.student(WASHERMAN, HALL, WING, "21CS001").await?;
    assert_eq!(asha.due_amount, 50000);

    Ok(())
}

#[tokio::test]
async fn test_roster_dry_run_writes_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.register_washerman(WASHERMAN, None).await?;

    let result = RosterImporter::new(&service)
        .import_csv(
            WASHERMAN,
            ROSTER.as_bytes(),
            ImportOptions {
                dry_run: true,
                skip_duplicates: false,
            },
        )
        .await?;
    assert_eq!(result.imported, 4);

    let err = service
        .pending_record_students(WASHERMAN, HALL, WING, at("2024-05-10T18:00:00+05:30"))
        .await;
    assert!(err.is_err());

    Ok(())
}

#[tokio::test]
async fn test_roster_import_requires_washerman() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = RosterImporter::new(&service)
        .import_csv(WASHERMAN, ROSTER.as_bytes(), ImportOptions::default())
        .await;
    assert!(result.is_err());

    Ok(())
}
