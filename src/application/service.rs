use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::config::ServiceConfig;
use crate::domain::{
    CashRequest, Cloth, EventInput, Hall, Level, Paise, Record, Student, StudentChange,
    Washerman, Wing,
};
use crate::storage::{CommitOutcome, Repository};

use super::directory::{DirectoryResolver, ResolvedStudent};
use super::reporting::{
    self, PendingCashRequest, PendingRecords, StudentDayRecord, SummaryRow,
};
use super::AppError;

/// Application service for everything a washerman does against the
/// directory and the student ledgers. This is the interface for any client
/// (CLI, HTTP, tests).
pub struct LaundryService {
    repo: Repository,
    config: ServiceConfig,
}

/// Result of an acceptance call. Having nothing to accept is a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    Accepted(StudentChange),
    NothingPending,
}

impl AcceptOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AcceptOutcome::Accepted(_))
    }
}

impl LaundryService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository, config: ServiceConfig) -> Self {
        Self { repo, config }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, config: ServiceConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo, config))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, config: ServiceConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo, config))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn resolver(&self) -> DirectoryResolver<'_> {
        DirectoryResolver::new(&self.repo)
    }

    // ========================
    // Provisioning
    // ========================

    pub async fn register_washerman(
        &self,
        contact: &str,
        name: Option<String>,
    ) -> Result<Washerman, AppError> {
        if self.repo.find_washerman(contact).await?.is_some() {
            return Err(AppError::AlreadyExists {
                level: Level::Washerman,
                key: contact.to_string(),
            });
        }

        let mut washerman = Washerman::new(contact);
        if let Some(name) = name {
            washerman = washerman.with_name(name);
        }
        self.repo.save_washerman(&washerman).await?;
        info!(contact, "washerman registered");
        Ok(washerman)
    }

    pub async fn add_hall(&self, contact: &str, hall_name: &str) -> Result<Hall, AppError> {
        let washerman = self.resolver().washerman(contact).await?;
        if self.repo.find_hall(washerman.id, hall_name).await?.is_some() {
            return Err(AppError::AlreadyExists {
                level: Level::Hall,
                key: hall_name.to_string(),
            });
        }

        let hall = Hall::new(washerman.id, hall_name);
        self.repo.save_hall(&hall).await?;
        Ok(hall)
    }

    pub async fn add_wing(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
    ) -> Result<Wing, AppError> {
        let washerman = self.resolver().washerman(contact).await?;
        let hall = self
            .repo
            .find_hall(washerman.id, hall_name)
            .await?
            .ok_or_else(|| AppError::not_found(Level::Hall, hall_name))?;
        if self.repo.find_wing(hall.id, wing_name).await?.is_some() {
            return Err(AppError::AlreadyExists {
                level: Level::Wing,
                key: wing_name.to_string(),
            });
        }

        let wing = Wing::new(hall.id, wing_name);
        self.repo.save_wing(&wing).await?;
        Ok(wing)
    }

    pub async fn add_student(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
        roll: &str,
        name: &str,
        due_amount: Paise,
    ) -> Result<Student, AppError> {
        let resolved = self.resolver().wing(contact, hall_name, wing_name).await?;
        if resolved.students.iter().any(|s| s.roll == roll) {
            return Err(AppError::AlreadyExists {
                level: Level::Student,
                key: roll.to_string(),
            });
        }

        let student = Student::new(resolved.wing.id, roll, name, hall_name, wing_name)
            .with_due_amount(due_amount);
        self.repo.save_student(&student).await?;
        Ok(student)
    }

    /// Record a student's wash drop-off. Starts unaccepted.
    pub async fn submit_wash_request(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
        roll: &str,
        date: DateTime<Utc>,
        clothes: Vec<Cloth>,
    ) -> Result<Record, AppError> {
        if clothes.is_empty() {
            return Err(AppError::validation("clothes", "at least one item is required"));
        }
        if let Some(cloth) = clothes.iter().find(|c| c.quantity <= 0) {
            return Err(AppError::validation(
                "clothes",
                format!("quantity for '{}' must be positive", cloth.cloth_type),
            ));
        }

        let resolved = self
            .resolver()
            .student(contact, hall_name, wing_name, roll)
            .await?;
        let record = Record::new(date, clothes);
        self.repo.add_record(resolved.student.id, &record).await?;
        debug!(roll, record_id = %record.id, "wash request stored");
        Ok(record)
    }

    /// Record a student's request to settle dues in cash. Starts unaccepted.
    pub async fn submit_cash_request(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
        roll: &str,
        date: DateTime<Utc>,
        amount: Paise,
    ) -> Result<CashRequest, AppError> {
        if amount <= 0 {
            return Err(AppError::validation("amount", "must be positive"));
        }

        let resolved = self
            .resolver()
            .student(contact, hall_name, wing_name, roll)
            .await?;
        let request = CashRequest::new(date, amount);
        self.repo.add_cash_request(resolved.student.id, &request).await?;
        debug!(roll, request_id = %request.id, "cash request stored");
        Ok(request)
    }

    // ========================
    // Washerman views
    // ========================

    pub async fn student(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
        roll: &str,
    ) -> Result<Student, AppError> {
        Ok(self
            .resolver()
            .student(contact, hall_name, wing_name, roll)
            .await?
            .student)
    }

    /// Students with unaccepted records dated today, each with all such records.
    pub async fn pending_record_students(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<PendingRecords>, AppError> {
        let resolved = self.resolver().wing(contact, hall_name, wing_name).await?;
        Ok(reporting::pending_records(
            &resolved.students,
            now,
            self.config.zone,
        ))
    }

    /// Students whose latest cash request is unaccepted and dated today.
    pub async fn pending_cash_request_students(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<PendingCashRequest>, AppError> {
        let resolved = self.resolver().wing(contact, hall_name, wing_name).await?;
        Ok(reporting::pending_cash_requests(
            &resolved.students,
            now,
            self.config.zone,
        ))
    }

    /// For each student of the wing, the record dropped off on `day`.
    pub async fn wing_records_on_date(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
        day: DateTime<Utc>,
    ) -> Result<Vec<StudentDayRecord>, AppError> {
        let resolved = self.resolver().wing(contact, hall_name, wing_name).await?;
        Ok(reporting::records_on_day(
            &resolved.students,
            day,
            self.config.zone,
        ))
    }

    pub async fn summarize(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SummaryRow>, AppError> {
        let resolved = self.resolver().wing(contact, hall_name, wing_name).await?;
        Ok(reporting::summarize(&resolved.students, now, self.config.zone))
    }

    // ========================
    // Acceptance
    // ========================

    /// Accept the first of today's unaccepted wash records for a student.
    #[instrument(skip(self, now))]
    pub async fn accept_record(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
        roll: &str,
        now: DateTime<Utc>,
    ) -> Result<AcceptOutcome, AppError> {
        let resolved = self
            .resolver()
            .student(contact, hall_name, wing_name, roll)
            .await?;
        let zone = self.config.zone;

        self.commit_with_retry(resolved, |student| student.accept_pending_record(now, zone))
            .await
    }

    /// Accept today's cash request for a student and settle it against the
    /// student's dues in the same commit.
    #[instrument(skip(self, now))]
    pub async fn accept_cash_payment(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
        roll: &str,
        now: DateTime<Utc>,
    ) -> Result<AcceptOutcome, AppError> {
        let resolved = self
            .resolver()
            .student(contact, hall_name, wing_name, roll)
            .await?;
        let zone = self.config.zone;

        self.commit_with_retry(resolved, |student| student.accept_pending_cash(now, zone))
            .await
    }

    /// Apply `mutate` to the freshly loaded student and commit the change it
    /// describes, then re-read and run `mutate` again if the commit lost.
    ///
    /// Losing a row claim means another acceptance made progress, so it does
    /// not use up an attempt. Only stale event merges count against
    /// `max_accept_attempts`.
    async fn commit_with_retry<F>(
        &self,
        resolved: ResolvedStudent,
        mut mutate: F,
    ) -> Result<AcceptOutcome, AppError>
    where
        F: FnMut(&mut Student) -> Option<StudentChange>,
    {
        let mut student = resolved.student;
        let attempts = self.config.max_accept_attempts;
        let mut stale = 0;

        loop {
            let Some(change) = mutate(&mut student) else {
                debug!(roll = %student.roll, "nothing pending");
                return Ok(AcceptOutcome::NothingPending);
            };

            match self
                .repo
                .apply_change(student.id, student.version, &change)
                .await?
            {
                CommitOutcome::Committed { version, due_amount } => {
                    let change = settle(change, due_amount);
                    log_committed(&student, &change, version);
                    return Ok(AcceptOutcome::Accepted(change));
                }
                CommitOutcome::AlreadyClaimed => {
                    debug!(roll = %student.roll, "row claimed by another commit, re-reading");
                }
                CommitOutcome::Stale => {
                    stale += 1;
                    if stale >= attempts {
                        return Err(AppError::Conflict {
                            roll: student.roll,
                            attempts,
                        });
                    }
                    warn!(roll = %student.roll, attempt = stale, "student changed concurrently, retrying");
                }
            }

            student = self
                .repo
                .get_student(student.id)
                .await?
                .ok_or_else(|| AppError::not_found(Level::Student, &student.roll))?;
        }
    }

    // ========================
    // Calendar
    // ========================

    /// Merge the batch into the calendar of every student in the wing.
    /// Returns the number of students updated.
    pub async fn add_events(
        &self,
        contact: &str,
        hall_name: &str,
        wing_name: &str,
        events: &[EventInput],
    ) -> Result<usize, AppError> {
        let resolved = self.resolver().wing(contact, hall_name, wing_name).await?;
        if events.is_empty() {
            return Err(AppError::validation("events", "at least one event is required"));
        }

        let zone = self.config.zone;
        let mut updated = 0;
        for student in resolved.students {
            let single = ResolvedStudent {
                washerman: resolved.washerman.clone(),
                hall: resolved.hall.clone(),
                wing: resolved.wing.clone(),
                student,
            };
            let outcome = self
                .commit_with_retry(single, |s| Some(s.add_events(events, zone)))
                .await?;
            if outcome.is_accepted() {
                updated += 1;
            }
        }

        info!(hall = hall_name, wing = wing_name, students = updated, events = events.len(), "events merged");
        Ok(updated)
    }

    // ========================
    // Schedule
    // ========================

    pub async fn set_upcoming_date(
        &self,
        contact: &str,
        date: DateTime<Utc>,
    ) -> Result<Washerman, AppError> {
        let mut washerman = self.resolver().washerman(contact).await?;
        if !self.repo.set_upcoming_date(washerman.id, date).await? {
            return Err(AppError::not_found(Level::Washerman, contact));
        }
        washerman.upcoming_date = Some(date);
        Ok(washerman)
    }

    pub async fn upcoming_date(&self, contact: &str) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self.resolver().washerman(contact).await?.upcoming_date)
    }
}

/// Report the balance as stored by the commit. Other acceptances may have
/// landed since the student was read.
fn settle(change: StudentChange, stored_due: Paise) -> StudentChange {
    match change {
        StudentChange::CashAccepted {
            request_id, amount, ..
        } => StudentChange::CashAccepted {
            request_id,
            amount,
            due_before: stored_due + amount,
            due_after: stored_due,
        },
        other => other,
    }
}

fn log_committed(student: &Student, change: &StudentChange, version: i64) {
    match change {
        StudentChange::RecordAccepted { record_id } => {
            info!(roll = %student.roll, %record_id, version, "record accepted");
        }
        StudentChange::CashAccepted {
            request_id,
            amount,
            due_before,
            due_after,
        } => {
            info!(
                roll = %student.roll,
                %request_id,
                amount,
                due_before,
                due_after,
                version,
                "cash payment accepted"
            );
        }
        StudentChange::EventsMerged { events } => {
            debug!(roll = %student.roll, days = events.len(), version, "events stored");
        }
    }
}
