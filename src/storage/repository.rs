use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::domain::{
    CashRequest, Event, Hall, HallId, Paise, Record, Student, StudentChange, StudentId,
    Washerman, Wing, WingId, WashermanId,
};

use super::MIGRATION_001_INITIAL;

/// Result of trying to commit a [`StudentChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Written. Carries the stored version and balance after the commit.
    Committed { version: i64, due_amount: Paise },
    /// The target row was accepted by another commit first. Nothing was
    /// written.
    AlreadyClaimed,
    /// The student moved past `expected_version`. Nothing was written.
    Stale,
}

/// Repository for the washerman directory and the per-student ledgers.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Directory
    // ========================

    pub async fn save_washerman(&self, washerman: &Washerman) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO washermen (id, contact, name, upcoming_date, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(washerman.id.to_string())
        .bind(&washerman.contact)
        .bind(&washerman.name)
        .bind(washerman.upcoming_date.map(|dt| dt.to_rfc3339()))
        .bind(washerman.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save washerman")?;
        Ok(())
    }

    pub async fn find_washerman(&self, contact: &str) -> Result<Option<Washerman>> {
        let row = sqlx::query(
            r#"
            SELECT id, contact, name, upcoming_date, created_at
            FROM washermen
            WHERE contact = ?
            "#,
        )
        .bind(contact)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch washerman")?;

        row.as_ref().map(Self::row_to_washerman).transpose()
    }

    /// Overwrite the washerman's upcoming date. Returns false if no
    /// washerman has that id.
    pub async fn set_upcoming_date(&self, id: WashermanId, date: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE washermen SET upcoming_date = ? WHERE id = ?")
            .bind(date.to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update upcoming date")?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn save_hall(&self, hall: &Hall) -> Result<()> {
        sqlx::query("INSERT INTO halls (id, washerman_id, name) VALUES (?, ?, ?)")
            .bind(hall.id.to_string())
            .bind(hall.washerman_id.to_string())
            .bind(&hall.name)
            .execute(&self.pool)
            .await
            .context("Failed to save hall")?;
        Ok(())
    }

    pub async fn find_hall(&self, washerman_id: WashermanId, name: &str) -> Result<Option<Hall>> {
        let row = sqlx::query(
            "SELECT id, washerman_id, name FROM halls WHERE washerman_id = ? AND name = ?",
        )
        .bind(washerman_id.to_string())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch hall")?;

        row.map(|row| {
            Ok(Hall {
                id: parse_uuid(&row, "id")?,
                washerman_id: parse_uuid(&row, "washerman_id")?,
                name: row.get("name"),
            })
        })
        .transpose()
    }

    pub async fn save_wing(&self, wing: &Wing) -> Result<()> {
        sqlx::query("INSERT INTO wings (id, hall_id, name) VALUES (?, ?, ?)")
            .bind(wing.id.to_string())
            .bind(wing.hall_id.to_string())
            .bind(&wing.name)
            .execute(&self.pool)
            .await
            .context("Failed to save wing")?;
        Ok(())
    }

    pub async fn find_wing(&self, hall_id: HallId, name: &str) -> Result<Option<Wing>> {
        let row = sqlx::query("SELECT id, hall_id, name FROM wings WHERE hall_id = ? AND name = ?")
            .bind(hall_id.to_string())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch wing")?;

        row.map(|row| {
            Ok(Wing {
                id: parse_uuid(&row, "id")?,
                hall_id: parse_uuid(&row, "hall_id")?,
                name: row.get("name"),
            })
        })
        .transpose()
    }

    // ========================
    // Students
    // ========================

    /// Save a new student. Ledger entries on the struct are ignored; use
    /// `add_record` / `add_cash_request` for those.
    pub async fn save_student(&self, student: &Student) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO students (id, wing_id, roll, name, hall, wing, due_amount, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(student.id.to_string())
        .bind(student.wing_id.to_string())
        .bind(&student.roll)
        .bind(&student.name)
        .bind(&student.hall)
        .bind(&student.wing)
        .bind(student.due_amount)
        .bind(student.version)
        .execute(&self.pool)
        .await
        .context("Failed to save student")?;
        Ok(())
    }

    /// Load one student with all ledger entries.
    pub async fn get_student(&self, id: StudentId) -> Result<Option<Student>> {
        let row = sqlx::query(&format!("{STUDENT_SELECT} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch student")?;

        match row {
            Some(row) => Ok(self.hydrate(vec![Self::row_to_student(&row)?]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn find_student(&self, wing_id: WingId, roll: &str) -> Result<Option<Student>> {
        let row = sqlx::query(&format!("{STUDENT_SELECT} WHERE wing_id = ? AND roll = ?"))
            .bind(wing_id.to_string())
            .bind(roll)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch student by roll")?;

        match row {
            Some(row) => Ok(self.hydrate(vec![Self::row_to_student(&row)?]).await?.pop()),
            None => Ok(None),
        }
    }

    /// All students of a wing, ordered by roll, with ledger entries loaded.
    pub async fn list_students(&self, wing_id: WingId) -> Result<Vec<Student>> {
        let rows = sqlx::query(&format!("{STUDENT_SELECT} WHERE wing_id = ? ORDER BY roll"))
            .bind(wing_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list students")?;

        let students = rows
            .iter()
            .map(Self::row_to_student)
            .collect::<Result<Vec<_>>>()?;
        self.hydrate(students).await
    }

    /// Attach records, cash requests and events to bare student rows.
    async fn hydrate(&self, mut students: Vec<Student>) -> Result<Vec<Student>> {
        if students.is_empty() {
            return Ok(students);
        }

        let placeholders = vec!["?"; students.len()].join(", ");
        let ids: Vec<String> = students.iter().map(|s| s.id.to_string()).collect();

        let record_sql = format!(
            "SELECT id, student_id, date, clothes, accepted FROM records WHERE student_id IN ({placeholders}) ORDER BY seq"
        );
        let cash_sql = format!(
            "SELECT id, student_id, date, amount, accepted FROM cash_requests WHERE student_id IN ({placeholders}) ORDER BY seq"
        );
        let event_sql = format!(
            "SELECT student_id, date, labels FROM events WHERE student_id IN ({placeholders}) ORDER BY seq"
        );

        let mut record_query = sqlx::query(&record_sql);
        let mut cash_query = sqlx::query(&cash_sql);
        let mut event_query = sqlx::query(&event_sql);
        for id in &ids {
            record_query = record_query.bind(id);
            cash_query = cash_query.bind(id);
            event_query = event_query.bind(id);
        }

        let mut records: HashMap<StudentId, Vec<Record>> = HashMap::new();
        for row in record_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to load records")?
        {
            let student_id = parse_uuid(&row, "student_id")?;
            records
                .entry(student_id)
                .or_default()
                .push(Self::row_to_record(&row)?);
        }

        let mut cash_requests: HashMap<StudentId, Vec<CashRequest>> = HashMap::new();
        for row in cash_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to load cash requests")?
        {
            let student_id = parse_uuid(&row, "student_id")?;
            cash_requests
                .entry(student_id)
                .or_default()
                .push(Self::row_to_cash_request(&row)?);
        }

        let mut events: HashMap<StudentId, Vec<Event>> = HashMap::new();
        for row in event_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to load events")?
        {
            let student_id = parse_uuid(&row, "student_id")?;
            let labels: String = row.get("labels");
            events.entry(student_id).or_default().push(Event {
                date: parse_timestamp(&row, "date")?,
                labels: serde_json::from_str(&labels).context("Invalid event labels")?,
            });
        }

        for student in &mut students {
            student.records = records.remove(&student.id).unwrap_or_default();
            student.cash_requests = cash_requests.remove(&student.id).unwrap_or_default();
            student.events = events.remove(&student.id).unwrap_or_default();
            student.normalize();
        }

        Ok(students)
    }

    // ========================
    // Ledger entries
    // ========================

    /// Append a wash record to a student's ledger.
    pub async fn add_record(&self, student_id: StudentId, record: &Record) -> Result<()> {
        let clothes = serde_json::to_string(&record.clothes)?;
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let seq = Self::next_sequence(&mut tx).await?;

        sqlx::query(
            r#"
            INSERT INTO records (id, seq, student_id, date, clothes, accepted)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(seq)
        .bind(student_id.to_string())
        .bind(record.date.to_rfc3339())
        .bind(&clothes)
        .bind(record.accepted)
        .execute(&mut *tx)
        .await
        .context("Failed to save record")?;

        Self::bump_version(&mut tx, student_id).await?;
        tx.commit().await.context("Failed to commit record")?;
        Ok(())
    }

    /// Append a cash request to a student's ledger.
    pub async fn add_cash_request(&self, student_id: StudentId, request: &CashRequest) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let seq = Self::next_sequence(&mut tx).await?;

        sqlx::query(
            r#"
            INSERT INTO cash_requests (id, seq, student_id, date, amount, accepted)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.id.to_string())
        .bind(seq)
        .bind(student_id.to_string())
        .bind(request.date.to_rfc3339())
        .bind(request.amount)
        .bind(request.accepted)
        .execute(&mut *tx)
        .await
        .context("Failed to save cash request")?;

        Self::bump_version(&mut tx, student_id).await?;
        tx.commit().await.context("Failed to commit cash request")?;
        Ok(())
    }

    /// Commit `change` against the student.
    ///
    /// Acceptances claim their row with `accepted = 0` and move the balance
    /// relative to the stored value, so they only conflict when the same row
    /// was claimed first (`AlreadyClaimed`). For cash the flag flip and the
    /// balance decrement land in the same transaction. An event merge
    /// replaces the whole event set and so must still match
    /// `expected_version` (`Stale`).
    pub async fn apply_change(
        &self,
        student_id: StudentId,
        expected_version: i64,
        change: &StudentChange,
    ) -> Result<CommitOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let student_id_str = student_id.to_string();

        let claimed = match change {
            StudentChange::RecordAccepted { record_id } => {
                sqlx::query(
                    "UPDATE records SET accepted = 1 WHERE id = ? AND student_id = ? AND accepted = 0",
                )
                .bind(record_id.to_string())
                .bind(&student_id_str)
                .execute(&mut *tx)
                .await
                .context("Failed to accept record")?
                .rows_affected()
                    == 1
            }
            StudentChange::CashAccepted { request_id, .. } => {
                sqlx::query(
                    "UPDATE cash_requests SET accepted = 1 WHERE id = ? AND student_id = ? AND accepted = 0",
                )
                .bind(request_id.to_string())
                .bind(&student_id_str)
                .execute(&mut *tx)
                .await
                .context("Failed to accept cash request")?
                .rows_affected()
                    == 1
            }
            StudentChange::EventsMerged { events } => {
                Self::replace_events(&mut tx, student_id, events).await?;
                true
            }
        };

        if !claimed {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(CommitOutcome::AlreadyClaimed);
        }

        // Balance moves by the request amount, relative to the stored value.
        let amount = match change {
            StudentChange::CashAccepted { amount, .. } => *amount,
            _ => 0,
        };

        let guarded = matches!(change, StudentChange::EventsMerged { .. });
        let sql = if guarded {
            r#"
            UPDATE students
            SET due_amount = due_amount - ?, version = version + 1
            WHERE id = ? AND version = ?
            RETURNING version, due_amount
            "#
        } else {
            r#"
            UPDATE students
            SET due_amount = due_amount - ?, version = version + 1
            WHERE id = ?
            RETURNING version, due_amount
            "#
        };

        let mut query = sqlx::query(sql).bind(amount).bind(&student_id_str);
        if guarded {
            query = query.bind(expected_version);
        }
        let row = query
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to update student")?;

        match row {
            Some(row) => {
                tx.commit().await.context("Failed to commit change")?;
                Ok(CommitOutcome::Committed {
                    version: row.get("version"),
                    due_amount: row.get("due_amount"),
                })
            }
            None if guarded => {
                tx.rollback().await.context("Failed to roll back")?;
                Ok(CommitOutcome::Stale)
            }
            None => {
                tx.rollback().await.context("Failed to roll back")?;
                anyhow::bail!("Student {} does not exist", student_id)
            }
        }
    }

    async fn replace_events(
        tx: &mut Transaction<'_, Sqlite>,
        student_id: StudentId,
        events: &[Event],
    ) -> Result<()> {
        sqlx::query("DELETE FROM events WHERE student_id = ?")
            .bind(student_id.to_string())
            .execute(&mut **tx)
            .await
            .context("Failed to clear events")?;

        for (seq, event) in events.iter().enumerate() {
            sqlx::query("INSERT INTO events (student_id, seq, date, labels) VALUES (?, ?, ?, ?)")
                .bind(student_id.to_string())
                .bind(seq as i64)
                .bind(event.date.to_rfc3339())
                .bind(serde_json::to_string(&event.labels)?)
                .execute(&mut **tx)
                .await
                .context("Failed to save event")?;
        }
        Ok(())
    }

    async fn bump_version(tx: &mut Transaction<'_, Sqlite>, student_id: StudentId) -> Result<()> {
        let result = sqlx::query("UPDATE students SET version = version + 1 WHERE id = ?")
            .bind(student_id.to_string())
            .execute(&mut **tx)
            .await
            .context("Failed to bump student version")?;

        if result.rows_affected() != 1 {
            anyhow::bail!("Student {} does not exist", student_id);
        }
        Ok(())
    }

    /// Get the next ledger sequence number and increment the counter.
    async fn next_sequence(tx: &mut Transaction<'_, Sqlite>) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'ledger_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut **tx)
        .await
        .context("Failed to get next sequence number")?;

        Ok(row.get("value"))
    }

    // ========================
    // Row mapping
    // ========================

    fn row_to_washerman(row: &SqliteRow) -> Result<Washerman> {
        let upcoming: Option<String> = row.get("upcoming_date");
        Ok(Washerman {
            id: parse_uuid(row, "id")?,
            contact: row.get("contact"),
            name: row.get("name"),
            upcoming_date: upcoming
                .map(|s| DateTime::parse_from_rfc3339(&s))
                .transpose()
                .context("Invalid upcoming_date timestamp")?
                .map(|dt| dt.with_timezone(&Utc)),
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    fn row_to_student(row: &SqliteRow) -> Result<Student> {
        Ok(Student {
            id: parse_uuid(row, "id")?,
            wing_id: parse_uuid(row, "wing_id")?,
            roll: row.get("roll"),
            name: row.get("name"),
            hall: row.get("hall"),
            wing: row.get("wing"),
            due_amount: row.get("due_amount"),
            version: row.get("version"),
            records: Vec::new(),
            cash_requests: Vec::new(),
            events: Vec::new(),
        })
    }

    fn row_to_record(row: &SqliteRow) -> Result<Record> {
        let clothes: String = row.get("clothes");
        Ok(Record {
            id: parse_uuid(row, "id")?,
            date: parse_timestamp(row, "date")?,
            clothes: serde_json::from_str(&clothes).context("Invalid record clothes")?,
            accepted: row.get::<i32, _>("accepted") != 0,
        })
    }

    fn row_to_cash_request(row: &SqliteRow) -> Result<CashRequest> {
        Ok(CashRequest {
            id: parse_uuid(row, "id")?,
            date: parse_timestamp(row, "date")?,
            amount: row.get("amount"),
            accepted: row.get::<i32, _>("accepted") != 0,
        })
    }
}

const STUDENT_SELECT: &str =
    "SELECT id, wing_id, roll, name, hall, wing, due_amount, version FROM students";

fn parse_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let value: String = row.get(column);
    Uuid::parse_str(&value).with_context(|| format!("Invalid {column}"))
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let value: String = row.get(column);
    Ok(DateTime::parse_from_rfc3339(&value)
        .with_context(|| format!("Invalid {column} timestamp"))?
        .with_timezone(&Utc))
}
