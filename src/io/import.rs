use anyhow::Result;
use std::collections::HashSet;
use std::io::Read;
use tracing::warn;

use crate::application::{AppError, LaundryService};
use crate::domain::{Paise, parse_paise};

/// Result of a roster import
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error on one roster line
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for roster imports
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub skip_duplicates: bool,
}

/// One validated roster line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub hall: String,
    pub wing: String,
    pub roll: String,
    pub name: String,
    pub due_amount: Paise,
}

/// Loads a student roster (`hall,wing,roll,name[,due_amount]`) under a
/// washerman, creating halls and wings as they first appear.
pub struct RosterImporter<'a> {
    service: &'a LaundryService,
}

impl<'a> RosterImporter<'a> {
    pub fn new(service: &'a LaundryService) -> Self {
        Self { service }
    }

    pub async fn import_csv<R: Read>(
        &self,
        contact: &str,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let (entries, mut result) = parse_roster(reader)?;
        if options.dry_run {
            result.imported = entries.len();
            return Ok(result);
        }

        let mut halls: HashSet<String> = HashSet::new();
        let mut wings: HashSet<(String, String)> = HashSet::new();

        for (line, entry) in entries {
            if halls.insert(entry.hall.clone()) {
                ignore_existing(self.service.add_hall(contact, &entry.hall).await)?;
            }
            if wings.insert((entry.hall.clone(), entry.wing.clone())) {
                ignore_existing(
                    self.service
                        .add_wing(contact, &entry.hall, &entry.wing)
                        .await,
                )?;
            }

            match self
                .service
                .add_student(
                    contact,
                    &entry.hall,
                    &entry.wing,
                    &entry.roll,
                    &entry.name,
                    entry.due_amount,
                )
                .await
            {
                Ok(_) => result.imported += 1,
                Err(AppError::AlreadyExists { .. }) if options.skip_duplicates => {
                    result.skipped += 1;
                }
                Err(e @ AppError::AlreadyExists { .. }) => result.errors.push(ImportError {
                    line,
                    field: Some("roll".to_string()),
                    error: e.to_string(),
                }),
                Err(e) => return Err(e.into()),
            }
        }

        Ok(result)
    }
}

/// Treat "already exists" as success; propagate everything else.
fn ignore_existing<T>(result: Result<T, AppError>) -> Result<()> {
    match result {
        Ok(_) | Err(AppError::AlreadyExists { .. }) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Parse and validate every line. Invalid lines are reported, not fatal.
pub fn parse_roster<R: Read>(reader: R) -> Result<(Vec<(usize, RosterEntry)>, ImportResult)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();
    let mut result = ImportResult::default();

    for (line_num, record) in csv_reader.records().enumerate() {
        let line = line_num + 2; // +2 for header and 0-indexing

        let record = match record {
            Ok(r) => r,
            Err(e) => {
                result.errors.push(ImportError {
                    line,
                    field: None,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let field = |i: usize| record.get(i).unwrap_or("").to_string();
        let entry = RosterEntry {
            hall: field(0),
            wing: field(1),
            roll: field(2),
            name: field(3),
            due_amount: 0,
        };

        if let Some(missing) = [
            ("hall", &entry.hall),
            ("wing", &entry.wing),
            ("roll", &entry.roll),
            ("name", &entry.name),
        ]
        .iter()
        .find(|(_, value)| value.is_empty())
        {
            result.errors.push(ImportError {
                line,
                field: Some(missing.0.to_string()),
                error: "missing value".to_string(),
            });
            continue;
        }

        let due = field(4);
        let due_amount = if due.is_empty() {
            0
        } else {
            match parse_paise(&due) {
                Ok(paise) => paise,
                Err(e) => {
                    warn!(line, value = %due, "invalid due amount in roster");
                    result.errors.push(ImportError {
                        line,
                        field: Some("due_amount".to_string()),
                        error: e.to_string(),
                    });
                    continue;
                }
            }
        };

        entries.push((line, RosterEntry { due_amount, ..entry }));
    }

    Ok((entries, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roster() {
        let csv = "hall,wing,roll,name,due_amount\n\
                   H1,A,21CS001,Asha,120.50\n\
                   H1,A,21CS002,Ravi,\n\
                   H1,B,21CS003,,10\n\
                   H2,A,21CS004,Meera,ten\n";
        let (entries, result) = parse_roster(csv.as_bytes()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1.due_amount, 12050);
        assert_eq!(entries[1].1.due_amount, 0);

        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].line, 4);
        assert_eq!(result.errors[0].field.as_deref(), Some("name"));
        assert_eq!(result.errors[1].field.as_deref(), Some("due_amount"));
    }
}
