use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};

use crate::application::api::{self, ApiResult};
use crate::application::LaundryService;
use crate::config::ServiceConfig;
use crate::domain::calendar::parse_day_or_instant;
use crate::domain::{format_paise, parse_paise, Cloth, EventInput, OperatingZone};
use crate::io::{DocumentRenderer, ImportOptions, PdfRenderer, RosterImporter, SummaryExporter};

/// Washday - campus laundry ledger
#[derive(Parser)]
#[command(name = "washday")]
#[command(about = "Wash records, cash settlements and per-student dues for a campus laundry")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "WASHDAY_DATABASE", default_value = "washday.db")]
    pub database: String,

    /// Operating zone offset used to decide what "today" is (e.g. +05:30)
    #[arg(long, env = "WASHDAY_ZONE", default_value = "+05:30", global = true)]
    pub zone: OperatingZone,

    /// Contact of the washerman acting on the ledger
    #[arg(short, long, env = "WASHDAY_WASHERMAN", global = true)]
    pub washerman: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Hall and wing a command is scoped to.
#[derive(Args, Debug, Clone)]
pub struct WingArgs {
    /// Hall name
    #[arg(long)]
    pub hall: String,

    /// Wing name
    #[arg(long)]
    pub wing: String,
}

/// A single student, addressed by roll within a wing.
#[derive(Args, Debug, Clone)]
pub struct StudentArgs {
    #[command(flatten)]
    pub scope: WingArgs,

    /// Student roll number
    #[arg(long)]
    pub roll: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Washerman management commands
    #[command(subcommand)]
    Washerman(WashermanCommands),

    /// Add a hall under the washerman
    AddHall {
        /// Hall name (unique per washerman)
        name: String,
    },

    /// Add a wing to a hall
    AddWing {
        /// Hall name
        #[arg(long)]
        hall: String,

        /// Wing name (unique per hall)
        name: String,
    },

    /// Student management and student-side requests
    #[command(subcommand)]
    Student(StudentCommands),

    /// Today's pending work for a wing
    #[command(subcommand)]
    Pending(PendingCommands),

    /// Accept today's pending item for a student
    #[command(subcommand)]
    Accept(AcceptCommands),

    /// Add calendar events to every student of a wing
    Events {
        #[command(flatten)]
        scope: WingArgs,

        /// Events as DATE=TITLE (e.g. 2024-05-01=Holiday), repeatable
        #[arg(short, long = "event")]
        events: Vec<String>,
    },

    /// Show the record each student of a wing dropped off on a day
    RecordsOn {
        #[command(flatten)]
        scope: WingArgs,

        /// Day (YYYY-MM-DD)
        date: String,
    },

    /// Monthly summary of accepted clothes and dues
    Summary {
        #[command(flatten)]
        scope: WingArgs,

        /// Format: json, csv, pdf, export (JSON file with metadata)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file (stdout if omitted; required for pdf)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import a student roster from CSV (hall,wing,roll,name[,due_amount])
    Import {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip students that already exist
        #[arg(long)]
        skip_duplicates: bool,
    },
}

#[derive(Subcommand)]
pub enum WashermanCommands {
    /// Register the washerman given by --washerman
    Register {
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Set the next collection day
    SetUpcoming {
        /// Day (YYYY-MM-DD) or RFC 3339 timestamp
        date: String,
    },

    /// Show the next collection day
    Upcoming,
}

#[derive(Subcommand)]
pub enum StudentCommands {
    /// Add a student to a wing
    Add {
        #[command(flatten)]
        student: StudentArgs,

        /// Student name
        #[arg(short, long)]
        name: String,

        /// Opening dues (e.g. "120.50")
        #[arg(long, default_value = "0")]
        due: String,
    },

    /// Submit a wash drop-off on behalf of a student
    RequestWash {
        #[command(flatten)]
        student: StudentArgs,

        /// Clothes as TYPE=QUANTITY (e.g. shirt=3), repeatable
        #[arg(short, long = "cloth", required = true)]
        clothes: Vec<String>,

        /// Day of the drop-off (defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Submit a cash settlement request on behalf of a student
    RequestCash {
        #[command(flatten)]
        student: StudentArgs,

        /// Amount handed over (e.g. "200" or "200.50")
        amount: String,

        /// Day of the request (defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show a student's ledger
    Show {
        #[command(flatten)]
        student: StudentArgs,
    },
}

#[derive(Subcommand)]
pub enum PendingCommands {
    /// Students with unaccepted wash records dated today
    Records {
        #[command(flatten)]
        scope: WingArgs,
    },

    /// Students whose latest cash request is unaccepted and dated today
    Cash {
        #[command(flatten)]
        scope: WingArgs,
    },
}

#[derive(Subcommand)]
pub enum AcceptCommands {
    /// Accept today's wash record
    Record {
        #[command(flatten)]
        student: StudentArgs,
    },

    /// Accept today's cash payment and settle the dues
    Cash {
        #[command(flatten)]
        student: StudentArgs,
    },
}

impl Cli {
    fn config(&self) -> ServiceConfig {
        ServiceConfig::default().with_zone(self.zone)
    }

    fn contact(&self) -> Result<&str> {
        self.washerman
            .as_deref()
            .context("No washerman given. Use --washerman or set WASHDAY_WASHERMAN")
    }

    pub async fn run(self) -> Result<()> {
        if matches!(self.command, Commands::Init) {
            LaundryService::init(&self.database, self.config()).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = LaundryService::connect(&self.database, self.config()).await?;
        let contact = self.contact()?;
        let zone = self.zone;
        let now = Utc::now();

        match &self.command {
            Commands::Init => unreachable!("handled above"),

            Commands::Washerman(cmd) => run_washerman_command(&service, contact, zone, cmd).await?,

            Commands::AddHall { name } => {
                let hall = service.add_hall(contact, name).await?;
                println!("Created hall: {}", hall.name);
            }

            Commands::AddWing { hall, name } => {
                let wing = service.add_wing(contact, hall, name).await?;
                println!("Created wing: {} in {}", wing.name, hall);
            }

            Commands::Student(cmd) => run_student_command(&service, contact, zone, now, cmd).await?,

            Commands::Pending(PendingCommands::Records { scope }) => print_response(
                api::pending_records(
                    service
                        .pending_record_students(contact, &scope.hall, &scope.wing, now)
                        .await,
                ),
            )?,

            Commands::Pending(PendingCommands::Cash { scope }) => print_response(
                api::pending_cash_requests(
                    service
                        .pending_cash_request_students(contact, &scope.hall, &scope.wing, now)
                        .await,
                ),
            )?,

            Commands::Accept(AcceptCommands::Record { student }) => print_response(
                api::accept_record(
                    service
                        .accept_record(
                            contact,
                            &student.scope.hall,
                            &student.scope.wing,
                            &student.roll,
                            now,
                        )
                        .await,
                ),
            )?,

            Commands::Accept(AcceptCommands::Cash { student }) => print_response(
                api::accept_cash_payment(
                    service
                        .accept_cash_payment(
                            contact,
                            &student.scope.hall,
                            &student.scope.wing,
                            &student.roll,
                            now,
                        )
                        .await,
                ),
            )?,

            Commands::Events { scope, events } => {
                let events = events
                    .iter()
                    .map(|e| parse_event(e, zone))
                    .collect::<Result<Vec<_>>>()?;
                print_response(api::add_events(
                    service
                        .add_events(contact, &scope.hall, &scope.wing, &events)
                        .await,
                ))?;
            }

            Commands::RecordsOn { scope, date } => {
                let day = parse_date(date, zone)?;
                print_response(api::records_on_date(
                    service
                        .wing_records_on_date(contact, &scope.hall, &scope.wing, day)
                        .await,
                ))?;
            }

            Commands::Summary {
                scope,
                format,
                output,
            } => {
                run_summary_command(&service, contact, scope, format, output.as_deref(), now)
                    .await?
            }

            Commands::Import {
                input,
                dry_run,
                skip_duplicates,
            } => {
                let reader: Box<dyn io::Read> = match input {
                    Some(path) => Box::new(
                        File::open(path).with_context(|| format!("Failed to open {}", path))?,
                    ),
                    None => Box::new(io::stdin()),
                };
                let options = ImportOptions {
                    dry_run: *dry_run,
                    skip_duplicates: *skip_duplicates,
                };
                let result = RosterImporter::new(&service)
                    .import_csv(contact, reader, options)
                    .await?;

                if *dry_run {
                    println!("Dry run: {} student(s) would be imported", result.imported);
                } else {
                    println!(
                        "Imported {} student(s), skipped {}",
                        result.imported, result.skipped
                    );
                }
                for error in &result.errors {
                    eprintln!(
                        "  line {}{}: {}",
                        error.line,
                        error
                            .field
                            .as_ref()
                            .map(|f| format!(" ({})", f))
                            .unwrap_or_default(),
                        error.error
                    );
                }
            }
        }

        Ok(())
    }
}

async fn run_washerman_command(
    service: &LaundryService,
    contact: &str,
    zone: OperatingZone,
    cmd: &WashermanCommands,
) -> Result<()> {
    match cmd {
        WashermanCommands::Register { name } => {
            let washerman = service.register_washerman(contact, name.clone()).await?;
            println!("Registered washerman: {}", washerman.contact);
        }
        WashermanCommands::SetUpcoming { date } => {
            let date = parse_date(date, zone)?;
            print_response(api::set_upcoming_date(
                service.set_upcoming_date(contact, date).await,
            ))?;
        }
        WashermanCommands::Upcoming => {
            print_response(api::upcoming_date(service.upcoming_date(contact).await))?;
        }
    }
    Ok(())
}

async fn run_student_command(
    service: &LaundryService,
    contact: &str,
    zone: OperatingZone,
    now: DateTime<Utc>,
    cmd: &StudentCommands,
) -> Result<()> {
    match cmd {
        StudentCommands::Add { student, name, due } => {
            let due = parse_paise(due).context("Invalid due format. Use '120.50' or '120'")?;
            let created = service
                .add_student(
                    contact,
                    &student.scope.hall,
                    &student.scope.wing,
                    &student.roll,
                    name,
                    due,
                )
                .await?;
            println!(
                "Created student: {} ({}) dues {}",
                created.name,
                created.roll,
                format_paise(created.due_amount)
            );
        }

        StudentCommands::RequestWash {
            student,
            clothes,
            date,
        } => {
            let clothes = clothes
                .iter()
                .map(String::as_str)
                .map(parse_cloth)
                .collect::<Result<Vec<_>>>()?;
            let date = date.as_deref().map(|d| parse_date(d, zone)).transpose()?;
            let record = service
                .submit_wash_request(
                    contact,
                    &student.scope.hall,
                    &student.scope.wing,
                    &student.roll,
                    date.unwrap_or(now),
                    clothes,
                )
                .await?;
            println!(
                "Recorded wash request: {} item(s) ({})",
                record.cloth_count(),
                record.id
            );
        }

        StudentCommands::RequestCash {
            student,
            amount,
            date,
        } => {
            let amount =
                parse_paise(amount).context("Invalid amount format. Use '200.00' or '200'")?;
            let date = date.as_deref().map(|d| parse_date(d, zone)).transpose()?;
            let request = service
                .submit_cash_request(
                    contact,
                    &student.scope.hall,
                    &student.scope.wing,
                    &student.roll,
                    date.unwrap_or(now),
                    amount,
                )
                .await?;
            println!(
                "Recorded cash request: {} ({})",
                format_paise(request.amount),
                request.id
            );
        }

        StudentCommands::Show { student } => {
            let s = service
                .student(contact, &student.scope.hall, &student.scope.wing, &student.roll)
                .await?;

            println!("Student: {} ({})", s.name, s.roll);
            println!("  Hall/Wing: {} / {}", s.hall, s.wing);
            println!("  Dues:      {}", format_paise(s.due_amount));
            println!("  Clothes:   {} accepted", s.accepted_cloth_total());

            if !s.records.is_empty() {
                println!();
                println!("{:<12} {:>7} {:<10}", "Date", "Items", "Status");
                println!("{}", "-".repeat(31));
                for record in &s.records {
                    println!(
                        "{:<12} {:>7} {:<10}",
                        zone.local_date(record.date),
                        record.cloth_count(),
                        if record.accepted { "accepted" } else { "pending" }
                    );
                }
            }

            if !s.cash_requests.is_empty() {
                println!();
                println!("{:<12} {:>10} {:<10}", "Date", "Amount", "Status");
                println!("{}", "-".repeat(34));
                for request in &s.cash_requests {
                    println!(
                        "{:<12} {:>10} {:<10}",
                        zone.local_date(request.date),
                        format_paise(request.amount),
                        if request.accepted { "accepted" } else { "pending" }
                    );
                }
            }

            for event in &s.events {
                println!("  {}: {}", zone.local_date(event.date), event.labels.join(", "));
            }
        }
    }
    Ok(())
}

async fn run_summary_command(
    service: &LaundryService,
    contact: &str,
    scope: &WingArgs,
    format: &str,
    output: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    let result = service.summarize(contact, &scope.hall, &scope.wing, now).await;

    if format == "json" {
        return print_response(api::summary(result));
    }

    let rows = match api::summary(result) {
        Ok(response) => response.payload.summary,
        Err(e) => return fail(e),
    };

    let mut writer: Box<dyn Write> = match output {
        Some(path) => {
            Box::new(File::create(path).with_context(|| format!("Failed to create {}", path))?)
        }
        None if format == "pdf" => bail!("PDF output needs --output <file>"),
        None => Box::new(io::stdout()),
    };

    match format {
        "csv" => {
            SummaryExporter::new(&rows).export_csv(&mut writer)?;
        }
        "export" => {
            SummaryExporter::new(&rows).export_json(&mut writer, &scope.hall, &scope.wing)?;
        }
        "pdf" => {
            let renderer = PdfRenderer::default();
            let bytes = renderer.render("Summary Report", &rows)?;
            writer.write_all(&bytes)?;
            writer.flush()?;
            eprintln!(
                "Wrote {} bytes ({}) for {} student(s)",
                bytes.len(),
                renderer.content_type(),
                rows.len()
            );
        }
        other => bail!("Unknown summary format '{}'. Use json, csv, pdf or export", other),
    }

    Ok(())
}

fn print_response<T: Serialize>(result: ApiResult<T>) -> Result<()> {
    match result {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response.to_json())?);
            Ok(())
        }
        Err(e) => fail(e),
    }
}

fn fail(error: api::ApiError) -> Result<()> {
    eprintln!("{}", serde_json::to_string_pretty(&error.body)?);
    Err(anyhow!("request failed with status {}", error.status))
}

fn parse_date(input: &str, zone: OperatingZone) -> Result<DateTime<Utc>> {
    parse_day_or_instant(input, zone)
        .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", input))
}

/// Parse "shirt=3" into a cloth entry.
fn parse_cloth(input: &str) -> Result<Cloth> {
    let (cloth_type, quantity) = input
        .split_once('=')
        .with_context(|| format!("Invalid cloth '{}'. Use TYPE=QUANTITY", input))?;
    let quantity: i64 = quantity
        .trim()
        .parse()
        .with_context(|| format!("Invalid quantity in '{}'", input))?;
    Ok(Cloth::new(cloth_type.trim(), quantity))
}

/// Parse "2024-05-01=Holiday" into an event.
fn parse_event(input: &str, zone: OperatingZone) -> Result<EventInput> {
    let (date, title) = input
        .split_once('=')
        .with_context(|| format!("Invalid event '{}'. Use DATE=TITLE", input))?;
    Ok(EventInput::new(parse_date(date, zone)?, title.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cloth() {
        let cloth = parse_cloth("shirt=3").unwrap();
        assert_eq!(cloth, Cloth::new("shirt", 3));
        assert!(parse_cloth("shirt").is_err());
        assert!(parse_cloth("shirt=many").is_err());
    }

    #[test]
    fn test_parse_event() {
        let zone = OperatingZone::kolkata();
        let event = parse_event("2024-05-01=No collection", zone).unwrap();
        assert_eq!(event.title, "No collection");
        assert_eq!(zone.local_date(event.date).to_string(), "2024-05-01");
        assert!(parse_event("Holiday", zone).is_err());
    }

    #[test]
    fn test_cli_parses_accept() {
        let cli = Cli::try_parse_from([
            "washday",
            "--washerman",
            "9876543210",
            "accept",
            "cash",
            "--hall",
            "H1",
            "--wing",
            "A",
            "--roll",
            "21CS001",
        ])
        .unwrap();
        assert_eq!(cli.zone, OperatingZone::kolkata());
        assert!(matches!(
            cli.command,
            Commands::Accept(AcceptCommands::Cash { .. })
        ));
    }
}
