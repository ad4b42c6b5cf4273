//! Calm Cycle CLI - Command-line interface for the cycle engine
//!
//! Commands:
//! - derive: Derive cycle records from marked days
//! - stats: Cycle statistics, history and trend
//! - predict: Upcoming cycles, fertile window and status
//! - risk: Pregnancy risk timelines for recent events
//! - snapshot: Everything above in one document
//! - validate: Validate a tracker document
//! - doctor: Diagnose configuration and environment
//!
//! Every command reads a calmcycle.input.v1 document from `--input` (file or `-`
//! for stdin). Logs go to stderr, filtered by `RUST_LOG`.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use calmcycle::dates::{local_today, parse_iso_date, CalendarDate};
use calmcycle::schema::{TrackerInput, ValidationIssue, SCHEMA_VERSION};
use calmcycle::stats::StatsCalculator;
use calmcycle::types::{CycleHistoryRow, CycleStats, CycleStatus, CycleTrend, PredictionResult};
use calmcycle::{CycleEngine, EngineConfig, EngineError, ENGINE_VERSION, PRODUCER_NAME};

/// Calm Cycle - menstrual cycle derivation and prediction engine
#[derive(Parser)]
#[command(name = "calmcycle")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Derive cycles, predict periods and assess risk from tracker data", long_about = None)]
struct Cli {
    /// Evaluation date (YYYY-MM-DD); defaults to the document's `today`, then the local date
    #[arg(long, global = true)]
    today: Option<String>,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive cycle records from marked days
    Derive {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print cycle statistics with history and trend
    Stats {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Predict upcoming cycles
    Predict {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Assess pregnancy risk for recent events
    Risk {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compute the full dashboard snapshot
    Snapshot {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Validate a tracker document
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

fn run(cli: Cli) -> Result<(), CalmCliError> {
    let today = cli.today.as_deref().map(parse_iso_date).transpose()?;
    let config = cli.config.as_deref();
    let pretty = cli.pretty;
    let engine = || -> Result<CycleEngine, CalmCliError> {
        Ok(CycleEngine::with_config(load_config(config)?)?)
    };

    match cli.command {
        Commands::Derive { input } => {
            let engine = engine()?;
            let (doc, _) = read_input(&input, today)?;
            print_json(&engine.cycles_for(&doc), pretty)
        }

        Commands::Stats { input } => {
            let engine = engine()?;
            let (doc, _) = read_input(&input, today)?;
            print_json(&stats_report(&engine, &doc), pretty)
        }

        Commands::Predict { input } => {
            let engine = engine()?;
            let (doc, today) = read_input(&input, today)?;
            let cycles = engine.cycles_for(&doc);
            let prediction = engine.predict(&cycles, today);
            let status = prediction
                .as_ref()
                .and_then(|p| engine.status(&cycles, p, today));
            print_json(&PredictReport { prediction, status }, pretty)
        }

        Commands::Risk { input } => {
            let engine = engine()?;
            let (doc, today) = read_input(&input, today)?;
            let cycles = engine.cycles_for(&doc);
            let risk = engine.assess_recent(&doc.events, &cycles, today);
            print_json(&risk, pretty)
        }

        Commands::Snapshot { input } => {
            let engine = engine()?;
            let (doc, today) = read_input(&input, today)?;
            reject_invalid(&doc)?;
            print_json(&engine.snapshot(&doc, today), pretty)
        }

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Doctor { json } => cmd_doctor(config, json),
    }
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), CalmCliError> {
    let doc = TrackerInput::from_json(&read_source(input)?)?;
    let issues = doc.validate();

    let report = ValidationReport {
        schema_version: doc.schema_version.clone(),
        cycles: doc.cycles.len(),
        events: doc.events.len(),
        daily_logs: doc.daily_logs.len(),
        marked_days: doc.marked_days.as_ref().map_or(0, Vec::len),
        issues,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Schema:       {}", report.schema_version);
        println!("Marked days:  {}", report.marked_days);
        println!("Cycles:       {}", report.cycles);
        println!("Events:       {}", report.events);
        println!("Daily logs:   {}", report.daily_logs);

        if !report.issues.is_empty() {
            println!("\nIssues:");
            for issue in &report.issues {
                match issue.index {
                    Some(idx) => println!("  - {}[{}]: {}", issue.section, idx, issue.error),
                    None => println!("  - {}: {}", issue.section, issue.error),
                }
            }
        }
    }

    if report.issues.is_empty() {
        Ok(())
    } else {
        Err(CalmCliError::ValidationFailed(report.issues.len()))
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), CalmCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Engine version {}", ENGINE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    checks.push(DoctorCheck {
        name: "local_date".to_string(),
        status: CheckStatus::Ok,
        message: format!("Local date is {}", local_today()),
    });

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist; defaults will be used".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match EngineConfig::from_json(&content) {
                    Ok(cfg) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (history window {}, horizon {})",
                            cfg.history_window, cfg.prediction_horizon
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Calm Cycle Doctor Report");
        println!("========================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CalmCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<EngineConfig, CalmCliError> {
    match path {
        Some(p) if p.exists() => {
            debug!(path = %p.display(), "loading config");
            Ok(EngineConfig::from_json(&fs::read_to_string(p)?)?)
        }
        Some(p) => {
            warn!(path = %p.display(), "config file not found; using defaults");
            Ok(EngineConfig::default())
        }
        None => Ok(EngineConfig::default()),
    }
}

fn read_source(input: &Path) -> Result<String, CalmCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

/// Read a document and settle the evaluation date
fn read_input(
    input: &Path,
    today: Option<CalendarDate>,
) -> Result<(TrackerInput, CalendarDate), CalmCliError> {
    let doc = TrackerInput::from_json(&read_source(input)?)?;
    let today = today.or(doc.today).unwrap_or_else(local_today);
    debug!(%today, "evaluation date");
    Ok((doc, today))
}

fn reject_invalid(doc: &TrackerInput) -> Result<(), CalmCliError> {
    let issues = doc.validate();
    if issues.is_empty() {
        Ok(())
    } else {
        Err(CalmCliError::ValidationFailed(issues.len()))
    }
}

fn stats_report(engine: &CycleEngine, doc: &TrackerInput) -> StatsReport {
    let calc = StatsCalculator::new(engine.config());
    let cycles = engine.cycles_for(doc);
    let stats = calc.compute(&cycles);
    let history = calc.history(&cycles, engine.config().history_window);
    let trend = calc.trend(&stats, &history);
    StatsReport { stats, history, trend }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CalmCliError> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

// Error types

#[derive(Debug)]
enum CalmCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for CalmCliError {
    fn from(e: io::Error) -> Self {
        CalmCliError::Io(e)
    }
}

impl From<EngineError> for CalmCliError {
    fn from(e: EngineError) -> Self {
        CalmCliError::Engine(e)
    }
}

impl From<serde_json::Error> for CalmCliError {
    fn from(e: serde_json::Error) -> Self {
        CalmCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CalmCliError> for CliError {
    fn from(e: CalmCliError) -> Self {
        match e {
            CalmCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CalmCliError::Engine(e) => {
                let (code, hint) = match e {
                    EngineError::DateParse(_) => ("DATE_ERROR", "Dates must be YYYY-MM-DD"),
                    EngineError::Json(_) => ("PARSE_ERROR", "Ensure input matches calmcycle.input.v1"),
                    EngineError::InvalidConfig(_) => ("CONFIG_ERROR", "Run 'calmcycle doctor --config <path>'"),
                    EngineError::InvalidInput(_) => ("INPUT_ERROR", "Run 'calmcycle validate' for details"),
                    EngineError::Encoding(_) => ("ENCODING_ERROR", "Report this as a bug"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            CalmCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CalmCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} validation issues found", count),
                hint: Some("Run 'calmcycle validate' for details".to_string()),
            },
            CalmCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct StatsReport {
    stats: CycleStats,
    history: Vec<CycleHistoryRow>,
    trend: CycleTrend,
}

#[derive(Serialize)]
struct PredictReport {
    prediction: Option<PredictionResult>,
    status: Option<CycleStatus>,
}

#[derive(Serialize)]
struct ValidationReport {
    schema_version: String,
    marked_days: usize,
    cycles: usize,
    events: usize,
    daily_logs: usize,
    issues: Vec<ValidationIssue>,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
