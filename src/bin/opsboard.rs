//! Opsboard CLI - Command-line interface for the dashboard aggregation core
//!
//! Commands:
//! - snapshot: Compute the executive KPIs, module cards and activity feed
//! - campaigns: Grouped campaign or ad performance report
//! - feed: Print the merged activity feed
//! - doctor: Diagnose dataset and configuration

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use opsboard::config::DashboardConfig;
use opsboard::metrics::GroupBy;
use opsboard::pipeline::DashboardProcessor;
use opsboard::source::{MemorySource, Table};
use opsboard::types::FeedEntry;
use opsboard::{DashboardError, OPSBOARD_VERSION, PRODUCER_NAME};

/// Opsboard - Aggregation core for the marketing operations dashboard
#[derive(Parser)]
#[command(name = "opsboard")]
#[command(author = "Stemn Root Engineering")]
#[command(version = OPSBOARD_VERSION)]
#[command(about = "Compute dashboard KPIs and activity feeds from a dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a full dashboard snapshot
    Snapshot {
        /// Dataset file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Reference time for relative ages (RFC 3339, defaults to now)
        #[arg(long)]
        now: Option<String>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Grouped campaign or ad performance
    Campaigns {
        /// Dataset file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Group performance rows by campaign or by ad
        #[arg(long, default_value = "campaign")]
        group_by: GroupKey,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Print the merged activity feed
    Feed {
        /// Dataset file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Reference time for relative ages (RFC 3339, defaults to now)
        #[arg(long)]
        now: Option<String>,

        /// Override the number of feed entries
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose dataset and configuration
    Doctor {
        /// Dataset file to check
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Configuration file to check
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupKey {
    /// One group per campaign (spend from the campaign ledger)
    Campaign,
    /// One group per online ad
    Ad,
}

impl From<GroupKey> for GroupBy {
    fn from(key: GroupKey) -> Self {
        match key {
            GroupKey::Campaign => GroupBy::Campaign,
            GroupKey::Ad => GroupBy::Ad,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

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

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), OpsCliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Commands::Snapshot {
            input,
            config,
            now,
            output_format,
        } => runtime.block_on(cmd_snapshot(&input, config.as_deref(), now.as_deref(), output_format)),

        Commands::Campaigns {
            input,
            config,
            group_by,
            output_format,
        } => runtime.block_on(cmd_campaigns(&input, config.as_deref(), group_by, output_format)),

        Commands::Feed {
            input,
            config,
            now,
            limit,
            json,
        } => runtime.block_on(cmd_feed(&input, config.as_deref(), now.as_deref(), limit, json)),

        Commands::Doctor { input, config, json } => {
            runtime.block_on(cmd_doctor(input.as_deref(), config.as_deref(), json))
        }
    }
}

async fn cmd_snapshot(
    input: &Path,
    config: Option<&Path>,
    now: Option<&str>,
    output_format: OutputFormat,
) -> Result<(), OpsCliError> {
    let config = load_config(config)?;
    let now = reference_time(now)?;
    let source = load_source(input)?;

    let snapshot = DashboardProcessor::new(config).refresh(&source, now).await?;
    println!("{}", format_output(&snapshot, &output_format)?);
    Ok(())
}

async fn cmd_campaigns(
    input: &Path,
    config: Option<&Path>,
    group_by: GroupKey,
    output_format: OutputFormat,
) -> Result<(), OpsCliError> {
    let config = load_config(config)?;
    let source = load_source(input)?;

    let report = DashboardProcessor::new(config)
        .campaign_report(&source, group_by.into())
        .await?;
    println!("{}", format_output(&report, &output_format)?);
    Ok(())
}

async fn cmd_feed(
    input: &Path,
    config: Option<&Path>,
    now: Option<&str>,
    limit: Option<usize>,
    json: bool,
) -> Result<(), OpsCliError> {
    let mut config = load_config(config)?;
    if let Some(limit) = limit {
        config.feed_limit = limit;
        config.validate()?;
    }
    let now = reference_time(now)?;
    let source = load_source(input)?;

    let snapshot = DashboardProcessor::new(config).refresh(&source, now).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.feed)?);
    } else {
        print_feed(&snapshot.feed);
    }
    Ok(())
}

async fn cmd_doctor(
    input: Option<&Path>,
    config: Option<&Path>,
    json: bool,
) -> Result<(), OpsCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "opsboard_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Opsboard version {}", OPSBOARD_VERSION),
    });

    match config {
        Some(path) => match DashboardConfig::from_file(path) {
            Ok(config) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Config valid (feed limit {}, analytics window {} days, currency {})",
                    config.feed_limit, config.analytics_window, config.currency
                ),
            }),
            Err(e) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            }),
        },
        None => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "No config file, using defaults".to_string(),
        }),
    }

    if let Some(path) = input {
        if path.exists() {
            match fs::read_to_string(path)
                .map_err(DashboardError::from)
                .and_then(|content| MemorySource::from_dataset(&content))
            {
                Ok(source) => {
                    let sizes = source.table_sizes().await;
                    let missing: Vec<&str> = Table::ALL
                        .iter()
                        .filter(|t| !sizes.contains_key(*t))
                        .map(|t| t.as_str())
                        .collect();
                    let rows: usize = sizes.values().sum();

                    checks.push(DoctorCheck {
                        name: "dataset".to_string(),
                        status: CheckStatus::Ok,
                        message: format!("Dataset valid ({} tables, {} rows)", sizes.len(), rows),
                    });
                    if !missing.is_empty() {
                        checks.push(DoctorCheck {
                            name: "dataset_tables".to_string(),
                            status: CheckStatus::Warning,
                            message: format!(
                                "Tables absent (their figures read as zero): {}",
                                missing.join(", ")
                            ),
                        });
                    }
                }
                Err(e) => checks.push(DoctorCheck {
                    name: "dataset".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                }),
            }
        } else {
            checks.push(DoctorCheck {
                name: "dataset".to_string(),
                status: CheckStatus::Warning,
                message: "Dataset file does not exist".to_string(),
            });
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass datasets with --input <file>)".to_string(),
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
        version: OPSBOARD_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Opsboard Doctor Report");
        println!("======================");
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
        Err(OpsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<DashboardConfig, OpsCliError> {
    match path {
        Some(path) => Ok(DashboardConfig::from_file(path)?),
        None => Ok(DashboardConfig::default()),
    }
}

fn load_source(input: &Path) -> Result<MemorySource, OpsCliError> {
    let dataset = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(OpsCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    Ok(MemorySource::from_dataset(&dataset)?)
}

fn reference_time(now: Option<&str>) -> Result<DateTime<Utc>, OpsCliError> {
    match now {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| OpsCliError::BadTime(format!("{raw}: {e}"))),
        None => Ok(Utc::now()),
    }
}

fn format_output<T: Serialize>(value: &T, format: &OutputFormat) -> Result<String, OpsCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

fn print_feed(feed: &[FeedEntry]) {
    if feed.is_empty() {
        println!("No recent activity");
        return;
    }

    for entry in feed {
        println!(
            "  [{:<7}] {:<50} {:>16}  ({})",
            entry.activity_type.as_str(),
            entry.action,
            entry.time_ago,
            entry.module
        );
    }
}

// Error types

#[derive(Debug)]
enum OpsCliError {
    Io(io::Error),
    Dashboard(DashboardError),
    Json(serde_json::Error),
    BadTime(String),
    NoInput,
    DoctorFailed,
}

impl From<io::Error> for OpsCliError {
    fn from(e: io::Error) -> Self {
        OpsCliError::Io(e)
    }
}

impl From<DashboardError> for OpsCliError {
    fn from(e: DashboardError) -> Self {
        OpsCliError::Dashboard(e)
    }
}

impl From<serde_json::Error> for OpsCliError {
    fn from(e: serde_json::Error) -> Self {
        OpsCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<OpsCliError> for CliError {
    fn from(e: OpsCliError) -> Self {
        match e {
            OpsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            OpsCliError::Dashboard(e) => {
                let (code, hint) = match &e {
                    DashboardError::SourceUnavailable => (
                        "SOURCE_UNAVAILABLE",
                        "Every table failed to load; check the dataset",
                    ),
                    DashboardError::ConfigError(_) => {
                        ("CONFIG_ERROR", "Run 'opsboard doctor --config <file>' for details")
                    }
                    DashboardError::IoError(_) => ("IO_ERROR", "Check file paths and permissions"),
                    _ => (
                        "PARSE_ERROR",
                        "Ensure the dataset is a JSON object of table name to row array",
                    ),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            OpsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            OpsCliError::BadTime(msg) => CliError {
                code: "BAD_TIME".to_string(),
                message: msg,
                hint: Some("Use RFC 3339, e.g. 2024-03-01T12:00:00Z".to_string()),
            },
            OpsCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal, no dataset piped in".to_string(),
                hint: Some("Pipe a dataset or pass --input <file>".to_string()),
            },
            OpsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

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
