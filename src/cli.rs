//! Command line front end: argument parsing, logger setup and output.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::fmt::Formatter;
use env_logger::{Logger, Target, WriteStyle};
use log::{LevelFilter, Log, Metadata, Record};

use crate::config::load_config;
use crate::error::{FleetError, Result};
use crate::instance::{InstanceStatus, Operation, OperationOutcome, OperationReport, Registry};
use crate::paths::{default_config_path, ensure_parent_dir};

/// Tools to manage PostgreSQL servers.
#[derive(Debug, Parser)]
#[command(name = "pgfleet", version, about)]
pub struct Cli {
    /// Show debug logging on console
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-error logging on console
    #[arg(short, long)]
    pub quiet: bool,

    /// Instance map (defaults to ~/.pgfleet/instances.toml)
    #[arg(short, long, env = "PGFLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write debug-level log records to this file
    #[arg(long, env = "PGFLEET_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Print status as JSON
    #[arg(long)]
    pub json: bool,

    /// One of start, stop, restart, reload, promote, status
    #[arg(value_parser = parse_operation)]
    pub operation: Operation,

    /// Instance names, or `all`
    pub instances: Vec<String>,
}

fn parse_operation(value: &str) -> std::result::Result<Operation, String> {
    value.parse().map_err(|e: FleetError| e.to_string())
}

impl Cli {
    fn console_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Error
        } else {
            LevelFilter::Info
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("failed to set up logging: {e}");
        return ExitCode::FAILURE;
    }

    match execute(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(2)
        }
    }
}

fn format_record(buf: &mut Formatter, record: &Record<'_>) -> std::io::Result<()> {
    writeln!(
        buf,
        "{} [{:5}] ({}) {} - {}",
        buf.timestamp(),
        std::process::id(),
        record.target(),
        record.level(),
        record.args()
    )
}

/// Console logger at the requested verbosity plus an optional debug file log.
struct FleetLogger {
    console: Logger,
    file: Option<Logger>,
}

impl FleetLogger {
    fn max_level(&self) -> LevelFilter {
        let file = self.file.as_ref().map_or(LevelFilter::Off, Logger::filter);
        self.console.filter().max(file)
    }
}

impl Log for FleetLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.console.enabled(metadata)
            || self
                .file
                .as_ref()
                .is_some_and(|file| file.enabled(metadata))
    }

    fn log(&self, record: &Record<'_>) {
        self.console.log(record);
        if let Some(file) = &self.file {
            file.log(record);
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Some(file) = &self.file {
            file.flush();
        }
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let console = env_logger::Builder::new()
        .filter_level(cli.console_level())
        .parse_default_env()
        .format(format_record)
        .build();

    let file = match &cli.log_file {
        Some(path) => {
            ensure_parent_dir(path)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    FleetError::io(format!("Failed to open {}: {}", path.display(), e))
                })?;
            Some(
                env_logger::Builder::new()
                    .filter_level(LevelFilter::Debug)
                    .format(format_record)
                    .write_style(WriteStyle::Never)
                    .target(Target::Pipe(Box::new(file)))
                    .build(),
            )
        }
        None => None,
    };

    let logger = FleetLogger { console, file };
    let max_level = logger.max_level();
    log::set_boxed_logger(Box::new(logger)).map_err(|e| FleetError::io(e.to_string()))?;
    log::set_max_level(max_level);
    Ok(())
}

/// Run the requested operation. `Ok(false)` means at least one instance failed.
fn execute(cli: &Cli) -> Result<bool> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = load_config(&path)?;
    let registry = Registry::from_config(&config)?;

    log::debug!(
        "received task \"{}\" for instances {:?}",
        cli.operation,
        cli.instances
    );

    if cli.operation == Operation::Status {
        return show_status(&registry, &cli.instances, cli.json);
    }

    if cli.instances.is_empty() {
        log::error!("provide instance(s)");
        return Ok(false);
    }

    let reports = registry.apply(cli.operation, &cli.instances)?;
    for report in &reports {
        println!("{}", describe(report));
    }
    Ok(reports.iter().all(OperationReport::succeeded))
}

fn show_status(registry: &Registry, requested: &[String], json: bool) -> Result<bool> {
    let selection = if requested.is_empty() {
        registry.names()
    } else {
        registry.resolve_selection(requested)?
    };
    let reports = registry.apply(Operation::Status, &selection)?;

    if json {
        let rows: Vec<serde_json::Value> = reports
            .iter()
            .map(|report| match &report.result {
                Ok(outcome) => serde_json::to_value(outcome),
                Err(e) => Ok(serde_json::json!({ "name": report.instance, "error": e })),
            })
            .collect::<std::result::Result<_, _>>()?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", status_table(&reports));
    }

    Ok(reports.iter().all(|r| r.result.is_ok()))
}

const TABLE_WIDTH: usize = 44;

/// Render status reports as the fixed-width status table.
pub fn status_table(reports: &[OperationReport]) -> String {
    let mut out = format!(
        "{:<10}  {:>5}  {:<5}  {:>7}  {:>7}\n{}\n",
        "instance",
        "port",
        "state",
        "PID",
        "threads",
        "-".repeat(TABLE_WIDTH)
    );

    for report in reports {
        let line = match &report.result {
            Ok(OperationOutcome::Status(status)) => status_row(status),
            Ok(_) => continue,
            Err(e) => format!("{:<10}  {:>5}  {:<5}  {}", report.instance, "", "?", e),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn status_row(status: &InstanceStatus) -> String {
    let port = status.port.map(|p| p.to_string()).unwrap_or_default();
    let state = if status.running { "up" } else { "down" };
    let pid = status.pid.map(|p| p.to_string()).unwrap_or_default();
    let threads = status.threads().map(|t| t.to_string()).unwrap_or_default();
    format!(
        "{:<10}  {:>5}  {:<5}  {:>7}  {:>7}",
        status.name, port, state, pid, threads
    )
}

fn describe(report: &OperationReport) -> String {
    match &report.result {
        Ok(OperationOutcome::Running { running: true }) => {
            format!("{}: {} ok, running", report.instance, report.operation)
        }
        Ok(OperationOutcome::Running { running: false }) => {
            format!("{}: {} failed, not running", report.instance, report.operation)
        }
        Ok(OperationOutcome::Stopped) => format!("{}: stopped", report.instance),
        Ok(OperationOutcome::Issued) => {
            format!("{}: {} issued", report.instance, report.operation)
        }
        Ok(OperationOutcome::Status(status)) => status_row(status),
        Err(e) => format!("{}: {} failed: {}", report.instance, report.operation, e),
    }
}
