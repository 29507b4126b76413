//! vitaltrend CLI - Command-line interface for the vitaltrend engine
//!
//! Commands:
//! - analyze: Full metric report (daily series, statistics, trend line, forecast)
//! - forecast: Damped-trend projection only
//! - validate: Validate sample schema
//! - zone: Classify a single value
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use vitaltrend::config::MAX_FORECAST_DAYS;
use vitaltrend::schema::{SampleReader, ValidationResult, SCHEMA_VERSION};
use vitaltrend::types::{MetricField, TimeSlot};
use vitaltrend::zones::ZoneReading;
use vitaltrend::{
    ComputeError, EngineConfig, Sample, TrendEngine, PRODUCER_NAME, VITALTREND_VERSION,
};

/// vitaltrend - Trend analytics and forecasting for body measurements
#[derive(Parser)]
#[command(name = "vitaltrend")]
#[command(version = VITALTREND_VERSION)]
#[command(about = "Analyze and forecast body measurement series", long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG applies when unset
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log output format
    #[arg(long, global = true, default_value = "compact")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one metric and print the report
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Metric to analyze (e.g. weight, body_fat, heart_rate)
        #[arg(short, long, default_value = "weight")]
        metric: String,

        /// Time-of-day slot
        #[arg(long, default_value = "all")]
        slot: SlotArg,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Forecast one metric
    Forecast {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Metric to forecast
        #[arg(short, long, default_value = "weight")]
        metric: String,

        /// Time-of-day slot
        #[arg(long, default_value = "all")]
        slot: SlotArg,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Days to project (overrides the configured horizon)
        #[arg(long)]
        days: Option<usize>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Validate sample schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a single value into its health zone
    Zone {
        /// Metric of the value (visceral_fat, heart_rate, bmi)
        #[arg(short, long)]
        metric: String,

        /// Value to classify
        #[arg(short, long, allow_negative_numbers = true)]
        value: f64,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check an engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SlotArg {
    /// Samples before the evening cutoff (or with unreadable time)
    Morning,
    /// Samples at or after the evening cutoff
    Evening,
    /// Every sample
    All,
}

impl From<SlotArg> for TimeSlot {
    fn from(slot: SlotArg) -> Self {
        match slot {
            SlotArg::Morning => TimeSlot::Morning,
            SlotArg::Evening => TimeSlot::Evening,
            SlotArg::All => TimeSlot::All,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Clone, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
    Compact,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level, &cli.log_format);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Install the stderr subscriber; an explicit level beats RUST_LOG
fn init_logging(level: Option<LogLevel>, format: &LogFormat) {
    let filter = match level {
        Some(level) => EnvFilter::new(format!("vitaltrend={}", level.as_filter())),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("vitaltrend=warn")),
    };

    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_target(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_target(true)
            .boxed(),
    };

    // A second init (tests, embedding) is not fatal
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}

fn run(command: Commands) -> Result<(), VtCliError> {
    match command {
        Commands::Analyze {
            input,
            metric,
            slot,
            config,
            output,
            output_format,
        } => cmd_analyze(
            &input,
            &metric,
            slot.into(),
            config.as_deref(),
            &output,
            &output_format,
        ),

        Commands::Forecast {
            input,
            metric,
            slot,
            config,
            days,
            output,
            output_format,
        } => cmd_forecast(
            &input,
            &metric,
            slot.into(),
            config.as_deref(),
            days,
            &output,
            &output_format,
        ),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Zone { metric, value } => cmd_zone(&metric, value),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_analyze(
    input: &Path,
    metric: &str,
    slot: TimeSlot,
    config: Option<&Path>,
    output: &Path,
    output_format: &OutputFormat,
) -> Result<(), VtCliError> {
    let metric: MetricField = metric.parse()?;
    let engine = load_engine(config)?;
    let samples = read_samples(input)?;

    info!(samples = samples.len(), metric = metric.as_str(), "analyzing");
    let report = engine.report(&samples, metric, slot);

    write_output(output, &to_json(&report, output_format)?)
}

fn cmd_forecast(
    input: &Path,
    metric: &str,
    slot: TimeSlot,
    config: Option<&Path>,
    days: Option<usize>,
    output: &Path,
    output_format: &OutputFormat,
) -> Result<(), VtCliError> {
    let metric: MetricField = metric.parse()?;
    let engine = load_engine(config)?;
    let samples = read_samples(input)?;

    let days = days.unwrap_or(engine.config().forecast_days);
    if days > MAX_FORECAST_DAYS {
        return Err(ComputeError::InvalidConfig(format!(
            "--days must be at most {MAX_FORECAST_DAYS}"
        ))
        .into());
    }
    info!(samples = samples.len(), metric = metric.as_str(), days, "forecasting");
    let forecast = engine.forecast_days(&samples, metric, slot, days);

    write_output(output, &to_json(&forecast, output_format)?)
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), VtCliError> {
    let samples = read_samples(input)?;
    let report = validation_report(&samples);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report ({})", report.schema_version);
        println!("=================");
        println!("Total samples:   {}", report.total_samples);
        println!("Valid samples:   {}", report.valid_samples);
        println!("Invalid samples: {}", report.invalid_samples);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Sample {} ({}): {}", err.index, err.date, err.message);
            }
        }

        if !report.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &report.warnings {
                println!(
                    "  - Sample {} ({}): {}",
                    warning.index, warning.date, warning.message
                );
            }
        }
    }

    if report.invalid_samples > 0 {
        Err(VtCliError::ValidationFailed(report.invalid_samples))
    } else {
        Ok(())
    }
}

/// Split every issue into errors and warnings; only errors make a sample invalid
fn validation_report(samples: &[Sample]) -> ValidationReport {
    let results = SampleReader::validate_samples(samples);

    let detail = |r: &ValidationResult| ValidationIssueDetail {
        index: r.index,
        date: samples[r.index].date.to_string(),
        message: r.issue.to_string(),
    };
    let (errors, warnings): (Vec<&ValidationResult>, Vec<&ValidationResult>) =
        results.iter().partition(|r| r.is_error());

    let invalid: BTreeSet<usize> = errors.iter().map(|r| r.index).collect();

    ValidationReport {
        schema_version: SCHEMA_VERSION.to_string(),
        total_samples: samples.len(),
        valid_samples: samples.len() - invalid.len(),
        invalid_samples: invalid.len(),
        errors: errors.into_iter().map(detail).collect(),
        warnings: warnings.into_iter().map(detail).collect(),
    }
}

fn cmd_zone(metric: &str, value: f64) -> Result<(), VtCliError> {
    let metric: MetricField = metric.parse()?;
    let zone = ZoneReading::classify(metric, value).ok_or(VtCliError::NoZones(metric))?;

    println!("{}", serde_json::to_string(&zone)?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), VtCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "vitaltrend_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("vitaltrend version {}", VITALTREND_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match EngineConfig::from_json(&content) {
                    Ok(config) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (window {}, horizon {} days, phi {})",
                            config.moving_average_window, config.forecast_days, config.phi
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid config: {}", e),
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

    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (pass --input with a file path)"
    } else {
        "stdin is a pipe (--input - ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VITALTREND_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("vitaltrend Doctor Report");
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(VtCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, VtCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_samples(input: &Path) -> Result<Vec<Sample>, VtCliError> {
    let samples = SampleReader::parse(&read_input(input)?)?;
    if samples.is_empty() {
        return Err(VtCliError::NoSamples);
    }
    debug!(count = samples.len(), "samples read");
    Ok(samples)
}

fn load_engine(config: Option<&Path>) -> Result<TrendEngine, VtCliError> {
    match config {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            Ok(TrendEngine::from_config_json(Some(&json))?)
        }
        None => Ok(TrendEngine::new()),
    }
}

fn to_json<T: serde::Serialize>(value: &T, format: &OutputFormat) -> Result<String, VtCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), VtCliError> {
    if output.to_string_lossy() == "-" {
        println!("{}", data);
    } else {
        fs::write(output, format!("{}\n", data))?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum VtCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoSamples,
    NoZones(MetricField),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for VtCliError {
    fn from(e: io::Error) -> Self {
        VtCliError::Io(e)
    }
}

impl From<ComputeError> for VtCliError {
    fn from(e: ComputeError) -> Self {
        VtCliError::Compute(e)
    }
}

impl From<serde_json::Error> for VtCliError {
    fn from(e: serde_json::Error) -> Self {
        VtCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<VtCliError> for CliError {
    fn from(e: VtCliError) -> Self {
        match e {
            VtCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            VtCliError::Compute(e @ ComputeError::InvalidConfig(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'vitaltrend doctor --config <file>' for details".to_string()),
            },
            VtCliError::Compute(e @ ComputeError::UnknownMetric(_)) => CliError {
                code: "UNKNOWN_METRIC".to_string(),
                message: e.to_string(),
                hint: Some(format!(
                    "Known metrics: {}",
                    MetricField::ALL
                        .iter()
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
            },
            VtCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches {} schema", SCHEMA_VERSION)),
            },
            VtCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            VtCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No samples found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            VtCliError::NoZones(metric) => CliError {
                code: "NO_ZONES".to_string(),
                message: format!("Metric '{}' has no health zones", metric),
                hint: Some("Zones exist for visceral_fat, heart_rate and bmi".to_string()),
            },
            VtCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} samples failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            VtCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    schema_version: String,
    total_samples: usize,
    valid_samples: usize,
    invalid_samples: usize,
    errors: Vec<ValidationIssueDetail>,
    warnings: Vec<ValidationIssueDetail>,
}

#[derive(serde::Serialize)]
struct ValidationIssueDetail {
    index: usize,
    date: String,
    message: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
