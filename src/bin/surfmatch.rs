//! Surf Match CLI - Command-line interface for the Surf Match engine
//!
//! Commands:
//! - snapshot: Build a conditions snapshot from hourly series
//! - lag: Swell travel time for a period and distance
//! - train: Fit models from a session log and print feature weights
//! - match: Best forecast match per day for a session log
//! - best-window: Log-free best hour in the coming week
//! - export-csv: Export a session log as CSV
//! - doctor: Diagnose configuration and input files

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use surf_match::export::to_csv_string;
use surf_match::lag::swell_arrival;
use surf_match::rating::{best_window, conditions_summary, RatingLabel};
use surf_match::trainer::{ModelKind, Trainer};
use surf_match::types::{HourlySeries, SessionLogEntry};
use surf_match::{
    ComputeError, EngineConfig, SnapshotBuilder, SurfLogProcessor, PRODUCER_NAME,
    SURF_MATCH_VERSION,
};

/// Surf Match - personalized surf forecast matching
#[derive(Parser)]
#[command(name = "surfmatch")]
#[command(version = SURF_MATCH_VERSION)]
#[command(about = "Match forecast hours against your best logged sessions", long_about = None)]
struct Cli {
    /// Engine configuration file (JSON); defaults apply when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a conditions snapshot from hourly series
    Snapshot {
        /// Hourly series file path (use - for stdin)
        #[arg(short, long)]
        series: PathBuf,

        /// Session time for a historical snapshot (e.g. 2024-10-05T07:30:00)
        #[arg(long, conflicts_with = "hour")]
        at: Option<NaiveDateTime>,

        /// Forecast hour index for a forecast snapshot
        #[arg(long)]
        hour: Option<usize>,
    },

    /// Swell travel time for a period and distance
    Lag {
        /// Swell period in seconds
        #[arg(long)]
        period: f64,

        /// Sensor-to-break distance in miles (defaults to the configured distance)
        #[arg(long)]
        distance: Option<f64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fit models from a session log and print feature weights
    Train {
        /// Session log file path (use - for stdin)
        #[arg(short, long)]
        log: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Best forecast match per day for a session log
    Match {
        /// Session log file path
        #[arg(short, long)]
        log: PathBuf,

        /// Forecast hourly series file path (use - for stdin)
        #[arg(short, long)]
        forecast: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Log-free best hour in the coming week
    BestWindow {
        /// Forecast hourly series file path (use - for stdin)
        #[arg(short, long)]
        forecast: PathBuf,

        /// Reference time; hours before it are skipped (defaults to local now)
        #[arg(long)]
        now: Option<NaiveDateTime>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export a session log as CSV
    ExportCsv {
        /// Session log file path (use - for stdin)
        #[arg(short, long)]
        log: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Diagnose configuration and input files
    Doctor {
        /// Check a session log file
        #[arg(long)]
        log: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one day match per line)
    Ndjson,
    /// Compact JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
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

fn run(cli: Cli) -> Result<(), SurfCliError> {
    match cli.command {
        Commands::Doctor { log, json } => cmd_doctor(cli.config.as_deref(), log.as_deref(), json),
        command => {
            let config = load_config(cli.config.as_deref())?;
            match command {
                Commands::Snapshot { series, at, hour } => cmd_snapshot(&config, &series, at, hour),
                Commands::Lag {
                    period,
                    distance,
                    json,
                } => cmd_lag(&config, period, distance, json),
                Commands::Train { log, json } => cmd_train(&config, &log, json),
                Commands::Match {
                    log,
                    forecast,
                    output,
                    output_format,
                } => cmd_match(config, &log, &forecast, &output, output_format),
                Commands::BestWindow {
                    forecast,
                    now,
                    json,
                } => cmd_best_window(&config, &forecast, now, json),
                Commands::ExportCsv { log, output } => cmd_export_csv(&log, &output),
                Commands::Doctor { .. } => Ok(()),
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, SurfCliError> {
    match path {
        Some(p) => Ok(EngineConfig::load_from_path(p)?),
        None => Ok(EngineConfig::default()),
    }
}

fn read_input(path: &Path) -> Result<String, SurfCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: &Path, data: &str) -> Result<(), SurfCliError> {
    if path.to_string_lossy() == "-" {
        print!("{data}");
    } else {
        fs::write(path, data)?;
    }
    Ok(())
}

fn read_log(path: &Path) -> Result<Vec<SessionLogEntry>, SurfCliError> {
    Ok(serde_json::from_str(&read_input(path)?)?)
}

fn read_series(path: &Path) -> Result<HourlySeries, SurfCliError> {
    Ok(serde_json::from_str(&read_input(path)?)?)
}

fn cmd_snapshot(
    config: &EngineConfig,
    series_path: &Path,
    at: Option<NaiveDateTime>,
    hour: Option<usize>,
) -> Result<(), SurfCliError> {
    let series = read_series(series_path)?;
    let builder = SnapshotBuilder::new(&config.break_config);

    let conditions = match (at, hour) {
        (Some(t), _) => builder.historical(&series, t)?,
        (None, Some(h)) => builder.forecast_hour(&series, h)?,
        (None, None) => return Err(SurfCliError::MissingTarget),
    };

    println!("{}", serde_json::to_string_pretty(&conditions)?);
    Ok(())
}

fn cmd_lag(
    config: &EngineConfig,
    period: f64,
    distance: Option<f64>,
    json: bool,
) -> Result<(), SurfCliError> {
    let miles = distance.unwrap_or(config.break_config.sensor_distance_miles);
    let arrival = swell_arrival(period, miles).ok_or(SurfCliError::InvalidPeriod(period))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&arrival)?);
    } else {
        println!(
            "{period:.1} s swell over {miles:.1} mi: {} ({:.2} m/s)",
            arrival.label(),
            arrival.velocity_ms
        );
    }
    Ok(())
}

fn cmd_train(config: &EngineConfig, log_path: &Path, json: bool) -> Result<(), SurfCliError> {
    let entries = read_log(log_path)?;
    let mut processor = SurfLogProcessor::with_config(config.clone())?;
    let imported = processor.import_entries(entries);

    let wave = processor.weight_shares(ModelKind::Wave);
    let wind = processor.weight_shares(ModelKind::Wind);

    if json {
        let value = serde_json::json!({
            "entries": imported,
            "revision": processor.revision(),
            "wave": wave,
            "wind": wind,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let trainer = Trainer::new(config);
    let (wave_rows, _) = trainer.wave_samples(processor.entries());
    let (wind_rows, _) = trainer.wind_samples(processor.entries());

    println!("Surf Match Model Report");
    println!("=======================");
    println!("Break:   {}", config.break_config.name);
    println!("Entries: {imported}");
    for (label, shares, usable) in [
        ("Wave", wave, wave_rows.len()),
        ("Wind", wind, wind_rows.len()),
    ] {
        println!("\n{label} model ({usable} usable entries):");
        match shares {
            Some(shares) => {
                for s in shares {
                    println!("  {:<24} {:>6.1}%  (w = {:+.3})", s.name, s.share * 100.0, s.weight);
                }
            }
            None if usable < config.model.min_samples => println!(
                "  untrained: need {} entries with conditions",
                config.model.min_samples
            ),
            None => println!("  not enough variance in the logged conditions"),
        }
    }
    Ok(())
}

fn cmd_match(
    config: EngineConfig,
    log_path: &Path,
    forecast_path: &Path,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), SurfCliError> {
    let entries = read_log(log_path)?;
    let forecast = read_series(forecast_path)?;

    let mut processor = SurfLogProcessor::with_config(config)?;
    processor.import_entries(entries);

    let data = match output_format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for m in processor.best_matches(&forecast)? {
                lines.push(serde_json::to_string(&m)?);
            }
            lines.join("\n") + "\n"
        }
        OutputFormat::Json => {
            let report: serde_json::Value = serde_json::from_str(&processor.report_json(&forecast)?)?;
            serde_json::to_string(&report)?
        }
        OutputFormat::JsonPretty => processor.report_json(&forecast)?,
    };

    write_output(output, &data)
}

fn cmd_best_window(
    config: &EngineConfig,
    forecast_path: &Path,
    now: Option<NaiveDateTime>,
    json: bool,
) -> Result<(), SurfCliError> {
    let forecast = read_series(forecast_path)?;
    forecast.validate()?;
    let now = now.unwrap_or_else(|| chrono::Local::now().naive_local());

    let best = best_window(&forecast, now, &config.break_config).ok_or(SurfCliError::NoWindow)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&best)?);
    } else {
        let rating = best.score.floor().clamp(1.0, 5.0) as u8;
        let i = best.hour_index;
        println!(
            "Best: {} ({:.1} ft) - {}",
            best.time.format("%a %-I%P"),
            best.wave_height_ft,
            RatingLabel::for_score(rating).as_str()
        );
        println!(
            "{}",
            conditions_summary(
                Some(best.wave_height_ft),
                forecast.swell_period_at(i),
                forecast.wind_speed_at(i),
                forecast.swell_direction_at(i),
                &config.break_config,
            )
        );
    }
    Ok(())
}

fn cmd_export_csv(log_path: &Path, output: &Path) -> Result<(), SurfCliError> {
    let entries = read_log(log_path)?;
    write_output(output, &to_csv_string(&entries)?)
}

fn cmd_doctor(
    config_path: Option<&Path>,
    log_path: Option<&Path>,
    json: bool,
) -> Result<(), SurfCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Surf Match version {SURF_MATCH_VERSION}"),
    });

    let config = match config_path {
        Some(path) if !path.exists() => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist, using defaults".to_string(),
            });
            EngineConfig::default()
        }
        Some(path) => match EngineConfig::load_from_path(path) {
            Ok(config) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Config valid for {}", config.break_config.name),
                });
                config
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid config: {e}"),
                });
                EngineConfig::default()
            }
        },
        None => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!("Using defaults for {}", EngineConfig::default().break_config.name),
            });
            EngineConfig::default()
        }
    };

    if let Some(path) = log_path {
        let check = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Vec<SessionLogEntry>>(&content) {
                Ok(entries) => {
                    let usable = entries.iter().filter(|e| e.conditions.is_some()).count();
                    let status = if usable >= config.model.min_samples {
                        CheckStatus::Ok
                    } else {
                        CheckStatus::Warning
                    };
                    DoctorCheck {
                        name: "log".to_string(),
                        status,
                        message: format!(
                            "{} entries, {usable} with conditions (models need {})",
                            entries.len(),
                            config.model.min_samples
                        ),
                    }
                }
                Err(e) => DoctorCheck {
                    name: "log".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid log JSON: {e}"),
                },
            },
            Err(e) => DoctorCheck {
                name: "log".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read log file: {e}"),
            },
        };
        checks.push(check);
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (use - to read input from it)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: SURF_MATCH_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Surf Match Doctor Report");
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
        Err(SurfCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum SurfCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    MissingTarget,
    InvalidPeriod(f64),
    NoWindow,
    DoctorFailed,
}

impl From<io::Error> for SurfCliError {
    fn from(e: io::Error) -> Self {
        SurfCliError::Io(e)
    }
}

impl From<ComputeError> for SurfCliError {
    fn from(e: ComputeError) -> Self {
        SurfCliError::Compute(e)
    }
}

impl From<serde_json::Error> for SurfCliError {
    fn from(e: serde_json::Error) -> Self {
        SurfCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SurfCliError> for CliError {
    fn from(e: SurfCliError) -> Self {
        match e {
            SurfCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SurfCliError::Compute(ComputeError::NoSwellData(at)) => CliError {
                code: "NO_SWELL_DATA".to_string(),
                message: format!("No swell data available at {at}"),
                hint: Some("Check that the series covers the requested time".to_string()),
            },
            SurfCliError::Compute(e @ ComputeError::InvalidConfig(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'surfmatch doctor --config <path>' for details".to_string()),
            },
            SurfCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure inputs match the session log and hourly series formats".to_string()),
            },
            SurfCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SurfCliError::MissingTarget => CliError {
                code: "MISSING_TARGET".to_string(),
                message: "No snapshot time given".to_string(),
                hint: Some("Pass --at <datetime> or --hour <index>".to_string()),
            },
            SurfCliError::InvalidPeriod(p) => CliError {
                code: "INVALID_PERIOD".to_string(),
                message: format!("Swell period {p} s is not positive"),
                hint: None,
            },
            SurfCliError::NoWindow => CliError {
                code: "NO_WINDOW".to_string(),
                message: "No surfable daylight hour in the forecast".to_string(),
                hint: Some("Check that the forecast covers upcoming hours".to_string()),
            },
            SurfCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

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
