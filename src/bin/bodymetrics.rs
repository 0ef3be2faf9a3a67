//! bodymetrics CLI - Command-line interface for the bodymetrics engine
//!
//! Commands:
//! - compute: Compute metrics reports for a batch of requests
//! - validate: Validate request schema
//! - config: Print the default engine configuration
//! - doctor: Diagnose installation and configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bodymetrics::encoder::REPORT_VERSION;
use bodymetrics::schema::{MetricsRequest, RequestParser, ValidationReport, SCHEMA_VERSION};
use bodymetrics::types::MetricsReport;
use bodymetrics::{EngineConfig, MetricsEngine, ENGINE_VERSION, PRODUCER_NAME};

/// bodymetrics - Body composition and metabolic metrics engine
#[derive(Parser)]
#[command(name = "bodymetrics")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Compute body composition and metabolic metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute metrics reports for a batch of requests
    Compute {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate request schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default engine configuration as JSON
    Config,

    /// Diagnose installation and configuration
    Doctor {
        /// Check an engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one request per line)
    Ndjson,
    /// JSON array of requests
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one report per line)
    Ndjson,
    /// JSON array of reports
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

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

fn run(cli: Cli) -> Result<(), BodymetricsCliError> {
    match cli.command {
        Commands::Compute {
            input,
            output,
            input_format,
            output_format,
            config,
        } => cmd_compute(&input, &output, input_format, output_format, config.as_deref()),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Config => cmd_config(),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_compute(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
) -> Result<(), BodymetricsCliError> {
    let requests = read_requests(input, input_format)?;

    if requests.is_empty() {
        return Err(BodymetricsCliError::NoRequests);
    }

    let engine = match config {
        Some(path) => MetricsEngine::from_config_json(&fs::read_to_string(path)?)?,
        None => MetricsEngine::new(),
    };

    let reports = requests
        .iter()
        .map(|request| engine.process_request(request))
        .collect::<Result<Vec<_>, _>>()?;

    let output_data = format_output(&reports, &output_format)?;

    if is_stdio(output) {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), BodymetricsCliError> {
    let requests = read_requests(input, input_format)?;

    let failures = RequestParser::validate_requests(&requests);
    let report = ValidationReport::new(requests.len(), &failures);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total requests:   {}", report.total_requests);
        println!("Valid requests:   {}", report.valid_requests);
        println!("Invalid requests: {}", report.invalid_requests);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Assessment {} (index {}): {}",
                    err.assessment_id, err.index, err.error
                );
            }
        }
    }

    if report.invalid_requests > 0 {
        Err(BodymetricsCliError::ValidationFailed(report.invalid_requests))
    } else {
        Ok(())
    }
}

fn cmd_config() -> Result<(), BodymetricsCliError> {
    println!("{}", EngineConfig::default().to_json()?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), BodymetricsCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("bodymetrics version {}", ENGINE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}, report: {}", SCHEMA_VERSION, REPORT_VERSION),
    });

    if let Some(config_path) = config {
        checks.push(check_config_file(config_path));
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
            message: "stdin is a pipe (ready for `compute --input -`)".to_string(),
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
        println!("bodymetrics Doctor Report");
        println!("=========================");
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
        Err(BodymetricsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_config_file(path: &Path) -> DoctorCheck {
    let name = "config".to_string();

    if !path.exists() {
        return DoctorCheck {
            name,
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        };
    }

    match fs::read_to_string(path) {
        Ok(content) => match EngineConfig::from_json(&content) {
            Ok(_) => DoctorCheck {
                name,
                status: CheckStatus::Ok,
                message: "Config file valid".to_string(),
            },
            Err(e) => DoctorCheck {
                name,
                status: CheckStatus::Error,
                message: format!("Invalid config: {}", e),
            },
        },
        Err(e) => DoctorCheck {
            name,
            status: CheckStatus::Error,
            message: format!("Cannot read config file: {}", e),
        },
    }
}

// Helper functions

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_requests(
    input: &Path,
    input_format: InputFormat,
) -> Result<Vec<MetricsRequest>, BodymetricsCliError> {
    let input_data = if is_stdio(input) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let requests = match input_format {
        InputFormat::Ndjson => RequestParser::parse_ndjson(&input_data)?,
        InputFormat::Json => RequestParser::parse_array(&input_data)?,
    };
    Ok(requests)
}

fn format_output(
    reports: &[MetricsReport],
    format: &OutputFormat,
) -> Result<String, BodymetricsCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for report in reports {
                lines.push(serde_json::to_string(report)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(reports)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(reports)?),
    }
}

// Error types

#[derive(Debug)]
enum BodymetricsCliError {
    Io(io::Error),
    Compute(bodymetrics::ComputeError),
    Json(serde_json::Error),
    NoRequests,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for BodymetricsCliError {
    fn from(e: io::Error) -> Self {
        BodymetricsCliError::Io(e)
    }
}

impl From<bodymetrics::ComputeError> for BodymetricsCliError {
    fn from(e: bodymetrics::ComputeError) -> Self {
        BodymetricsCliError::Compute(e)
    }
}

impl From<serde_json::Error> for BodymetricsCliError {
    fn from(e: serde_json::Error) -> Self {
        BodymetricsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BodymetricsCliError> for CliError {
    fn from(e: BodymetricsCliError) -> Self {
        match e {
            BodymetricsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BodymetricsCliError::Compute(bodymetrics::ComputeError::InvalidRequest(e)) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'bodymetrics validate' for details".to_string()),
            },
            BodymetricsCliError::Compute(bodymetrics::ComputeError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'bodymetrics config' to see a valid configuration".to_string()),
            },
            BodymetricsCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            BodymetricsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            BodymetricsCliError::NoRequests => CliError {
                code: "NO_REQUESTS".to_string(),
                message: "No requests found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            BodymetricsCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} requests failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            BodymetricsCliError::DoctorFailed => CliError {
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
