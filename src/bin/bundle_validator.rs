//! # Bundle validator
//!
//! Serves the validation endpoint over HTTP or validates a single Bundle file.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fhir_bundle_validator::{
    BundleValidator, ConfigArgs, Document, OutcomeReport, Result, ValidatorConfig, ValidatorError,
    ensure_minimal_narrative,
    server::{Server, ServerError},
};

#[derive(Parser)]
#[command(name = "bundle-validator")]
#[command(about = "Validate FHIR Bundles for required resources and SNOMED CT codes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP validation server
    Serve {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Validate a Bundle file and print the outcome
    Validate {
        /// Path to the Bundle JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let outcome = match cli.command {
        Commands::Serve { config } => serve(&config).await.map(|()| true),
        Commands::Validate {
            file,
            format,
            config,
        } => validate_file(&file, format, &config).await,
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(args: &ConfigArgs) -> Result<()> {
    let config = ValidatorConfig::load(args)?;
    info!(
        terminology = %config.terminology.base_url,
        mode = %config.terminology.mode,
        "Starting bundle validator"
    );

    Server::new(&config)
        .map_err(server_error)?
        .start()
        .await
        .map_err(server_error)
}

/// Returns whether the Bundle passed without errors.
async fn validate_file(path: &Path, format: OutputFormat, args: &ConfigArgs) -> Result<bool> {
    let config = ValidatorConfig::load(args)?;
    let content = tokio::fs::read_to_string(path).await?;

    let mut value: serde_json::Value = serde_json::from_str(&content)?;
    ensure_minimal_narrative(&mut value);
    let document = Document::from_value(value)?;

    let report = BundleValidator::from_config(&config)?
        .validate(&document)
        .await;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report.to_operation_outcome())?
            );
        }
        OutputFormat::Text => print_report(path, &report),
    }

    Ok(report.is_valid)
}

fn print_report(path: &Path, report: &OutcomeReport) {
    if report.is_empty() {
        println!("{}: no issues detected", path.display());
        return;
    }

    println!(
        "{}: {} error(s), {} warning(s)",
        path.display(),
        report.error_count,
        report.warning_count
    );
    for issue in &report.issues {
        println!("  {issue}");
        if let Some(expression) = &issue.expression {
            println!("    at: {expression}");
        }
    }
}

fn server_error(e: ServerError) -> ValidatorError {
    match e {
        ServerError::Validator(inner) => inner,
        other => ValidatorError::server(other.to_string()),
    }
}
