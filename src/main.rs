//! `dq-sentinel` command-line runner.
//!
//! Loads a YAML run configuration, executes the checks, publishes artifacts,
//! prints a summary, and exits with a status code reflecting the verdict:
//! 0 passed, 1 failed, 2 errored, 3 configuration error. Publish failures are
//! logged but never change the exit code.

use clap::Parser;
use dq_sentinel::config::RunConfig;
use dq_sentinel::engine::{RunStatus, ValidationEngine};
use dq_sentinel::logging::{init_logging, LoggingConfig};
use dq_sentinel::publish::{report, ArtifactPublisher};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, warn};

const EXIT_PASSED: u8 = 0;
const EXIT_FAILED: u8 = 1;
const EXIT_ERRORED: u8 = 2;
const EXIT_CONFIGURATION: u8 = 3;

/// Declarative data-quality validation runner.
#[derive(Debug, Parser)]
#[command(name = "dq-sentinel", version, about)]
struct Cli {
    /// Path to the YAML run configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Override the base_path of every output target
    #[arg(long)]
    output_base: Option<String>,

    /// Abandon the run after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingConfig::default().with_json_format(cli.json_logs);
    if let Err(e) = init_logging(logging) {
        eprintln!("cannot initialize logging: {e}");
        return ExitCode::from(EXIT_CONFIGURATION);
    }

    let mut config = match RunConfig::from_yaml_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(config.path = %cli.config.display(), error = %e, "Invalid configuration");
            eprintln!("{e}");
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };
    if let Some(base) = &cli.output_base {
        for target in &mut config.outputs {
            target.base_path = base.clone();
        }
    }

    let engine = match cli.timeout_secs {
        Some(secs) => ValidationEngine::with_timeout(Duration::from_secs(secs)),
        None => ValidationEngine::new(),
    };
    let result = engine.run(&config).await;

    let receipt = ArtifactPublisher::new().publish(&result, &config.outputs).await;
    for failure in &receipt.failures {
        warn!(
            target.name = %failure.target,
            artifact.path = %failure.path,
            error = %failure.error,
            "Artifact was not published"
        );
    }

    print!("{}", report::render_summary(&result));

    match result.status {
        RunStatus::Passed => ExitCode::from(EXIT_PASSED),
        RunStatus::Failed => ExitCode::from(EXIT_FAILED),
        RunStatus::Errored => ExitCode::from(EXIT_ERRORED),
    }
}
