//! Data source module binary
//!
//! Reads one input record (JSON) from a file or stdin, reconciles the data
//! source and prints the result record as JSON on stdout. Logs go to stderr.
//! Exits with 1 when the result is a failure.

use std::{
    io::{self, Read},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use datasource_reconciler::{
    host, DesiredState, HostInput, HostResult, ResourceReconciler, TransportConfig,
    DEFAULT_STACK_URL_TEMPLATE, DEFAULT_TIMEOUT_SECS,
};

/// Create, update or delete a Grafana Cloud data source
#[derive(Parser)]
#[command(name = "datasource")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input record file, `-` or omitted reads stdin
    input: Option<PathBuf>,

    /// Override the record's desired state (present or absent)
    #[arg(long)]
    state: Option<DesiredState>,

    /// Stack base URL, `{stack_slug}` is replaced with the record's slug
    #[arg(long, env = "DATASOURCE_STACK_URL_TEMPLATE", default_value = DEFAULT_STACK_URL_TEMPLATE)]
    stack_url_template: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "DATASOURCE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let result = match run(&cli).await {
        Ok(result) => result,
        Err(e) => HostResult::failure(format!("{e:#}")),
    };

    match serde_json::to_string(&result) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to encode result: {e}");
            std::process::exit(1);
        }
    }
    std::process::exit(result.exit_code());
}

async fn run(cli: &Cli) -> Result<HostResult> {
    let text = read_input(cli.input.as_ref())?;
    let mut input = HostInput::from_json(&text).context("Invalid input record")?;
    if let Some(state) = cli.state {
        input.state = state;
    }
    debug!(?input, "Parsed input record");

    let config = TransportConfig {
        stack_url_template: cli.stack_url_template.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
        ..Default::default()
    };
    let reconciler = ResourceReconciler::from_config(&config)?;

    Ok(host::run(&reconciler, &input).await)
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read input record from stdin")?;
            Ok(text)
        }
    }
}
