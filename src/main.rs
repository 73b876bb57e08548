//! CLI entry point for the nextbus tool.
//!
//! `update` refreshes the cached stop times at most once per day; `next`
//! prints the upcoming arrivals at the configured stop.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use nextbus::config::FeedConfig;
use nextbus::departures::{load_rows, minutes_until, next_departures};
use nextbus::fetch::auth::BasicAuth;
use nextbus::fetch::{BasicClient, HttpClient};
use nextbus::pipeline::{Pipeline, RunOutcome};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "nextbus")]
#[command(about = "Daily cached GTFS stop times and upcoming bus arrivals", long_about = None)]
struct Cli {
    /// JSON config file (built-in feed settings when omitted)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and filter the feed unless the output was written today
    Update,
    /// Print the next arrivals for each configured line
    Next {
        /// Stop to query (defaults to the configured departure stop)
        #[arg(short, long)]
        stop: Option<String>,

        /// Maximum number of arrivals per line
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Use the cached file as is, without trying to refresh it
        #[arg(long, default_value_t = false)]
        no_refresh: bool,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("Run aborted: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Colored stderr + JSON rolling log file.
fn init_logging() -> WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/nextbus.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("nextbus.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("RUST_LOG")
                .from_env_lossy(),
        );

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::DEBUG.into())
                .with_env_var("RUST_LOG_JSON")
                .from_env_lossy(),
        );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => FeedConfig::load(path)?,
        None => FeedConfig::default(),
    }
    .with_env_credentials(|key| std::env::var(key).ok());

    let client = build_client(&config)?;
    let pipeline = Pipeline::new(config, client);

    match cli.command.unwrap_or(Commands::Update) {
        Commands::Update => Ok(update(&pipeline)),
        Commands::Next {
            stop,
            limit,
            no_refresh,
        } => {
            if !no_refresh {
                // A failed refresh falls back to whatever is already cached.
                if let Err(e) = pipeline.run() {
                    warn!(error = %e, "Refresh failed, using the existing file");
                }
            }
            Ok(print_next(pipeline.config(), stop, limit))
        }
    }
}

fn build_client(config: &FeedConfig) -> Result<Box<dyn HttpClient>> {
    let basic = BasicClient::new().context("failed to build HTTP client")?;
    let client: Box<dyn HttpClient> = match &config.credentials {
        Some(creds) => Box::new(BasicAuth::new(basic, &creds.username, &creds.password)),
        None => {
            warn!("No feed credentials configured, sending an unauthenticated request");
            Box::new(basic)
        }
    };
    Ok(client)
}

#[tracing::instrument(skip_all)]
fn update<C: HttpClient>(pipeline: &Pipeline<C>) -> ExitCode {
    let path = pipeline.config().output_path();
    match pipeline.run() {
        Ok(RunOutcome::Fresh) => {
            info!(path = %path.display(), "No update needed, the file is already up to date");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Updated { rows }) => {
            info!(path = %path.display(), rows, "Stop times updated");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "The file was not updated");
            ExitCode::from(e.exit_code())
        }
    }
}

fn print_next(config: &FeedConfig, stop: Option<String>, limit: Option<usize>) -> ExitCode {
    let path = config.output_path();
    let rows = match load_rows(&path, config.format) {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, "No schedule available");
            return ExitCode::from(e.exit_code());
        }
    };

    let stop_id = stop.unwrap_or_else(|| config.departures.stop_id.clone());
    let limit = limit.unwrap_or(config.departures.limit);
    let now = Local::now().time();

    let mut any = false;
    for line in &config.departures.lines {
        let times = next_departures(&rows, &stop_id, &line.prefixes, now, limit);
        any |= !times.is_empty();

        println!("{} [{}]", line.name, line.tag);
        for time in &times {
            println!("  - {} ({} min)", time.format("%H:%M:%S"), minutes_until(now, *time));
        }
    }

    if !any {
        println!("No upcoming arrivals at stop {stop_id} for these lines today.");
    }
    ExitCode::SUCCESS
}
