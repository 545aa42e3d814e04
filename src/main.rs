mod config;
mod countries;
mod logrotate;
mod prometheus;
mod publish;
mod remnawave;
mod subscription;
mod whitebox;

use anyhow::Result;
use clap::Parser;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

use config::{Config, RawConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Remnawave nodes API URL
    #[arg(long, env = "REMNAWAVE_API_URL")]
    api_url: Option<String>,

    /// Remnawave API token
    #[arg(long, env = "REMNAWAVE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Output file for the node-exporter file_sd targets
    #[arg(long, env = "OUTPUT_FILE")]
    output_file: Option<PathBuf>,

    /// Output file for the whitebox exporter targets
    #[arg(long, env = "WHITEBOX_SD_FILE")]
    whitebox_file: Option<PathBuf>,

    /// Subscription URL with proxy URIs to probe
    #[arg(long, env = "SUBSCRIPTION_URL")]
    subscription_url: Option<String>,

    /// Fallback subscription URL shared with xray-checker
    #[arg(long, env = "XRAY_CHECKER_SUBSCRIPTION_URL")]
    xray_checker_subscription_url: Option<String>,

    /// Log file to rotate before the run
    #[arg(long, env = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, env = "SYNC_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

impl From<Args> for RawConfig {
    fn from(args: Args) -> Self {
        RawConfig {
            api_url: args.api_url,
            api_token: args.api_token,
            output_file: args.output_file,
            whitebox_file: args.whitebox_file,
            subscription_url: args.subscription_url,
            xray_checker_subscription_url: args.xray_checker_subscription_url,
            log_file: args.log_file,
            timeout_secs: args.timeout_secs,
        }
    }
}

/// Counts from one sync run, reported in the log.
#[derive(Debug, PartialEq)]
struct SyncSummary {
    fetched: usize,
    active: usize,
    probes: Option<usize>,
}

impl SyncSummary {
    fn skipped(&self) -> usize {
        self.fetched - self.active
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Generated {} active targets (skipped {} disabled)",
            self.active,
            self.skipped()
        )
    }
}

const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Local wall-clock timestamps.
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format(LOG_TIME_FORMAT))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let base_dir = config::base_dir();

    // Must happen before Args::parse so clap sees the .env values.
    let env_loaded = config::load_env_file(&base_dir.join(".env"));

    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_timer(LocalTime)
        .with_ansi(false)
        .with_target(false)
        .init();

    if let Err(e) = env_loaded {
        warn!("Ignoring .env file: {:#}", e);
    }

    let raw = RawConfig::from(args);

    let log_file = raw.log_file(&base_dir);
    match logrotate::rotate_log(&log_file, logrotate::MAX_LOG_SIZE, logrotate::LOG_KEEP_LINES) {
        Ok(true) => debug!("Rotated log file {}", log_file.display()),
        Ok(false) => {}
        Err(e) => debug!("Log rotation failed for {}: {}", log_file.display(), e),
    }

    sync(raw, &base_dir).await
}

/// Resolve the configuration and run once, mapping any failure to exit status 1.
async fn sync(raw: RawConfig, base_dir: &Path) -> ExitCode {
    let config = match Config::resolve(raw, base_dir) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&config).await {
        Ok(summary) => {
            match summary.probes {
                Some(probes) => info!(
                    "Sync complete: {} node targets, {} probe targets",
                    summary.active, probes
                ),
                None => info!(
                    "Sync complete: {} node targets, subscription disabled",
                    summary.active
                ),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> Result<SyncSummary> {
    let client = remnawave::build_http_client(config.timeout)?;

    // Fetch nodes from Remnawave
    let nodes = remnawave::fetch_nodes(&client, &config.api_url, &config.api_token).await?;
    info!("Fetched {} nodes from API", nodes.len());

    let targets = prometheus::build_targets(&nodes)?;
    let mut summary = SyncSummary {
        fetched: nodes.len(),
        active: targets.len(),
        probes: None,
    };
    info!("{}", summary);

    publish::write_atomic(&config.output_file, &prometheus::render_file_sd(&targets)?)?;
    info!("OK: Wrote {}", config.output_file.display());

    // Whitebox probe targets from the subscription, if configured
    if let Some(url) = &config.subscription_url {
        let uris = subscription::fetch_subscription(&client, url).await;
        info!("Subscription: received {} proxy URIs", uris.len());

        if !uris.is_empty() {
            publish::write_atomic(&config.whitebox_file, &whitebox::generate_config(&uris))?;
            info!(
                "OK: Wrote {} ({} targets)",
                config.whitebox_file.display(),
                uris.len()
            );
        }
        summary.probes = Some(uris.len());
    }

    Ok(summary)
}
