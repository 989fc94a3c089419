//! # sitefeed
//!
//! Command-line front end for the feed service.
//!
//! ## Usage
//!
//! ```sh
//! sitefeed refresh                 # rebuild every configured feed
//! sitefeed feed --url <source>     # print one feed (rss by default)
//! sitefeed status                  # cache state as JSON
//! sitefeed sources                 # configured sources
//! ```
//!
//! Configuration is read from `--config`, else `./config.yaml` when present,
//! else built-in defaults.

use clap::Parser;
use sitefeed::config::AppConfig;
use sitefeed::renderer::HttpRenderer;
use sitefeed::service::{FeedService, parse_format};
use sitefeed::utils::{ensure_writable_dir, truncate_for_log};
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::{Cli, Command};

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE).to_path_buf());
    let mut config = AppConfig::load(&config_path)?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    info!(
        config = %config_path.display(),
        data_dir = %config.data_dir.display(),
        sources = config.sources.len(),
        "Loaded configuration"
    );

    if let Err(e) = ensure_writable_dir(&config.data_dir).await {
        error!(
            path = %config.data_dir.display(),
            error = %e,
            "Data directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let renderer = HttpRenderer::new(config.render.user_agent.clone());
    let service = FeedService::new(&config, renderer)?;
    let sweeper = service
        .cache()
        .memory()
        .spawn_sweeper(config.cache.sweep_interval());

    let result = run(&service, args.command).await;

    sweeper.abort();
    service.close().await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    result
}

async fn run(service: &FeedService<HttpRenderer>, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Refresh { url, force } => {
            let outcomes = service.refresh(url.as_deref(), force).await?;
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        }
        Command::Feed { url, format } => {
            let format = parse_format(format.as_deref());
            let response = service.get_feed(&url, format).await?;
            info!(
                cache = %response.source,
                content_type = response.content_type,
                preview = %truncate_for_log(&response.body, 200),
                "Served feed"
            );
            println!("{}", response.body);
        }
        Command::Status => {
            let report = service.status().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Sources => {
            for source in service.sources() {
                println!("{}\t{}\t{}", source.label, source.extractor, source.url);
            }
        }
    }
    Ok(())
}
