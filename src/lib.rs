pub mod aggregator;
pub mod cli;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod domain;
pub mod feed;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod quality;
pub mod resolver;
pub mod sources;
pub mod want;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::CommandFactory;
use cli::{Cli, Commands};
pub use config::Config;
use config::{GeneralConfig, LogFormat};
use dispatch::{QBitClient, QBitConfig};
use parser::{NumberingRegistry, NumberingScheme, ParsedName};
use pipeline::{Pipeline, RunStats, show_index};
use std::sync::Arc;
use tokio::signal;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    init_tracing(&config.general)?;

    let Cli {
        config: config_path,
        command,
    } = cli;

    let Some(command) = command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    if !matches!(command, Commands::Init) {
        config.validate()?;
    }

    if config.observability.metrics_enabled
        && matches!(command, Commands::Check { .. } | Commands::Daemon)
    {
        install_metrics(config.observability.metrics_port)?;
    }

    match command {
        Commands::Check { dry_run, json } => run_single_check(&config, dry_run, json).await,
        Commands::Daemon => run_daemon(&config).await,
        Commands::Sources => {
            cmd_sources(&config);
            Ok(())
        }
        Commands::Parse {
            name,
            numbering,
            has_ext,
        } => cmd_parse(&config, &name, numbering, has_ext),
        Commands::Init => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            cmd_init(&path)
        }
    }
}

fn init_tracing(general: &GeneralConfig) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match general.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
    .context("Failed to initialise logging")
}

fn install_metrics(port: u16) -> anyhow::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus exporter")?;

    metrics::describe_counter!(
        "showarr_releases_parsed_total",
        "Feed entries recognised as releases"
    );
    metrics::describe_counter!(
        "showarr_fetch_failures_total",
        "Source refreshes that failed or timed out"
    );
    metrics::describe_counter!(
        "showarr_dispatches_total",
        "Releases handed to the download client"
    );
    metrics::describe_histogram!(
        "showarr_run_duration_seconds",
        metrics::Unit::Seconds,
        "Duration of a full poll, resolve and dispatch run"
    );

    info!(port, "Prometheus metrics exporter listening");
    Ok(())
}

async fn run_single_check(config: &Config, dry_run: bool, json: bool) -> anyhow::Result<()> {
    info!(dry_run, "Running single check...");

    let mut pipeline = Pipeline::from_config(config, dry_run)?;
    let stats = pipeline.run_once().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }

    Ok(())
}

async fn run_daemon(config: &Config) -> anyhow::Result<()> {
    if !config.scheduler.enabled {
        anyhow::bail!("Scheduler is disabled; enable [scheduler] or use 'showarr check'");
    }

    info!(
        "Showarr v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    if config.qbittorrent.enabled {
        let client = QBitClient::new(QBitConfig::from(&config.qbittorrent))?;
        if client.is_available().await {
            info!(url = %config.qbittorrent.url, "Connected to qBittorrent");
        } else {
            warn!("qBittorrent is not reachable yet, dispatches will fail until it is");
        }
    }

    let mut pipeline = Pipeline::from_config(config, false)?;

    let minutes = u64::from(config.scheduler.check_interval_minutes);
    let mut ticker = interval(Duration::from_secs(minutes * 60));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        sources = pipeline.aggregator().sources().len(),
        "Polling every {} minutes. Press Ctrl+C to stop.", minutes
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                pipeline.run_once().await;
            }
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Shutdown signal received"),
                    Err(e) => error!("Error listening for shutdown: {}", e),
                }
                break;
            }
        }
    }

    info!("Daemon stopped");
    Ok(())
}

fn print_stats(stats: &RunStats) {
    println!("Sources:");
    for report in &stats.sources {
        println!("  {:<20} {:?}", report.name, report.outcome);
    }
    println!();
    println!("Releases:   {}", stats.releases);
    println!("Wanted:     {}", stats.wanted);
    println!("Episodes:   {}", stats.episodes);
    println!(
        "Dispatched: {} ({} failed)",
        stats.dispatch.dispatched, stats.dispatch.failed
    );
    println!("Took {} ms", stats.duration_ms);
}

fn cmd_sources(config: &Config) {
    if config.sources.is_empty() {
        println!("No sources configured. Add [[sources]] entries to config.toml.");
        return;
    }

    println!(
        "{:<4} {:<20} {:<8} {:<9} {:<8} {:>8}  URL",
        "#", "NAME", "KIND", "NUMBERING", "ENABLED", "REFRESH"
    );
    println!("{:-<90}", "");

    for (priority, source) in config.sources.iter().enumerate() {
        println!(
            "{:<4} {:<20} {:<8} {:<9} {:<8} {:>7}s  {}",
            priority,
            source.name,
            source.kind.as_str(),
            source.numbering.as_str(),
            if source.enabled { "yes" } else { "no" },
            source.min_refresh_secs,
            source.url
        );
    }
}

fn cmd_parse(
    config: &Config,
    name: &str,
    numbering: NumberingScheme,
    has_ext: bool,
) -> anyhow::Result<()> {
    let shows = show_index(config);
    if shows.is_empty() {
        println!("Warning: no shows configured, every name will be unknown.");
    }

    let registry = NumberingRegistry::with_defaults(Arc::new(shows));
    let parser = registry
        .parser(numbering)
        .with_context(|| format!("No parser for numbering '{numbering}'"))?;

    match parser.parse(name, has_ext) {
        ParsedName::Known(parsed) => {
            let episodes: Vec<String> = parsed
                .episodes
                .iter()
                .map(|(season, episode)| format!("S{season:02}E{episode:02}"))
                .collect();

            println!("Show:     {} (id {})", parsed.series, parsed.show);
            println!("Episodes: {}", episodes.join(", "));
            println!("Quality:  {}", parsed.quality);
        }
        ParsedName::Unknown => println!("Not recognised with '{numbering}' numbering."),
    }

    Ok(())
}

fn cmd_init(path: &Path) -> anyhow::Result<()> {
    if Config::create_default_if_missing(path)? {
        println!(
            "✓ Config file created at {}. Edit it and run again.",
            path.display()
        );
    } else {
        println!("Config file already exists at {}", path.display());
    }
    Ok(())
}
