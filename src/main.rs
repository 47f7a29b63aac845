//! `card-harvest` command line entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use card_harvest::infrastructure::{init_logging_with_config, AppConfig, HttpClient, HttpClientConfig};
use card_harvest::{CardPipeline, PipelineReport, PipelineSettings};

#[derive(Parser)]
#[command(name = "card-harvest")]
#[command(version, about = "Build a trading card dataset for one card set")]
struct Cli {
    /// Set URL (`https://www.serebii.net/card/<set>/`) or bare set id
    set_reference: Option<String>,

    /// Directory for cached card images
    #[arg(long)]
    cache_root: Option<PathBuf>,

    /// Dataset file to write
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Concurrent image downloads
    #[arg(long)]
    image_concurrency: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the run report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(root) = &self.cache_root {
            config.cache.root = root.clone();
        }
        if let Some(output) = &self.output {
            config.pipeline.output_path = output.clone();
        }
        if let Some(width) = self.image_concurrency {
            config.pipeline.image_concurrency = width;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

fn print_summary(report: &PipelineReport) {
    println!("Set:        {} ({})", report.set.id, report.set.source_url);
    println!("Strategy:   {:?}", report.strategy);
    println!("Cards:      {} written, {} dropped without number", report.records_written, report.dropped_without_number);
    println!(
        "Images:     {} cached, {} fetched, {} unavailable",
        report.image_hits, report.images_fetched, report.images_unavailable
    );
    println!("Dataset:    {}", report.dataset_path.display());
    if !report.diagnostics.is_empty() {
        println!("Diagnostics ({}):", report.diagnostics.len());
        for diagnostic in &report.diagnostics {
            println!("  [{}] {}: {}", diagnostic.stage, diagnostic.identifier, diagnostic.cause);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging_with_config(&config.logging)?;
    info!("card-harvest {} starting", env!("CARGO_PKG_VERSION"));

    let client = HttpClient::with_config(HttpClientConfig::from_http_config(&config.http))?;
    let pipeline = CardPipeline::new(Arc::new(client), PipelineSettings::from_app_config(&config))?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current card");
            ctrl_c_token.cancel();
        }
    });

    let reference = cli
        .set_reference
        .clone()
        .unwrap_or_else(|| config.site.default_set_id.clone());
    let report = pipeline
        .run(&reference, cancel)
        .await
        .with_context(|| format!("Acquisition of '{}' failed", reference))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}
