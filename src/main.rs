use anyhow::Result;
use clap::{Arg, Command};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

use ct_scraper::catalog::JsonCatalogWriter;
use ct_scraper::config::Config;
use ct_scraper::fetch::PageFetcher;
use ct_scraper::processing::{build_shows_index, ScrapeRunner};
use ct_scraper::render::HeadlessChromeRenderer;
use ct_scraper::CatalogSink;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("ct_scraper=info,warn")
        .init();

    let matches = Command::new("CT Catalog Scraper")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Scrapes show listings into per-season episode/source feeds")
        .arg(
            Arg::new("show")
                .long("show")
                .value_name("NAME")
                .help("Show name (default: all configured shows)")
        )
        .arg(
            Arg::new("season")
                .short('s')
                .long("season")
                .value_name("NUM")
                .help("Season number (default: all seasons)")
        )
        .arg(
            Arg::new("init")
                .short('i')
                .long("init")
                .help("Generate the shows index instead of season feeds")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory for catalog files")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
        .get_matches();

    if matches.get_flag("verbose") {
        info!("Verbose logging enabled");
    }

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    config.apply_env();

    if let Some(dir) = matches.get_one::<String>("output-dir") {
        config.output.base_dir = dir.into();
    }
    config.validate()?;

    let show_filter = matches.get_one::<String>("show").map(String::as_str);
    let season_filter = matches
        .get_one::<String>("season")
        .map(|s| s.parse::<u32>())
        .transpose()?;

    info!("🚀 CT Catalog Scraper starting...");
    info!("📂 Output directory: {}", config.output.base_dir.display());

    let start_time = std::time::Instant::now();
    let sink = Arc::new(JsonCatalogWriter::new(config.output.base_dir.clone()));

    if matches.get_flag("init") {
        let fetcher = PageFetcher::new(&config.http);
        let entries = build_shows_index(&config, &fetcher).await;
        sink.write_shows_index(&entries).await?;
        info!("✅ Indexed {} shows", entries.len());
    } else {
        let render = Arc::new(HeadlessChromeRenderer::launch(&config.render)?);
        let runner = ScrapeRunner::new(config, render, sink);

        // Interrupts stop further episode processing; the runner still
        // releases the rendering session before returning.
        let cancelled = runner.cancel_flag();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("🛑 Interrupt received, stopping after the current episode");
                cancelled.store(true, Ordering::Relaxed);
            }
        });

        let summary = runner.run(show_filter, season_filter).await?;

        info!("🎉 Run complete");
        info!("✅ Shows: {} ({} failed)", summary.shows, summary.failed_shows);
        info!("📼 Seasons written: {}", summary.seasons);
        info!(
            "📊 Episodes: {} total, {} with sources, {} sourceless",
            summary.episodes, summary.sourced, summary.sourceless
        );
    }

    let duration = start_time.elapsed();
    info!("⏱️ Duration: {:.1} minutes", duration.as_secs_f64() / 60.0);

    Ok(())
}
