use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::catalog::{
    feed_url, CatalogSink, EpisodeRecord, LatestEpisode, SeasonFeed, SeasonRecord, ShowIndexEntry,
};
use crate::config::{Config, ShowConfig};
use crate::error::{RenderError, ScrapeError};
use crate::extract::SourceExtractor;
use crate::fetch::PageFetcher;
use crate::pages::detail::DetailPage;
use crate::pages::listing::ListingPage;
use crate::pages::player::PlayerPage;
use crate::pages::Episode;
use crate::render::RenderSession;
use crate::select::SourceSelector;

/// Accounting for one scrape run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub shows: usize,
    pub failed_shows: usize,
    pub seasons: usize,
    pub episodes: usize,
    pub sourced: usize,
    pub sourceless: usize,
    pub elapsed: Duration,
}

/// Sequential scrape runner: shows, then seasons, then episodes, then
/// per-episode candidates. A single rendering session is exclusively owned
/// for the run and released on every exit path.
pub struct ScrapeRunner {
    config: Config,
    fetcher: PageFetcher,
    extractor: SourceExtractor,
    selector: SourceSelector,
    render: Arc<dyn RenderSession>,
    sink: Arc<dyn CatalogSink>,
    cancelled: Arc<AtomicBool>,
}

impl ScrapeRunner {
    pub fn new(config: Config, render: Arc<dyn RenderSession>, sink: Arc<dyn CatalogSink>) -> Self {
        let fetcher = PageFetcher::new(&config.http);
        let extractor = SourceExtractor::new(Arc::clone(&render));
        let selector = SourceSelector::new(config.hosts.clone());

        Self {
            config,
            fetcher,
            extractor,
            selector,
            render,
            sink,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag an interrupt handler can set to stop further episode processing.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Scrape the selected shows and emit season feeds. The rendering
    /// session is released before returning, whether the run succeeded,
    /// failed or was interrupted.
    pub async fn run(
        &self,
        show_filter: Option<&str>,
        season_filter: Option<u32>,
    ) -> Result<RunSummary> {
        let result = self.run_inner(show_filter, season_filter).await;

        if let Err(e) = self.render.release().await {
            warn!("failed to release rendering session: {}", e);
        }

        result
    }

    async fn run_inner(
        &self,
        show_filter: Option<&str>,
        season_filter: Option<u32>,
    ) -> Result<RunSummary> {
        let start = Instant::now();
        let mut summary = RunSummary::default();

        let shows: Vec<(String, ShowConfig)> = match show_filter {
            Some(name) => {
                let show = self
                    .config
                    .show(name)
                    .ok_or_else(|| anyhow!("unknown show: {}", name))?;
                vec![(name.to_lowercase(), show.clone())]
            }
            None => self
                .config
                .shows
                .iter()
                .map(|(name, show)| (name.clone(), show.clone()))
                .collect(),
        };

        for (name, show) in shows {
            if self.is_cancelled() {
                info!("🛑 Interrupted, skipping remaining shows");
                break;
            }

            info!("📺 Scraping {}...", name);
            match self.scrape_show(&name, &show, season_filter, &mut summary).await {
                Ok(()) => summary.shows += 1,
                Err(e) => {
                    if let Some(RenderError::Unavailable(_)) = e.downcast_ref::<RenderError>() {
                        error!("🛑 Rendering session lost, aborting run: {}", e);
                        summary.elapsed = start.elapsed();
                        return Err(e);
                    }
                    error!("💥 {} failed, moving on to the next show: {}", name, e);
                    summary.failed_shows += 1;
                }
            }
        }

        summary.elapsed = start.elapsed();
        Ok(summary)
    }

    async fn scrape_show(
        &self,
        name: &str,
        show: &ShowConfig,
        season_filter: Option<u32>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let html = self.fetcher.get(&show.url).await?;
        let listing = ListingPage::parse(&show.url, &html, &self.config.http.base_url);

        let show_title = if listing.show_name.is_empty() {
            name.to_string()
        } else {
            listing.show_name.clone()
        };

        let seasons = match season_filter {
            Some(season) => vec![season],
            None => listing.seasons(),
        };

        for season in seasons {
            if self.is_cancelled() {
                break;
            }

            let episodes = listing.episodes(Some(season));
            info!("📼 Season {}: {} episodes", season, episodes.len());

            let mut records = Vec::new();
            let mut interrupted = false;

            for mut episode in episodes {
                if self.is_cancelled() {
                    interrupted = true;
                    break;
                }

                debug!("resolving {}", episode);
                self.enrich_from_detail(&mut episode).await;

                match self.resolve_sources(&mut episode).await {
                    Ok(()) => {}
                    Err(ScrapeError::Render(e @ RenderError::Unavailable(_))) => {
                        return Err(e.into());
                    }
                    Err(ScrapeError::NoSource(url)) => {
                        warn!("⚠️ {}: no viable source on {}", episode, url);
                    }
                    Err(ScrapeError::UnknownHost(host)) => {
                        error!(
                            "💥 host {} missing from bitrate table while resolving {}",
                            host, episode
                        );
                    }
                    Err(e) => {
                        warn!("⚠️ {}: source extraction failed: {}", episode, e);
                    }
                }

                summary.episodes += 1;
                if episode.sources.is_empty() {
                    info!("📭 {} recorded without sources", episode);
                    summary.sourceless += 1;
                } else {
                    info!("✅ {} resolved with {} source(s)", episode, episode.sources.len());
                    summary.sourced += 1;
                }

                records.push(EpisodeRecord::from_episode(&episode, show.id));
            }

            if interrupted {
                info!("🛑 Season {} interrupted before all episodes were attempted, output skipped", season);
                break;
            }

            let record = SeasonRecord {
                show: show_title.clone(),
                season,
                generated_at: Utc::now(),
                episodes: records,
            };
            self.sink.write_season(&record).await?;
            summary.seasons += 1;
        }

        Ok(())
    }

    /// Follow the detail link through the watch-here redirect when there is
    /// one. Every failure here is recoverable: the episode keeps its listing
    /// link and an empty description.
    async fn enrich_from_detail(&self, episode: &mut Episode) {
        match self.fetcher.get(&episode.detail_url).await {
            Ok(html) => {
                match DetailPage::parse(&episode.detail_url, &html, &self.config.http.base_url) {
                    Ok(detail) => {
                        episode.description = Some(detail.description);
                        episode.detail_url = detail.player_url;
                    }
                    Err(ScrapeError::NotWatchHere(_)) => {
                        debug!("{} links straight to a player page", episode);
                    }
                    Err(e) => warn!("detail parse failed for {}: {}", episode, e),
                }
            }
            Err(ScrapeError::Timeout(url)) => {
                warn!("detail fetch timed out for {}, keeping listing link", url);
            }
            Err(e) => warn!("detail fetch failed for {}: {}", episode, e),
        }
    }

    /// Resolve the episode's player page into zero or more sources. The
    /// first candidate that knows the episode's duration or thumbnail fills
    /// those fields; later candidates never overwrite them.
    async fn resolve_sources(&self, episode: &mut Episode) -> Result<(), ScrapeError> {
        let html = self.fetcher.get(&episode.detail_url).await?;
        let player = PlayerPage::parse(&episode.detail_url, &html, &self.config.hosts)?;
        let blobs = self.extractor.extract(&player).await?;

        for candidate in blobs {
            match self.selector.select(&candidate.blob)? {
                Some(source) => {
                    if episode.duration.is_none() {
                        episode.duration = source.duration.clone();
                    }
                    if episode.thumbnail.is_none() {
                        episode.thumbnail = source.thumbnail.clone();
                    }
                    debug!("accepted {} at tier {}", source.url, source.bitrate);
                    episode.sources.push(source);
                }
                None => {
                    debug!("candidate {} offered no acceptable file", candidate.page_url);
                }
            }
        }

        Ok(())
    }
}

/// Build the shows index: per configured show, its name, thumbnail, latest
/// episode and season feed URLs. A show whose listing fetch times out is
/// skipped, not fatal. Rendering is not involved.
pub async fn build_shows_index(config: &Config, fetcher: &PageFetcher) -> Vec<ShowIndexEntry> {
    let mut entries = Vec::new();

    for (name, show) in &config.shows {
        info!("📺 Indexing {}...", name);
        let html = match fetcher.get(&show.url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("skipping {}: listing fetch failed: {}", name, e);
                continue;
            }
        };

        let listing = ListingPage::parse(&show.url, &html, &config.http.base_url);
        let Some((season, number)) = listing.latest_episode() else {
            warn!("skipping {}: no episodes parsed from listing", name);
            continue;
        };

        let title = if listing.show_name.is_empty() {
            name.clone()
        } else {
            listing.show_name.clone()
        };

        entries.push(ShowIndexEntry {
            name: title.clone(),
            url: show.url.clone(),
            img_src: listing.thumbnail.clone(),
            latest: LatestEpisode {
                season,
                num: number.num,
            },
            seasons: listing
                .seasons()
                .into_iter()
                .map(|s| SeasonFeed {
                    num: s,
                    feed: feed_url(&config.output.feed_base_url, &title, s),
                })
                .collect(),
        });
    }

    entries
}
