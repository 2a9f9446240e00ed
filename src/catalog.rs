/// Catalog records and persistence seam.
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::pages::Episode;

/// Compact content identifier derived from show id, season and primary
/// episode number. Consumed by the persistence layer, never interpreted here.
pub fn content_id(show_id: u32, season: u32, num: u32) -> String {
    format!("{}{}{}", show_id, season, num)
}

/// Lowercased, underscore-joined show name used in file paths and feed keys.
pub fn formatted_name(show_name: &str) -> String {
    show_name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Public URL a season feed is served from.
pub fn feed_url(feed_base: &str, show_name: &str, season: u32) -> String {
    format!(
        "{}/{}/{}.json",
        feed_base.trim_end_matches('/'),
        formatted_name(show_name),
        season
    )
}

/// One playable source in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub url: String,
    pub bitrate: u32,
}

/// One finalized episode in a season feed. An empty source list means
/// extraction was attempted and found nothing, distinguishing "extraction
/// failed" from "not yet aired".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub season: u32,
    pub num: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_end: Option<u32>,
    pub name: String,
    pub desc: String,
    pub content_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_src: Option<String>,
    pub sources: Vec<SourceRecord>,
}

impl EpisodeRecord {
    /// Build the record for a terminal episode.
    pub fn from_episode(episode: &Episode, show_id: u32) -> Self {
        Self {
            season: episode.season,
            num: episode.number.num,
            range_end: episode.number.range_end,
            name: episode.title.clone(),
            desc: episode.description.clone().unwrap_or_default(),
            content_id: content_id(show_id, episode.season, episode.number.num),
            duration: episode.duration.clone(),
            img_src: episode.thumbnail.clone(),
            sources: episode
                .sources
                .iter()
                .map(|s| SourceRecord {
                    url: s.url.clone(),
                    bitrate: s.bitrate,
                })
                .collect(),
        }
    }
}

/// A season feed: all attempted episodes of one show season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub show: String,
    pub season: u32,
    pub generated_at: DateTime<Utc>,
    pub episodes: Vec<EpisodeRecord>,
}

/// Latest-episode marker in the shows index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestEpisode {
    pub season: u32,
    pub num: u32,
}

/// Per-season feed pointer in the shows index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonFeed {
    pub num: u32,
    pub feed: String,
}

/// One show in the generated shows index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowIndexEntry {
    pub name: String,
    pub url: String,
    pub img_src: String,
    pub latest: LatestEpisode,
    pub seasons: Vec<SeasonFeed>,
}

/// Abstract sink the pipeline emits finalized records into.
#[async_trait]
pub trait CatalogSink: Send + Sync {
    async fn write_season(&self, record: &SeasonRecord) -> Result<()>;

    async fn write_shows_index(&self, entries: &[ShowIndexEntry]) -> Result<()>;
}

/// Sink writing per-season JSON files under `<base>/<show>/<season>.json`
/// and the shows index at `<base>/shows.json`.
pub struct JsonCatalogWriter {
    base_dir: PathBuf,
}

impl JsonCatalogWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn season_path(&self, show: &str, season: u32) -> PathBuf {
        self.base_dir
            .join(formatted_name(show))
            .join(format!("{}.json", season))
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(value)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogSink for JsonCatalogWriter {
    async fn write_season(&self, record: &SeasonRecord) -> Result<()> {
        let path = self.season_path(&record.show, record.season);
        self.write_json(&path, record).await?;
        info!(
            "💾 Wrote season {} of {} ({} episodes) to {}",
            record.season,
            record.show,
            record.episodes.len(),
            path.display()
        );
        Ok(())
    }

    async fn write_shows_index(&self, entries: &[ShowIndexEntry]) -> Result<()> {
        let path = self.base_dir.join("shows.json");
        self.write_json(&path, &entries).await?;
        info!("💾 Wrote shows index ({} shows) to {}", entries.len(), path.display());
        Ok(())
    }
}
