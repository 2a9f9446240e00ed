/// CT Catalog Scraper
///
/// Resolves a TV show's listing page down to quality-ranked, bitrate-annotated
/// video source URLs per episode, tolerating partial failures at every stage.

pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod pages;
pub mod processing;
pub mod render;
pub mod select;
pub mod text;

// Re-export main types for easy access
pub use crate::catalog::{CatalogSink, EpisodeRecord, JsonCatalogWriter, SeasonRecord};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{RenderError, ScrapeError};
pub use crate::extract::{CandidateBlob, ParamBlob, SourceExtractor};
pub use crate::fetch::PageFetcher;
pub use crate::pages::detail::DetailPage;
pub use crate::pages::listing::ListingPage;
pub use crate::pages::player::PlayerPage;
pub use crate::pages::{Episode, EpisodeNumber, Source};
pub use crate::processing::{RunSummary, ScrapeRunner};
pub use crate::render::{HeadlessChromeRenderer, RenderSession};
pub use crate::select::SourceSelector;
