/// Intermediate "watch here" redirect page between listing and player.
use scraper::{Html, Selector};

use crate::error::ScrapeError;
use crate::text::{absolute_url, fix_text};

/// Marker phrase distinguishing redirect pages from direct player pages.
const WATCH_HERE_MARKER: &str = "Watch it here";

/// Parsed redirect page carrying the episode description and the canonical
/// player page link.
#[derive(Debug, Clone)]
pub struct DetailPage {
    pub url: String,
    pub description: String,
    pub player_url: String,
}

impl DetailPage {
    /// Classify and parse a detail page body. Pages without the marker phrase
    /// are direct player pages and yield `ScrapeError::NotWatchHere`; the
    /// caller keeps the original URL in that case. At most one hop: the
    /// extracted link is taken as the player page without re-classification.
    pub fn parse(url: &str, html: &str, base_url: &str) -> Result<Self, ScrapeError> {
        let document = Html::parse_document(html);
        let entry_selector = Selector::parse(".entry").expect("valid selector");

        let Some(entry) = document.select(&entry_selector).next() else {
            return Err(ScrapeError::NotWatchHere(url.to_string()));
        };

        let entry_text = entry.text().collect::<String>();
        if !entry_text.contains(WATCH_HERE_MARKER) {
            return Err(ScrapeError::NotWatchHere(url.to_string()));
        }

        let paragraph_selector = Selector::parse("p").expect("valid selector");
        let description = entry
            .select(&paragraph_selector)
            .next()
            .map(|p| fix_text(&p.text().collect::<String>()))
            .unwrap_or_default();

        let link_selector = Selector::parse("a").expect("valid selector");
        let player_url = entry
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolute_url(base_url, href))
            .ok_or_else(|| ScrapeError::NotWatchHere(url.to_string()))?;

        Ok(Self {
            url: url.to_string(),
            description,
            player_url,
        })
    }
}
