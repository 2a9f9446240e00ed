/// Show listing page: one list item per episode, mixed with unrelated rows.
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::{Episode, EpisodeNumber};
use crate::text::{absolute_url, fix_text};

/// Episode row pattern: optional Season/S token, Episode/Epis0de/E token with
/// an optional "-NN" range suffix, optional separator, rest is the title.
const EPISODE_PATTERN: &str =
    r"(?:S|Season )(?P<season>\d+) (?:E|Epis[o0]de )(?P<ep>\d+)(?:-(?P<end>\d+))?(?: ?\W+)? (?P<name>.*)";

/// Parsed listing page for a single show.
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub url: String,

    /// Show name from the "Watch <name> Online" header; empty when the
    /// header does not match (pages vary slightly in markup across shows).
    pub show_name: String,

    /// Show thumbnail; empty when absent.
    pub thumbnail: String,

    episodes: Vec<Episode>,
}

impl ListingPage {
    /// Parse a listing page body. Rows that do not match the episode pattern
    /// contribute nothing; a missing header or thumbnail yields an empty
    /// value, never an error.
    pub fn parse(url: &str, html: &str, base_url: &str) -> Self {
        let document = Html::parse_document(html);
        let pattern = Regex::new(EPISODE_PATTERN).expect("episode pattern is valid");

        let show_name = Self::parse_show_name(&document);
        let thumbnail = Self::parse_thumbnail(&document, base_url);

        let mut episodes = Vec::new();
        let row_selector = Selector::parse(".entry li").expect("valid selector");
        let link_selector = Selector::parse("a").expect("valid selector");

        for row in document.select(&row_selector) {
            let row_text = fix_text(&row.text().collect::<String>());
            let Some(captures) = pattern.captures(&row_text) else {
                debug!("skipping non-episode row: {}", row_text);
                continue;
            };

            let Some(href) = row
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
            else {
                debug!("skipping episode row without link: {}", row_text);
                continue;
            };

            let (Some(season), Some(num)) = (
                captures["season"].parse::<u32>().ok(),
                captures["ep"].parse::<u32>().ok(),
            ) else {
                continue;
            };

            let number = match captures.name("end").and_then(|m| m.as_str().parse::<u32>().ok()) {
                Some(end) => EpisodeNumber::range(num, end),
                None => EpisodeNumber::new(num),
            };

            episodes.push(Episode::new(
                season,
                number,
                captures["name"].trim().to_string(),
                absolute_url(base_url, href),
            ));
        }

        // Duplicate (season, number) pairs are a data-quality signal from the
        // listing, not enforced here; both entries are kept.
        let mut seen = BTreeSet::new();
        for episode in &episodes {
            if !seen.insert((episode.season, episode.number.num)) {
                warn!("listing {} repeats S{} E{}", url, episode.season, episode.number);
            }
        }

        Self {
            url: url.to_string(),
            show_name,
            thumbnail,
            episodes,
        }
    }

    fn parse_show_name(document: &Html) -> String {
        let header_selector = Selector::parse(".post h2").expect("valid selector");
        let name_pattern = Regex::new(r"^Watch (.*) [Oo]nline").expect("valid pattern");

        document
            .select(&header_selector)
            .next()
            .map(|h| fix_text(&h.text().collect::<String>()))
            .and_then(|header| {
                name_pattern
                    .captures(&header)
                    .map(|c| c[1].to_string())
            })
            .unwrap_or_default()
    }

    fn parse_thumbnail(document: &Html, base_url: &str) -> String {
        let img_selector = Selector::parse(".entry img").expect("valid selector");

        document
            .select(&img_selector)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(|src| absolute_url(base_url, src))
            .unwrap_or_default()
    }

    /// Episodes sorted by episode number ascending, optionally restricted to
    /// one season before sorting.
    pub fn episodes(&self, season: Option<u32>) -> Vec<Episode> {
        let mut selected: Vec<Episode> = self
            .episodes
            .iter()
            .filter(|ep| season.map_or(true, |s| ep.season == s))
            .cloned()
            .collect();
        selected.sort_by_key(|ep| ep.number);
        selected
    }

    /// Sorted distinct seasons present on the listing.
    pub fn seasons(&self) -> Vec<u32> {
        let mut seasons: Vec<u32> = self.episodes.iter().map(|ep| ep.season).collect();
        seasons.sort_unstable();
        seasons.dedup();
        seasons
    }

    /// Highest-numbered episode of the highest season, if any episode parsed.
    pub fn latest_episode(&self) -> Option<(u32, EpisodeNumber)> {
        let max_season = self.episodes.iter().map(|ep| ep.season).max()?;
        self.episodes
            .iter()
            .filter(|ep| ep.season == max_season)
            .map(|ep| ep.number)
            .max()
            .map(|number| (max_season, number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://www.couchtuner.eu";

    fn listing_html() -> &'static str {
        r#"
        <html><body>
        <div class="post"><h2>Watch Bates Motel Online</h2></div>
        <div class="entry">
            <img src="/img/bates-motel.jpg" />
            <ul>
                <li><a href="/watch-s2-e5/">S2 E05 The Return</a></li>
                <li><a href="/watch-s1-e1/">Season 1 Episode 1 - First You Dream, Then You Die</a></li>
                <li><a href="/watch-s1-e2/">Season 1 Epis0de 2 - Nice Town You Picked, Norma</a></li>
                <li><a href="/watch-s2-e15/">Season 2 Episode 15-16 - Double Feature</a></li>
                <li><a href="/news/">Site news and updates</a></li>
                <li>Season 9 Episode 9 - Row without a link</li>
            </ul>
        </div>
        </body></html>
        "#
    }

    #[test]
    fn test_parse_episode_rows() {
        let page = ListingPage::parse("http://www.couchtuner.eu/bates/", listing_html(), BASE);
        let episodes = page.episodes(None);

        // news row and link-less row contribute nothing
        assert_eq!(episodes.len(), 4);
        assert_eq!(
            episodes[0].detail_url,
            "http://www.couchtuner.eu/watch-s1-e1/"
        );
    }

    #[test]
    fn test_compact_token_row_capture_groups() {
        let page = ListingPage::parse("http://www.couchtuner.eu/bates/", listing_html(), BASE);
        let episodes = page.episodes(Some(2));

        assert_eq!(episodes[0].season, 2);
        assert_eq!(episodes[0].number, EpisodeNumber::new(5));
        assert_eq!(episodes[0].title, "The Return");
    }

    #[test]
    fn test_range_numbers_preserved() {
        let page = ListingPage::parse("http://www.couchtuner.eu/bates/", listing_html(), BASE);
        let episodes = page.episodes(Some(2));

        let double = episodes.last().unwrap();
        assert_eq!(double.number, EpisodeNumber::range(15, 16));
        assert_eq!(double.number.to_string(), "15-16");
        assert_eq!(double.title, "Double Feature");
    }

    #[test]
    fn test_episodes_sorted_by_number() {
        let page = ListingPage::parse("http://www.couchtuner.eu/bates/", listing_html(), BASE);
        let numbers: Vec<u32> = page
            .episodes(Some(1))
            .iter()
            .map(|ep| ep.number.num)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_seasons_sorted_distinct() {
        let page = ListingPage::parse("http://www.couchtuner.eu/bates/", listing_html(), BASE);
        assert_eq!(page.seasons(), vec![1, 2]);
    }

    #[test]
    fn test_latest_episode() {
        let page = ListingPage::parse("http://www.couchtuner.eu/bates/", listing_html(), BASE);
        let (season, number) = page.latest_episode().unwrap();
        assert_eq!(season, 2);
        assert_eq!(number.num, 15);
    }

    #[test]
    fn test_show_name_and_thumbnail() {
        let page = ListingPage::parse("http://www.couchtuner.eu/bates/", listing_html(), BASE);
        assert_eq!(page.show_name, "Bates Motel");
        assert_eq!(page.thumbnail, "http://www.couchtuner.eu/img/bates-motel.jpg");
    }

    #[test]
    fn test_missing_header_yields_empty_name() {
        let page = ListingPage::parse(
            "http://www.couchtuner.eu/odd/",
            "<html><body><div class='entry'><ul></ul></div></body></html>",
            BASE,
        );
        assert_eq!(page.show_name, "");
        assert_eq!(page.thumbnail, "");
        assert!(page.episodes(None).is_empty());
        assert!(page.latest_episode().is_none());
    }
}
