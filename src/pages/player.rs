/// Player page embedding third-party video-hosting iframes.
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::ScrapeError;
use crate::text::host_of;

/// Player page reduced to its viable hosting iframe candidates, in listing
/// order.
#[derive(Debug, Clone)]
pub struct PlayerPage {
    pub url: String,
    pub candidates: Vec<String>,
}

impl PlayerPage {
    /// Discover hosting iframes scoped to the page's tab container, keeping
    /// only sources whose host appears in the bitrate table. Zero surviving
    /// candidates is the terminal failure for an episode with no resolvable
    /// video.
    pub fn parse(
        url: &str,
        html: &str,
        hosts: &BTreeMap<String, u32>,
    ) -> Result<Self, ScrapeError> {
        let document = Html::parse_document(html);
        let iframe_selector = Selector::parse(".postTabs_divs iframe").expect("valid selector");

        let candidates: Vec<String> = document
            .select(&iframe_selector)
            .filter_map(|iframe| iframe.value().attr("src"))
            .filter(|src| match host_of(src) {
                Some(host) => hosts.contains_key(&host),
                None => {
                    debug!("discarding iframe with unparseable src: {}", src);
                    false
                }
            })
            .map(str::to_string)
            .collect();

        if candidates.is_empty() {
            return Err(ScrapeError::NoSource(url.to_string()));
        }

        Ok(Self {
            url: url.to_string(),
            candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn player_html() -> &'static str {
        r#"
        <html><body>
        <div class="entry">
            <div class="postTabs_divs">
                <iframe src="http://vshare.eu/embed/abc123"></iframe>
                <iframe src="http://ads.example.com/banner"></iframe>
                <iframe src="http://played.to/embed/def456"></iframe>
            </div>
            <iframe src="http://vk.com/outside-tab-container"></iframe>
        </div>
        </body></html>
        "#
    }

    #[test]
    fn test_candidates_filtered_to_known_hosts() {
        let config = Config::default();
        let page =
            PlayerPage::parse("http://www.couchtuner.eu/ep/", player_html(), &config.hosts)
                .unwrap();

        assert_eq!(
            page.candidates,
            vec![
                "http://vshare.eu/embed/abc123".to_string(),
                "http://played.to/embed/def456".to_string(),
            ]
        );
    }

    #[test]
    fn test_zero_known_host_candidates_is_no_source() {
        let config = Config::default();
        let html = r#"
        <html><body>
        <div class="postTabs_divs">
            <iframe src="http://ads.example.com/banner"></iframe>
        </div>
        </body></html>
        "#;

        let err = PlayerPage::parse("http://www.couchtuner.eu/ep/", html, &config.hosts)
            .unwrap_err();
        assert!(matches!(err, ScrapeError::NoSource(_)));
    }
}
