use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Configuration for the catalog scraper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP fetch settings
    pub http: HttpConfig,

    /// Rendering session settings
    pub render: RenderConfig,

    /// Output and feed settings
    pub output: OutputConfig,

    /// Show catalog: lowercased show name -> listing page + content id prefix
    pub shows: BTreeMap<String, ShowConfig>,

    /// Hosting domain -> bandwidth tier. Doubles as the iframe allow-list.
    pub hosts: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowConfig {
    /// Canonical listing page URL
    pub url: String,

    /// Stable integer identifier, used to derive content ids
    pub id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Site base URL for resolving relative links
    pub base_url: String,

    /// Delay before each plain fetch, in milliseconds. Keeps the request
    /// rate under the origin's 503 threshold.
    pub fetch_delay_ms: u64,

    /// Longer delay before the single 503 retry, in milliseconds
    pub retry_delay_ms: u64,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Run the rendering browser headless
    pub headless: bool,

    /// Navigation/read timeout per candidate page, in seconds
    pub page_timeout_seconds: u64,

    /// Browser window size
    pub window_width: u32,
    pub window_height: u32,

    /// Optional path to a content-blocking extension loaded into the session
    pub adblock_extension: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Base directory for season catalog files
    pub base_dir: PathBuf,

    /// Public base URL season feeds are served from (used in the shows index)
    pub feed_base_url: String,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = [
            "ct-scraper.toml",
            "config/ct-scraper.toml",
            "~/.config/ct-scraper/config.toml",
            "/etc/ct-scraper/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(base_dir) = std::env::var("CT_SCRAPER_OUTPUT_DIR") {
            self.output.base_dir = PathBuf::from(base_dir);
        }

        if let Ok(delay) = std::env::var("CT_SCRAPER_FETCH_DELAY_MS") {
            self.http.fetch_delay_ms = delay.parse().unwrap_or(self.http.fetch_delay_ms);
        }

        if let Ok(crx) = std::env::var("CT_SCRAPER_ADBLOCK_CRX") {
            self.render.adblock_extension = Some(PathBuf::from(crx));
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.shows.is_empty() {
            return Err(anyhow!("show catalog is empty"));
        }

        if self.hosts.is_empty() {
            return Err(anyhow!("host bitrate table is empty"));
        }

        if self.http.timeout_seconds == 0 {
            return Err(anyhow!("timeout_seconds must be greater than 0"));
        }

        if self.render.page_timeout_seconds == 0 {
            return Err(anyhow!("page_timeout_seconds must be greater than 0"));
        }

        for (name, show) in &self.shows {
            if show.url.is_empty() {
                return Err(anyhow!("show '{}' has an empty listing URL", name));
            }
        }

        Ok(())
    }

    /// Look up a show by (case-insensitive) name
    pub fn show(&self, name: &str) -> Option<&ShowConfig> {
        self.shows.get(&name.to_lowercase())
    }
}

impl Default for Config {
    fn default() -> Self {
        let shows = [
            ("bates motel", "http://www.couchtuner.eu/watch-bates-motel-online/", 7),
            ("game of thrones", "http://www.couchtuner.eu/watch-game-of-thrones-online-free/", 0),
            ("lost girl", "http://www.couchtuner.eu/watch-lost-girl/", 1),
            ("new girl", "http://www.couchtuner.eu/watch-new-girl-online/", 2),
            ("once upon a time", "http://www.couchtuner.eu/watch-once-upon-a-time-online/", 3),
            ("psych", "http://www.couchtuner.eu/psych/", 4),
            ("sherlock", "http://www.couchtuner.eu/sherlock/", 5),
            ("sons of anarchy", "http://www.couchtuner.eu/watch-sons-of-anarchy-online-1/", 6),
        ]
        .into_iter()
        .map(|(name, url, id)| {
            (
                name.to_string(),
                ShowConfig {
                    url: url.to_string(),
                    id,
                },
            )
        })
        .collect();

        let hosts = [
            ("vidbull.com", 900),
            ("vk.com", 850),
            ("played.to", 800),
            ("vshare.eu", 750),
            ("youwatch.org", 700),
        ]
        .into_iter()
        .map(|(host, tier)| (host.to_string(), tier))
        .collect();

        Self {
            http: HttpConfig {
                base_url: "http://www.couchtuner.eu".to_string(),
                fetch_delay_ms: 400,
                retry_delay_ms: 1000,
                timeout_seconds: 3,
                user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            },
            render: RenderConfig {
                headless: true,
                page_timeout_seconds: 5,
                window_width: 1280,
                window_height: 900,
                adblock_extension: None,
            },
            output: OutputConfig {
                base_dir: PathBuf::from("shows"),
                feed_base_url: "http://feeds.example.com/shows".to_string(),
            },
            shows,
            hosts,
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_fetch_delay_ms(mut self, delay: u64) -> Self {
        self.config.http.fetch_delay_ms = delay;
        self
    }

    pub fn with_page_timeout(mut self, seconds: u64) -> Self {
        self.config.render.page_timeout_seconds = seconds;
        self
    }

    pub fn with_show(mut self, name: &str, url: &str, id: u32) -> Self {
        self.config.shows.insert(
            name.to_lowercase(),
            ShowConfig {
                url: url.to_string(),
                id,
            },
        );
        self
    }

    pub fn with_host(mut self, host: &str, tier: u32) -> Self {
        self.config.hosts.insert(host.to_string(), tier);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.http.fetch_delay_ms, 400);
        assert_eq!(config.hosts.get("vidbull.com"), Some(&900));
        assert!(config.show("Sherlock").is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_fetch_delay_ms(0)
            .with_show("Orphan Black", "http://www.couchtuner.eu/orphan-black/", 8)
            .with_host("fastcdn.example", 1100)
            .build();

        assert_eq!(config.http.fetch_delay_ms, 0);
        assert_eq!(config.show("orphan black").unwrap().id, 8);
        assert_eq!(config.hosts.get("fastcdn.example"), Some(&1100));
    }

    #[test]
    fn test_validation_rejects_empty_tables() {
        let mut config = Config::default();
        config.hosts.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_roundtrip_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let reparsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.shows.len(), config.shows.len());
        assert_eq!(reparsed.hosts.get("vshare.eu"), Some(&750));
    }
}
