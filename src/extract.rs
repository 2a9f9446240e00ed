/// Parameter blob recovery from rendered hosting pages.
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::RenderError;
use crate::pages::player::PlayerPage;
use crate::render::RenderSession;
use crate::select::{DURATION_FIELD, FILE_FIELDS, IMAGE_FIELDS};

/// Name of the form field hosting pages populate with their parameters.
const PARAM_FIELD: &str = "flashvars";

/// Transient multi-valued field map recovered from one rendered hosting
/// page, filtered to the allow-listed field names. Consumed by selection
/// and discarded; never persisted.
#[derive(Debug, Clone, Default)]
pub struct ParamBlob {
    fields: HashMap<String, Vec<String>>,
}

impl ParamBlob {
    /// Parse a URL-encoded query string, keeping only allow-listed fields.
    pub fn parse(raw: &str) -> Self {
        let mut fields: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if is_allowed(&key) {
                fields.entry(key.into_owned()).or_default().push(value.into_owned());
            }
        }
        Self { fields }
    }

    /// First value for a field, when present and non-empty.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn is_allowed(key: &str) -> bool {
    key == DURATION_FIELD || FILE_FIELDS.contains(&key) || IMAGE_FIELDS.contains(&key)
}

/// Blob recovered from one iframe candidate, tagged with the candidate URL.
#[derive(Debug, Clone)]
pub struct CandidateBlob {
    pub page_url: String,
    pub blob: ParamBlob,
}

/// Recovers parameter blobs by loading each candidate in the shared
/// rendering session.
pub struct SourceExtractor {
    render: Arc<dyn RenderSession>,
}

impl SourceExtractor {
    pub fn new(render: Arc<dyn RenderSession>) -> Self {
        Self { render }
    }

    /// Render each candidate serially and read its parameter field. A
    /// candidate that times out, fails to render, or carries no data is
    /// skipped; one bad host must not abort the episode.
    pub async fn extract(&self, player: &PlayerPage) -> Result<Vec<CandidateBlob>, RenderError> {
        let mut blobs = Vec::new();

        for candidate in &player.candidates {
            match self.extract_candidate(candidate).await {
                Ok(Some(blob)) => blobs.push(CandidateBlob {
                    page_url: candidate.clone(),
                    blob,
                }),
                Ok(None) => debug!("no data from candidate: {}", candidate),
                Err(e @ RenderError::Unavailable(_)) => return Err(e),
                Err(e) => warn!("candidate {} failed to render: {}", candidate, e),
            }
        }

        Ok(blobs)
    }

    async fn extract_candidate(&self, url: &str) -> Result<Option<ParamBlob>, RenderError> {
        self.render.navigate(url).await?;

        let Some(raw) = self.render.form_field_value(PARAM_FIELD).await? else {
            return Ok(None);
        };

        let blob = ParamBlob::parse(&raw);
        if blob.is_empty() {
            return Ok(None);
        }
        Ok(Some(blob))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Scripted stand-in returning the field value for the last navigated
    /// URL; a URL missing from the map simulates a render timeout.
    struct SequencedRender {
        pages: HashMap<String, Option<String>>,
        current: std::sync::Mutex<Option<String>>,
    }

    #[async_trait]
    impl RenderSession for SequencedRender {
        async fn navigate(&self, url: &str) -> Result<(), RenderError> {
            if self.pages.contains_key(url) {
                *self.current.lock().unwrap() = Some(url.to_string());
                Ok(())
            } else {
                Err(RenderError::Timeout(url.to_string(), 5))
            }
        }

        async fn form_field_value(&self, _name: &str) -> Result<Option<String>, RenderError> {
            let current = self.current.lock().unwrap().clone();
            Ok(current.and_then(|url| self.pages.get(&url).cloned().flatten()))
        }

        async fn release(&self) -> Result<(), RenderError> {
            Ok(())
        }
    }

    fn player_with(candidates: &[&str]) -> PlayerPage {
        PlayerPage {
            url: "http://www.couchtuner.eu/ep/".to_string(),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_blob_parse_filters_to_allowlist() {
        let blob = ParamBlob::parse(
            "file=http%3A%2F%2Fhost%2Fvid.mp4&image=http%3A%2F%2Fhost%2Fthumb.jpg&tracker=evil&duration=2542",
        );

        assert_eq!(blob.first("file"), Some("http://host/vid.mp4"));
        assert_eq!(blob.first("image"), Some("http://host/thumb.jpg"));
        assert_eq!(blob.first("duration"), Some("2542"));
        assert_eq!(blob.first("tracker"), None);
    }

    #[test]
    fn test_blob_multi_valued_fields_keep_first() {
        let blob = ParamBlob::parse("url720=http://host/a.mp4&url720=http://host/b.mp4");
        assert_eq!(blob.first("url720"), Some("http://host/a.mp4"));
    }

    #[test]
    fn test_blob_empty_values_read_as_absent() {
        let blob = ParamBlob::parse("file=&duration=100");
        assert_eq!(blob.first("file"), None);
        assert_eq!(blob.first("duration"), Some("100"));
    }

    #[tokio::test]
    async fn test_one_bad_candidate_does_not_abort_episode() {
        let mut pages = HashMap::new();
        pages.insert(
            "http://vshare.eu/embed/ok".to_string(),
            Some("url480=http://vshare.eu/vid.mp4".to_string()),
        );

        let render = Arc::new(SequencedRender {
            pages,
            current: std::sync::Mutex::new(None),
        });
        let extractor = SourceExtractor::new(render);

        let player = player_with(&["http://vk.com/embed/dead", "http://vshare.eu/embed/ok"]);
        let blobs = extractor.extract(&player).await.unwrap();

        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].page_url, "http://vshare.eu/embed/ok");
        assert_eq!(blobs[0].blob.first("url480"), Some("http://vshare.eu/vid.mp4"));
    }

    #[tokio::test]
    async fn test_candidate_without_field_is_skipped() {
        let mut pages = HashMap::new();
        pages.insert("http://vshare.eu/embed/empty".to_string(), None);

        let render = Arc::new(SequencedRender {
            pages,
            current: std::sync::Mutex::new(None),
        });
        let extractor = SourceExtractor::new(render);

        let player = player_with(&["http://vshare.eu/embed/empty"]);
        let blobs = extractor.extract(&player).await.unwrap();
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn test_session_loss_propagates() {
        struct DeadRender;

        #[async_trait]
        impl RenderSession for DeadRender {
            async fn navigate(&self, _url: &str) -> Result<(), RenderError> {
                Err(RenderError::Unavailable("browser process exited".into()))
            }

            async fn form_field_value(&self, _name: &str) -> Result<Option<String>, RenderError> {
                Err(RenderError::Unavailable("browser process exited".into()))
            }

            async fn release(&self) -> Result<(), RenderError> {
                Ok(())
            }
        }

        let extractor = SourceExtractor::new(Arc::new(DeadRender));
        let player = player_with(&["http://vshare.eu/embed/abc"]);
        let err = extractor.extract(&player).await.unwrap_err();
        assert!(matches!(err, RenderError::Unavailable(_)));
    }
}
