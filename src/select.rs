/// Quality-preference selection over extracted parameter blobs.
use std::collections::BTreeMap;
use url::Url;

use crate::error::ScrapeError;
use crate::extract::ParamBlob;
use crate::pages::Source;

/// File-quality fields in strict precedence order, highest resolution first.
pub const FILE_FIELDS: [&str; 6] = ["file", "url1080", "url720", "url480", "url360", "url240"];

/// Thumbnail fields. Order is fixed for determinism but carries no quality
/// meaning.
pub const IMAGE_FIELDS: [&str; 3] = ["image", "jpg", "jpeg"];

pub const DURATION_FIELD: &str = "duration";

/// Extensions accepted as playable video files.
const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "m4v", "webm"];

/// Applies the fixed quality-preference policy and classifies the accepted
/// URL's host into a bandwidth tier.
pub struct SourceSelector {
    hosts: BTreeMap<String, u32>,
}

impl SourceSelector {
    pub fn new(hosts: BTreeMap<String, u32>) -> Self {
        Self { hosts }
    }

    /// Pick at most one playable source from a blob.
    ///
    /// Walks the quality fields in precedence order and accepts the first
    /// value that, with its query string stripped, carries a recognized
    /// video extension. A blob yielding nothing is a valid outcome. A host
    /// missing from the bitrate table is an invariant violation: candidates
    /// were filtered against the same table at discovery time.
    pub fn select(&self, blob: &ParamBlob) -> Result<Option<Source>, ScrapeError> {
        for field in FILE_FIELDS {
            let Some(value) = blob.first(field) else {
                continue;
            };

            let Some(clean) = strip_query(value) else {
                continue;
            };

            if !has_video_extension(&clean) {
                continue;
            }

            let bitrate = self.classify(&clean)?;
            return Ok(Some(Source {
                url: clean,
                bitrate,
                thumbnail: self.pick_thumbnail(blob),
                duration: blob.first(DURATION_FIELD).map(str::to_string),
            }));
        }

        Ok(None)
    }

    /// Bandwidth tier for the URL's host.
    pub fn classify(&self, url: &str) -> Result<u32, ScrapeError> {
        let host = crate::text::host_of(url)
            .ok_or_else(|| ScrapeError::UnknownHost(url.to_string()))?;
        self.hosts
            .get(&host)
            .copied()
            .ok_or(ScrapeError::UnknownHost(host))
    }

    fn pick_thumbnail(&self, blob: &ParamBlob) -> Option<String> {
        IMAGE_FIELDS
            .iter()
            .find_map(|field| blob.first(field))
            .map(str::to_string)
    }
}

/// Drop query string and fragment, keeping scheme, host and path.
fn strip_query(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

fn has_video_extension(url: &str) -> bool {
    VIDEO_EXTENSIONS
        .iter()
        .any(|ext| url.ends_with(&format!(".{ext}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ParamBlob;

    fn selector() -> SourceSelector {
        let hosts = [("host".to_string(), 1100), ("vshare.eu".to_string(), 750)]
            .into_iter()
            .collect();
        SourceSelector::new(hosts)
    }

    #[test]
    fn test_highest_quality_wins_and_query_stripped() {
        let blob = ParamBlob::parse("url720=http://host/vid.mp4?x=1&url480=http://host/lo.mp4");
        let source = selector().select(&blob).unwrap().unwrap();

        assert_eq!(source.url, "http://host/vid.mp4");
        assert_eq!(source.bitrate, 1100);
    }

    #[test]
    fn test_precedence_not_scan_order() {
        // lower tier listed first in the raw string; precedence still decides
        let blob = ParamBlob::parse("url240=http://host/tiny.mp4&url1080=http://host/big.mp4");
        let source = selector().select(&blob).unwrap().unwrap();
        assert_eq!(source.url, "http://host/big.mp4");
    }

    #[test]
    fn test_unrecognized_extension_yields_no_source() {
        let blob = ParamBlob::parse("file=http://host/page.html");
        assert!(selector().select(&blob).unwrap().is_none());
    }

    #[test]
    fn test_unacceptable_field_does_not_block_lower_tiers() {
        let blob = ParamBlob::parse("file=http://host/page.html&url480=http://host/lo.mp4");
        let source = selector().select(&blob).unwrap().unwrap();
        assert_eq!(source.url, "http://host/lo.mp4");
    }

    #[test]
    fn test_empty_blob_yields_no_source() {
        let blob = ParamBlob::parse("");
        assert!(selector().select(&blob).unwrap().is_none());
    }

    #[test]
    fn test_selection_is_idempotent() {
        let blob = ParamBlob::parse("url720=http://host/vid.mp4?x=1&image=http://host/t.jpg");
        let first = selector().select(&blob).unwrap().unwrap();
        let second = selector().select(&blob).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_host_is_invariant_violation() {
        let blob = ParamBlob::parse("file=http://unlisted.example/vid.mp4");
        let err = selector().select(&blob).unwrap_err();
        assert!(matches!(err, ScrapeError::UnknownHost(_)));
    }

    #[test]
    fn test_thumbnail_and_duration_carried() {
        let blob = ParamBlob::parse(
            "url480=http://vshare.eu/vid.mp4&jpg=http://vshare.eu/thumb.jpg&duration=1326",
        );
        let source = selector().select(&blob).unwrap().unwrap();

        assert_eq!(source.bitrate, 750);
        assert_eq!(source.thumbnail.as_deref(), Some("http://vshare.eu/thumb.jpg"));
        assert_eq!(source.duration.as_deref(), Some("1326"));
    }

    #[test]
    fn test_strip_query_keeps_path() {
        assert_eq!(
            strip_query("http://host/a/vid.mp4?token=1#t=30").as_deref(),
            Some("http://host/a/vid.mp4")
        );
        assert_eq!(strip_query("not a url"), None);
    }
}
