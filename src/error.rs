/// Failure taxonomy for the resolution pipeline
///
/// Recoverable conditions (classification mismatch, missing source, transient
/// network) are distinct variants so callers can contain them at the smallest
/// enclosing unit instead of matching on strings.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The page does not carry the "watch here" redirect marker.
    #[error("not a watch-here page: {0}")]
    NotWatchHere(String),

    /// A player page yielded zero allow-listed hosting iframes.
    #[error("no viable hosting iframe on player page: {0}")]
    NoSource(String),

    /// An accepted source URL's host is missing from the bitrate table.
    /// Candidates are filtered against the same table at discovery time, so
    /// this indicates configuration drift, not a flaky page.
    #[error("host {0} is not in the bitrate table")]
    UnknownHost(String),

    /// Request timed out against origin or host.
    #[error("request for {0} timed out")]
    Timeout(String),

    /// Non-success HTTP status after any retry.
    #[error("request for {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Transport-level HTTP failure.
    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ScrapeError {
    /// Classify a reqwest failure for `url`, keeping timeouts distinct.
    pub fn from_request(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(url.to_string())
        } else {
            Self::Http {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// True for failures that skip the current unit without aborting siblings.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::UnknownHost(_) | Self::Render(RenderError::Unavailable(_)))
    }
}

/// Failures of the shared rendering session.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The rendering session could not be provisioned. Fatal for the run.
    #[error("rendering session unavailable: {0}")]
    Unavailable(String),

    #[error("navigation to {0} failed: {1}")]
    Navigation(String, String),

    #[error("rendering {0} timed out after {1}s")]
    Timeout(String, u64),

    #[error("failed to read field from rendered page: {0}")]
    Read(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_host_is_not_recoverable() {
        assert!(!ScrapeError::UnknownHost("cdn.example.com".into()).is_recoverable());
        assert!(ScrapeError::Timeout("http://example.com".into()).is_recoverable());
        assert!(ScrapeError::NoSource("http://example.com/ep1".into()).is_recoverable());
    }

    #[test]
    fn test_render_unavailable_is_fatal() {
        let err = ScrapeError::from(RenderError::Unavailable("no chrome binary".into()));
        assert!(!err.is_recoverable());

        let err = ScrapeError::from(RenderError::Timeout("http://host/embed".into(), 5));
        assert!(err.is_recoverable());
    }
}
