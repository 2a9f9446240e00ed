/// Page parsing module
///
/// Each page variant owns its own parsed content: listing pages yield episode
/// descriptors, detail pages resolve the watch-here redirect, player pages
/// discover hosting iframe candidates.

pub mod detail;
pub mod listing;
pub mod player;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Episode number with optional range end for double episodes ("15-16").
///
/// Orders by the primary number first; content ids use the primary number
/// only, the range end survives into display and catalog records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeNumber {
    pub num: u32,
    pub range_end: Option<u32>,
}

impl EpisodeNumber {
    pub fn new(num: u32) -> Self {
        Self {
            num,
            range_end: None,
        }
    }

    pub fn range(num: u32, end: u32) -> Self {
        Self {
            num,
            range_end: Some(end),
        }
    }
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range_end {
            Some(end) => write!(f, "{}-{}", self.num, end),
            None => write!(f, "{}", self.num),
        }
    }
}

/// A single episode parsed from a show's listing page.
///
/// Created unfinalized by the listing parser, enriched in place by detail
/// resolution, terminal once source extraction has been attempted. An empty
/// source list is a valid terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub season: u32,
    pub number: EpisodeNumber,
    pub title: String,
    pub description: Option<String>,
    pub detail_url: String,
    pub duration: Option<String>,
    pub thumbnail: Option<String>,
    pub sources: Vec<Source>,
}

impl Episode {
    pub fn new(season: u32, number: EpisodeNumber, title: String, detail_url: String) -> Self {
        Self {
            season,
            number,
            title,
            description: None,
            detail_url,
            duration: None,
            thumbnail: None,
            sources: Vec::new(),
        }
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{} E{}: {}", self.season, self.number, self.title)
    }
}

/// One playable source resolved for an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Resolved playable URL: recognized video extension, query string stripped
    pub url: String,

    /// Bandwidth tier of the URL's host
    pub bitrate: u32,

    pub thumbnail: Option<String>,
    pub duration: Option<String>,
}
