//! Search data types.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Default number of results per search.
pub const DEFAULT_LIMIT: usize = 100;

/// Largest accepted result limit.
pub const MAX_LIMIT: usize = 500;

/// Longest accepted query, in characters.
pub const MAX_QUERY_CHARS: usize = 500;

/// Ranking of search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Most recent first.
    #[default]
    Latest,
    /// Most relevant first.
    Top,
}

impl SearchMode {
    /// Value of the `product` variable in the upstream search call.
    #[must_use]
    pub fn product(self) -> &'static str {
        match self {
            Self::Latest => "Latest",
            Self::Top => "Top",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.product())
    }
}

/// Error for an unrecognised search mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid enum value. Expected 'Latest' | 'Top', received '{0}'")]
pub struct ParseSearchModeError(pub String);

impl FromStr for SearchMode {
    type Err = ParseSearchModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Latest" => Ok(Self::Latest),
            "Top" => Ok(Self::Top),
            other => Err(ParseSearchModeError(other.to_string())),
        }
    }
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Raw query string, passed to upstream unchanged.
    pub query: String,
    /// Maximum number of results.
    pub limit: usize,
    /// Result ranking.
    pub mode: SearchMode,
}

impl SearchRequest {
    /// Create a request with the default limit and mode.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_LIMIT,
            mode: SearchMode::default(),
        }
    }

    /// Set the result limit.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the ranking mode.
    #[must_use]
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }
}

/// A tweet as extracted from an upstream page, before normalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTweet {
    /// Tweet ID.
    pub id: Option<String>,
    /// Full text.
    pub text: Option<String>,
    /// When the tweet was posted.
    pub created_at: Option<DateTime<Utc>>,
    /// Retweet count.
    pub retweets: Option<u64>,
    /// Like count.
    pub likes: Option<u64>,
}

/// A normalised search result returned to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    /// Tweet ID.
    pub id: String,
    /// Full text.
    pub text: String,
    /// When the tweet was posted.
    #[serde(serialize_with = "serialize_opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Retweet count.
    pub retweets: u64,
    /// Like count.
    pub likes: u64,
    /// When this service fetched the tweet.
    #[serde(serialize_with = "serialize_timestamp")]
    pub fetch_time: DateTime<Utc>,
}

impl Tweet {
    /// Normalise a raw tweet, stamping the fetch time.
    #[must_use]
    pub fn from_raw(raw: RawTweet, fetch_time: DateTime<Utc>) -> Self {
        Self {
            id: raw.id.unwrap_or_default(),
            text: raw.text.unwrap_or_default(),
            created_at: raw.created_at,
            retweets: raw.retweets.unwrap_or_default(),
            likes: raw.likes.unwrap_or_default(),
            fetch_time,
        }
    }
}

/// Format a timestamp as RFC 3339 with millisecond precision.
#[must_use]
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serialize a timestamp with [`format_timestamp`].
pub fn serialize_timestamp<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(at))
}

#[allow(clippy::ref_option)]
fn serialize_opt_timestamp<S: Serializer>(
    at: &Option<DateTime<Utc>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match at {
        Some(at) => serialize_timestamp(at, s),
        None => s.serialize_none(),
    }
}
