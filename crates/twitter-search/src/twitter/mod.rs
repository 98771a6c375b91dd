//! Twitter/X search module.
//!
//! Provides the scraping session abstraction, its HTTP implementation, and
//! the search client built on top of it.

mod client;
mod parser;
mod scraper;
mod search;
mod types;

pub use client::{XScraper, DEFAULT_API_BASE};
pub use parser::{SearchPage, TimelineParser};
pub use scraper::Scraper;
pub use search::SearchClient;
pub use types::{
    format_timestamp, serialize_timestamp, ParseSearchModeError, RawTweet, SearchMode,
    SearchRequest, Tweet, DEFAULT_LIMIT, MAX_LIMIT, MAX_QUERY_CHARS,
};
