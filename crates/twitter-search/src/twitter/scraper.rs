//! Upstream scraping session abstraction.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::auth::SessionCookie;
use crate::config::Credentials;
use crate::error::ScraperError;

use super::types::{RawTweet, SearchMode};

/// An authenticated scraping session against the upstream platform.
///
/// Implementations own the HTTP session emulation: login flow, cookie jar,
/// and search pagination.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Perform a fresh login.
    async fn login(&self, credentials: &Credentials) -> Result<(), ScraperError>;

    /// Current cookies of the session.
    async fn cookies(&self) -> Vec<SessionCookie>;

    /// Replace the session's cookies.
    async fn set_cookies(&self, cookies: Vec<SessionCookie>) -> Result<(), ScraperError>;

    /// Probe whether the current cookies represent a logged-in account.
    async fn is_logged_in(&self) -> Result<bool, ScraperError>;

    /// Lazily page through search results, yielding at most `max_items` tweets.
    fn search(
        &self,
        query: &str,
        max_items: usize,
        mode: SearchMode,
    ) -> BoxStream<'_, Result<RawTweet, ScraperError>>;
}
