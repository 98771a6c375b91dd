//! Search client over an authenticated scraping session.

use chrono::Utc;
use futures::StreamExt;
use std::sync::Arc;

use crate::auth::SessionAuthenticator;
use crate::error::SearchError;

use super::scraper::Scraper;
use super::types::{SearchRequest, Tweet};

/// Runs searches, authenticating first.
pub struct SearchClient {
    scraper: Arc<dyn Scraper>,
    authenticator: Arc<SessionAuthenticator>,
}

impl SearchClient {
    /// Create a search client.
    pub fn new(scraper: Arc<dyn Scraper>, authenticator: Arc<SessionAuthenticator>) -> Self {
        Self {
            scraper,
            authenticator,
        }
    }

    /// Authenticator used before each search.
    pub fn authenticator(&self) -> &SessionAuthenticator {
        &self.authenticator
    }

    /// Fetch at most `request.limit` tweets matching `request.query`.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Tweet>, SearchError> {
        self.authenticator.ensure_session().await?;

        tracing::info!(
            query = %request.query,
            limit = request.limit,
            mode = %request.mode,
            "Searching tweets"
        );

        let mut results = self
            .scraper
            .search(&request.query, request.limit, request.mode)
            .take(request.limit);

        let mut tweets = Vec::new();
        while let Some(raw) = results.next().await {
            let tweet = Tweet::from_raw(raw?, Utc::now());
            tracing::debug!(id = %tweet.id, "Captured tweet");
            tweets.push(tweet);
        }

        tracing::info!(query = %request.query, count = tweets.len(), "Search complete");
        Ok(tweets)
    }
}
