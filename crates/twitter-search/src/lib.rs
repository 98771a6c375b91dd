//! Twitter/X search service.
//!
//! This crate provides:
//! - A scraping session for Twitter/X (login flow, cookie jar, paginated search)
//! - Session cookie persistence with cached-session reuse
//! - A validated `GET /api/search` JSON endpoint
//! - Harvest files for one-off searches

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod server;
pub mod twitter;

use std::sync::Arc;

// Re-export main types
pub use auth::{CookieStore, SessionAuthenticator, SessionCookie, SessionSource};
pub use config::{Config, Credentials};
pub use error::{AuthError, ScraperError, SearchError};
pub use twitter::{Scraper, SearchClient, SearchMode, SearchRequest, Tweet, XScraper};

/// Wire a search client over `scraper` using the cookie file and credentials in `config`.
pub fn build_search_client(config: &Config, scraper: Arc<dyn Scraper>) -> Arc<SearchClient> {
    let authenticator = Arc::new(SessionAuthenticator::new(
        Arc::clone(&scraper),
        CookieStore::new(&config.cookies_file),
        config.credentials.clone(),
    ));
    Arc::new(SearchClient::new(scraper, authenticator))
}
