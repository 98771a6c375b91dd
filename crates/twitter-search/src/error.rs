//! Error types for the search service.

use thiserror::Error;

/// Errors raised by an upstream scraping session.
#[derive(Debug, Error)]
pub enum ScraperError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The login flow could not be completed
    #[error("Login flow failed: {0}")]
    LoginFlow(String),

    /// Upstream payload did not have the expected shape
    #[error("Unexpected upstream response: {0}")]
    UnexpectedResponse(String),

    /// The configured upstream base URL is unusable
    #[error("Invalid upstream base URL: {0}")]
    InvalidBaseUrl(String),

    /// A cookie could not be parsed or applied
    #[error("Invalid cookie: {0}")]
    InvalidCookie(String),
}

/// Errors raised while establishing an authenticated session.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No usable cached session and no credentials configured
    #[error("Twitter credentials not found in environment variables")]
    MissingCredentials,

    /// Upstream rejected the login
    #[error("Login failed: {0}")]
    Login(#[source] ScraperError),

    /// The fresh session could not be written to the cookie file
    #[error("Failed to persist session cookies: {0}")]
    Persist(#[source] std::io::Error),
}

/// Errors raised by a search request after validation.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Authentication failed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Upstream failed while fetching results
    #[error("Search failed: {0}")]
    Upstream(#[from] ScraperError),
}
