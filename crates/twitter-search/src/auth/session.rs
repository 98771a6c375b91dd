//! Session authentication against the upstream platform.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::Credentials;
use crate::error::AuthError;
use crate::twitter::Scraper;

use super::cookies::CookieStore;

/// How a session was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// Cached cookies passed the login-status probe.
    Cached,
    /// A fresh login was performed and persisted.
    FreshLogin,
}

/// Ensures the scraping session is logged in before each search.
///
/// Cached cookies are authoritative until the login-status probe rejects
/// them. The whole load/probe/login/save sequence runs under one lock, so
/// concurrent requests never race on the cookie file.
pub struct SessionAuthenticator {
    scraper: Arc<dyn Scraper>,
    store: CookieStore,
    credentials: Option<Credentials>,
    lock: Mutex<()>,
}

impl SessionAuthenticator {
    /// Create an authenticator over a scraping session and cookie store.
    pub fn new(
        scraper: Arc<dyn Scraper>,
        store: CookieStore,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            scraper,
            store,
            credentials,
            lock: Mutex::new(()),
        }
    }

    /// Cookie store backing this authenticator.
    pub fn store(&self) -> &CookieStore {
        &self.store
    }

    /// Make sure the session is logged in.
    pub async fn ensure_session(&self) -> Result<bool, AuthError> {
        self.authenticate().await.map(|_| true)
    }

    /// Make sure the session is logged in, reporting how.
    pub async fn authenticate(&self) -> Result<SessionSource, AuthError> {
        let _guard = self.lock.lock().await;

        if self.restore_cached_session().await {
            return Ok(SessionSource::Cached);
        }

        let credentials = self.credentials.as_ref().ok_or_else(|| {
            tracing::error!("No valid cached session and no credentials configured");
            AuthError::MissingCredentials
        })?;

        tracing::info!(username = %credentials.username, "Performing fresh login");
        self.scraper
            .login(credentials)
            .await
            .map_err(AuthError::Login)?;

        let cookies = self.scraper.cookies().await;
        self.store.save(&cookies).await.map_err(AuthError::Persist)?;

        Ok(SessionSource::FreshLogin)
    }

    /// Apply cached cookies and probe them. Any failure counts as "not logged in".
    async fn restore_cached_session(&self) -> bool {
        let Some(cookies) = self.store.load().await else {
            return false;
        };

        if let Err(e) = self.scraper.set_cookies(cookies).await {
            tracing::warn!(error = %e, "Failed to apply cached cookies");
            return false;
        }

        match self.scraper.is_logged_in().await {
            Ok(true) => {
                tracing::debug!(path = %self.store.path().display(), "Cached session is valid");
                true
            }
            Ok(false) => {
                tracing::warn!(path = %self.store.path().display(), "Cached session expired, need to re-authenticate");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to probe cached session");
                false
            }
        }
    }
}
