//! Session cookies and their on-disk store.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ScraperError;

/// Default cookie file, relative to the working directory.
pub const DEFAULT_COOKIES_FILE: &str = "twitter_cookies.json";

/// One stored cookie of an authenticated upstream session.
///
/// Field names follow the camelCase layout of the cookie file so that files
/// written by earlier deployments keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    /// Cookie name.
    pub key: String,
    /// Cookie value.
    pub value: String,
    /// Domain the cookie is scoped to (no leading dot).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Path the cookie is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Only sent over HTTPS.
    #[serde(default)]
    pub secure: bool,
    /// Not visible to scripts.
    #[serde(default)]
    pub http_only: bool,
    /// Absolute expiry, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Max-Age in seconds as sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    /// SameSite policy as sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl SessionCookie {
    /// Create a session cookie scoped to a domain with path `/`.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            domain: Some(domain.into()),
            path: Some("/".to_string()),
            secure: true,
            http_only: false,
            expires: None,
            max_age: None,
            same_site: None,
        }
    }

    /// Parse a `Set-Cookie` header received from `request_host`.
    ///
    /// Cookies without a Domain attribute are scoped to the request host.
    /// Max-Age takes precedence over Expires.
    pub fn from_set_cookie(
        header: &str,
        request_host: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, ScraperError> {
        let parsed = cookie::Cookie::parse(header)
            .map_err(|e| ScraperError::InvalidCookie(format!("{e}: {header}")))?;

        let max_age = parsed.max_age().map(|d| d.whole_seconds());
        let expires = match max_age {
            Some(secs) => TimeDelta::try_seconds(secs).and_then(|d| now.checked_add_signed(d)),
            None => parsed
                .expires_datetime()
                .and_then(|at| DateTime::from_timestamp(at.unix_timestamp(), 0)),
        };

        let domain = parsed
            .domain()
            .map(|d| d.trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| request_host.to_ascii_lowercase());

        Ok(Self {
            key: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain: Some(domain),
            path: Some(parsed.path().unwrap_or("/").to_string()),
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            expires,
            max_age,
            same_site: parsed.same_site().map(|s| s.to_string().to_lowercase()),
        })
    }

    /// Whether the cookie has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    /// Whether the cookie should be sent with a request to `host` and `path`.
    #[must_use]
    pub fn matches(&self, host: &str, path: &str) -> bool {
        let domain_ok = match self.domain.as_deref().map(|d| d.trim_start_matches('.')) {
            None | Some("") => true,
            Some(domain) => {
                host.eq_ignore_ascii_case(domain)
                    || host
                        .to_ascii_lowercase()
                        .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
            }
        };
        let path_ok = path.starts_with(self.path.as_deref().unwrap_or("/"));
        domain_ok && path_ok
    }

    /// Whether two cookies occupy the same slot in a jar.
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        self.key == other.key
            && self.domain.as_deref().map(|d| d.trim_start_matches('.'))
                == other.domain.as_deref().map(|d| d.trim_start_matches('.'))
            && self.path.as_deref().unwrap_or("/") == other.path.as_deref().unwrap_or("/")
    }
}

/// Build a `Cookie` header value for a request, skipping expired cookies.
#[must_use]
pub fn cookie_header(
    cookies: &[SessionCookie],
    host: &str,
    path: &str,
    now: DateTime<Utc>,
) -> Option<String> {
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|c| !c.is_expired(now) && c.matches(host, path))
        .map(|c| format!("{}={}", c.key, c.value))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// Local JSON file holding the cookies of the last authenticated session.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    /// Create a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached session.
    ///
    /// A missing or unparsable file yields `None`.
    pub async fn load(&self) -> Option<Vec<SessionCookie>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No cached session file");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read session file");
                return None;
            }
        };

        match serde_json::from_str::<Vec<SessionCookie>>(&content) {
            Ok(cookies) => {
                tracing::debug!(path = %self.path.display(), count = cookies.len(), "Loaded cached session");
                Some(cookies)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unparsable session file");
                None
            }
        }
    }

    /// Overwrite the cached session.
    ///
    /// Writes a sibling `.tmp` file and renames it over the target.
    pub async fn save(&self, cookies: &[SessionCookie]) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(cookies).map_err(std::io::Error::other)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut temp = self.path.as_os_str().to_owned();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        tokio::fs::write(&temp, content).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }

        tracing::info!(path = %self.path.display(), count = cookies.len(), "Saved session cookies");
        Ok(())
    }
}
