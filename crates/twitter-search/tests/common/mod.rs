//! Shared test fixtures: an in-memory scraping session.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use twitter_search::config::{Config, Credentials};
use twitter_search::twitter::RawTweet;
use twitter_search::{build_search_client, Scraper, ScraperError, SearchClient, SearchMode, SessionCookie};

/// Token the stub issues on login and accepts on probe.
pub const VALID_TOKEN: &str = "valid-token";

/// Scraping session that never touches the network.
pub struct StubScraper {
    tweets: Vec<RawTweet>,
    fail_login: bool,
    fail_search: bool,
    fail_probe: bool,
    jar: Mutex<Vec<SessionCookie>>,
    pub login_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub last_mode: Mutex<Option<SearchMode>>,
}

impl StubScraper {
    /// Stub whose searches yield `count` tweets.
    pub fn with_tweets(count: usize) -> Self {
        let tweets = (1..=count)
            .map(|i| RawTweet {
                id: Some(i.to_string()),
                text: Some(format!("tweet number {i}")),
                created_at: Some(Utc.with_ymd_and_hms(2025, 1, 17, 6, 0, 0).unwrap()),
                retweets: Some(i as u64),
                likes: Some(10 * i as u64),
            })
            .collect();

        Self {
            tweets,
            fail_login: false,
            fail_search: false,
            fail_probe: false,
            jar: Mutex::new(Vec::new()),
            login_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            last_mode: Mutex::new(None),
        }
    }

    /// Make every login attempt fail.
    pub fn failing_login(mut self) -> Self {
        self.fail_login = true;
        self
    }

    /// Make every search fail after authentication.
    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    /// Make every login-status check fail with an upstream error.
    pub fn failing_probe(mut self) -> Self {
        self.fail_probe = true;
        self
    }

    pub fn logins(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scraper for StubScraper {
    async fn login(&self, credentials: &Credentials) -> Result<(), ScraperError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to interleave.
        tokio::task::yield_now().await;

        if self.fail_login || credentials.password != "correct-password" {
            return Err(ScraperError::LoginFlow("upstream denied the login".into()));
        }

        *self.jar.lock().unwrap() = vec![
            SessionCookie::new("auth_token", VALID_TOKEN, "twitter.com"),
            SessionCookie::new("ct0", "csrf", "twitter.com"),
        ];
        Ok(())
    }

    async fn cookies(&self) -> Vec<SessionCookie> {
        self.jar.lock().unwrap().clone()
    }

    async fn set_cookies(&self, cookies: Vec<SessionCookie>) -> Result<(), ScraperError> {
        *self.jar.lock().unwrap() = cookies;
        Ok(())
    }

    async fn is_logged_in(&self) -> Result<bool, ScraperError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_probe {
            return Err(ScraperError::Status {
                status: 503,
                body: "Service Unavailable".into(),
            });
        }
        Ok(self
            .jar
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.key == "auth_token" && c.value == VALID_TOKEN))
    }

    fn search(
        &self,
        _query: &str,
        max_items: usize,
        mode: SearchMode,
    ) -> BoxStream<'_, Result<RawTweet, ScraperError>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_mode.lock().unwrap() = Some(mode);

        if self.fail_search {
            return stream::once(async {
                Err(ScraperError::Status {
                    status: 429,
                    body: "Rate limit exceeded".into(),
                })
            })
            .boxed();
        }

        stream::iter(self.tweets.clone().into_iter().take(max_items).map(Ok)).boxed()
    }
}

/// Working credentials for the stub.
pub fn credentials() -> Credentials {
    Credentials::from_parts(
        Some("searcher".into()),
        Some("correct-password".into()),
        None,
    )
    .unwrap()
}

/// Config pointing at a cookie file in `dir`.
pub fn config_in(dir: &Path, credentials: Option<Credentials>) -> Config {
    Config {
        credentials,
        cookies_file: dir.join("twitter_cookies.json"),
        ..Config::default()
    }
}

/// Write a cookie file holding one auth token.
pub fn write_cookie_file(path: &Path, token: &str) {
    let cookies = vec![SessionCookie::new("auth_token", token, "twitter.com")];
    std::fs::write(path, serde_json::to_string_pretty(&cookies).unwrap()).unwrap();
}

/// Search client over a stub.
pub fn client_for(config: &Config, stub: &Arc<StubScraper>) -> Arc<SearchClient> {
    build_search_client(config, Arc::clone(stub) as Arc<dyn Scraper>)
}
