//! HTTP scraping session for Twitter/X.
//!
//! Emulates the web client: guest token activation, the onboarding login
//! flow, a cookie jar fed from `Set-Cookie` headers, and cursor pagination
//! over the `SearchTimeline` GraphQL operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::auth::{cookie_header, SessionCookie};
use crate::config::Credentials;
use crate::error::ScraperError;

use super::parser::{SearchPage, TimelineParser};
use super::scraper::Scraper;
use super::types::{RawTweet, SearchMode};

/// Default upstream API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.twitter.com";

/// Public bearer token of the Twitter web client.
const BEARER_TOKEN: &str = "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const GUEST_ACTIVATE_PATH: &str = "/1.1/guest/activate.json";
const LOGIN_FLOW_PATH: &str = "/1.1/onboarding/task.json";
const VERIFY_CREDENTIALS_PATH: &str = "/1.1/account/verify_credentials.json";
const SEARCH_TIMELINE_PATH: &str = "/graphql/gkjsKepM6gl_HmFWoWKfgg/SearchTimeline";

/// Largest page the search endpoint serves.
const PAGE_SIZE: usize = 50;

/// Upper bound on login subtasks before giving up.
const MAX_LOGIN_STEPS: usize = 12;

const SEARCH_FEATURES: &str = r#"{"rweb_lists_timeline_redesign_enabled":true,"responsive_web_graphql_exclude_directive_enabled":true,"verified_phone_label_enabled":false,"creator_subscriptions_tweet_preview_api_enabled":true,"responsive_web_graphql_timeline_navigation_enabled":true,"responsive_web_graphql_skip_user_profile_image_extensions_enabled":false,"tweetypie_unmention_optimization_enabled":true,"responsive_web_edit_tweet_api_enabled":true,"graphql_is_translatable_rweb_tweet_is_translatable_enabled":true,"view_counts_everywhere_api_enabled":true,"longform_notetweets_consumption_enabled":true,"responsive_web_twitter_article_tweet_consumption_enabled":false,"tweet_awards_web_tipping_enabled":false,"freedom_of_speech_not_reach_fetch_enabled":true,"standardized_nudges_misinfo":true,"tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled":true,"longform_notetweets_rich_text_read_enabled":true,"longform_notetweets_inline_media_enabled":true,"responsive_web_media_download_video_enabled":false,"responsive_web_enhance_cards_enabled":false}"#;

const FIELD_TOGGLES: &str = r#"{"withArticleRichContentState":false}"#;

#[derive(Debug, Deserialize)]
struct FlowResponse {
    flow_token: Option<String>,
    status: Option<String>,
    #[serde(default)]
    subtasks: Vec<FlowSubtask>,
    #[serde(default)]
    errors: Vec<UpstreamMessage>,
}

#[derive(Debug, Deserialize)]
struct FlowSubtask {
    subtask_id: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamMessage {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// Pagination state of a running search.
struct Pager {
    cursor: Option<String>,
    remaining: usize,
    done: bool,
}

/// Scraping session that talks to the upstream API over `reqwest`.
pub struct XScraper {
    http: reqwest::Client,
    api_base: String,
    host: String,
    jar: RwLock<Vec<SessionCookie>>,
    guest_token: RwLock<Option<String>>,
}

impl XScraper {
    /// Create a session against `api_base` (e.g. [`DEFAULT_API_BASE`]).
    pub fn new(api_base: &str) -> Result<Self, ScraperError> {
        let api_base = api_base.trim_end_matches('/').to_string();
        let url = reqwest::Url::parse(&api_base)
            .map_err(|e| ScraperError::InvalidBaseUrl(format!("{api_base}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| ScraperError::InvalidBaseUrl(format!("{api_base}: missing host")))?
            .to_ascii_lowercase();

        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            http,
            api_base,
            host,
            jar: RwLock::new(Vec::new()),
            guest_token: RwLock::new(None),
        })
    }

    /// Build a request carrying the session's auth headers and cookies.
    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let now = Utc::now();
        let mut request = self
            .http
            .request(method, format!("{}{path}", self.api_base))
            .bearer_auth(BEARER_TOKEN)
            .header("x-twitter-active-user", "yes")
            .header("x-twitter-client-language", "en");

        let jar = self.jar.read().await;
        if let Some(header) = cookie_header(&jar, &self.host, path, now) {
            request = request.header(COOKIE, header);
        }
        if let Some(ct0) = live_cookie(&jar, "ct0", now) {
            request = request.header("x-csrf-token", ct0.value.clone());
        }

        if live_cookie(&jar, "auth_token", now).is_some() {
            request = request.header("x-twitter-auth-type", "OAuth2Session");
        } else if let Some(token) = self.guest_token.read().await.as_deref() {
            request = request.header("x-guest-token", token);
        }

        request
    }

    /// Send a request, absorb its cookies, and decode the JSON body.
    async fn send_json(&self, request: RequestBuilder) -> Result<Value, ScraperError> {
        let response = request.send().await?;
        self.absorb_cookies(&response).await;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Upstream request failed");
            return Err(ScraperError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn absorb_cookies(&self, response: &Response) {
        let now = Utc::now();
        let host = response
            .url()
            .host_str()
            .map_or_else(|| self.host.clone(), str::to_ascii_lowercase);

        let mut jar = self.jar.write().await;
        for value in response.headers().get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            match SessionCookie::from_set_cookie(raw, &host, now) {
                Ok(cookie) => {
                    jar.retain(|existing| !existing.same_slot(&cookie));
                    if !cookie.is_expired(now) {
                        jar.push(cookie);
                    }
                }
                Err(e) => tracing::debug!(error = %e, "Skipping unparsable Set-Cookie header"),
            }
        }
    }

    async fn activate_guest(&self) -> Result<(), ScraperError> {
        let request = self.request(Method::POST, GUEST_ACTIVATE_PATH).await;
        let body = self.send_json(request).await?;
        let token = body
            .get("guest_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ScraperError::UnexpectedResponse("guest activation returned no guest_token".into())
            })?;

        tracing::debug!("Activated guest token");
        *self.guest_token.write().await = Some(token.to_string());
        Ok(())
    }

    async fn execute_flow(
        &self,
        query: &[(&str, &str)],
        body: Value,
    ) -> Result<FlowResponse, ScraperError> {
        let request = self
            .request(Method::POST, LOGIN_FLOW_PATH)
            .await
            .query(query)
            .json(&body);
        let flow: FlowResponse = serde_json::from_value(self.send_json(request).await?)?;

        if !flow.errors.is_empty() {
            let messages: Vec<String> = flow
                .errors
                .iter()
                .map(|e| match e.code {
                    Some(code) => format!("({code}) {}", e.message),
                    None => e.message.clone(),
                })
                .collect();
            return Err(ScraperError::LoginFlow(messages.join("; ")));
        }
        if flow.status.as_deref() == Some("failed") {
            return Err(ScraperError::LoginFlow(
                "upstream reported the login flow as failed".into(),
            ));
        }

        Ok(flow)
    }

    async fn fetch_search_page(
        &self,
        query: &str,
        count: usize,
        mode: SearchMode,
        cursor: Option<&str>,
    ) -> Result<SearchPage, ScraperError> {
        let mut variables = json!({
            "rawQuery": query,
            "count": count,
            "querySource": "typed_query",
            "product": mode.product(),
        });
        if let Some(cursor) = cursor {
            variables["cursor"] = json!(cursor);
        }

        let request = self
            .request(Method::GET, SEARCH_TIMELINE_PATH)
            .await
            .query(&[
                ("variables", variables.to_string()),
                ("features", SEARCH_FEATURES.to_string()),
                ("fieldToggles", FIELD_TOGGLES.to_string()),
            ]);

        let body = self.send_json(request).await?;
        if body.get("data").is_none() {
            if let Some(errors) = body.get("errors") {
                return Err(ScraperError::UnexpectedResponse(errors.to_string()));
            }
        }

        Ok(TimelineParser::parse(&body))
    }
}

fn live_cookie<'a>(
    jar: &'a [SessionCookie],
    key: &str,
    now: DateTime<Utc>,
) -> Option<&'a SessionCookie> {
    jar.iter().find(|c| c.key == key && !c.is_expired(now))
}

#[async_trait]
impl Scraper for XScraper {
    async fn login(&self, credentials: &Credentials) -> Result<(), ScraperError> {
        tracing::info!(username = %credentials.username, "Starting login flow");

        self.jar.write().await.clear();
        self.activate_guest().await?;

        let mut flow = self
            .execute_flow(
                &[("flow_name", "login")],
                json!({
                    "flow_token": null,
                    "input_flow_data": {
                        "flow_context": {
                            "debug_overrides": {},
                            "start_location": {"location": "splash_screen"}
                        }
                    }
                }),
            )
            .await?;

        for _ in 0..MAX_LOGIN_STEPS {
            let subtask = flow
                .subtasks
                .first()
                .map(|s| s.subtask_id.as_str())
                .ok_or_else(|| {
                    ScraperError::LoginFlow("flow ended before LoginSuccessSubtask".into())
                })?;
            tracing::debug!(subtask, "Handling login subtask");

            let input = match subtask {
                "LoginSuccessSubtask" => {
                    if live_cookie(&self.jar.read().await, "auth_token", Utc::now()).is_none() {
                        return Err(ScraperError::LoginFlow(
                            "login completed without an auth_token cookie".into(),
                        ));
                    }
                    tracing::info!(username = %credentials.username, "Login flow completed");
                    return Ok(());
                }
                "LoginJsInstrumentationSubtask" => json!({
                    "subtask_id": subtask,
                    "js_instrumentation": {"response": "{}", "link": "next_link"}
                }),
                "LoginEnterUserIdentifierSSO" => json!({
                    "subtask_id": subtask,
                    "settings_list": {
                        "setting_responses": [{
                            "key": "user_identifier",
                            "response_data": {"text_data": {"result": credentials.username}}
                        }],
                        "link": "next_link"
                    }
                }),
                "LoginEnterPassword" => json!({
                    "subtask_id": subtask,
                    "enter_password": {"password": credentials.password, "link": "next_link"}
                }),
                "AccountDuplicationCheck" => json!({
                    "subtask_id": subtask,
                    "check_logged_in_account": {"link": "AccountDuplicationCheck_false"}
                }),
                "LoginEnterAlternateIdentifierSubtask" | "LoginAcid" => {
                    let email = credentials.email.as_deref().ok_or_else(|| {
                        ScraperError::LoginFlow(format!(
                            "{subtask} requires an email; set TWITTER_EMAIL"
                        ))
                    })?;
                    json!({
                        "subtask_id": subtask,
                        "enter_text": {"text": email, "link": "next_link"}
                    })
                }
                "DenyLoginSubtask" => {
                    return Err(ScraperError::LoginFlow("upstream denied the login".into()));
                }
                other => {
                    return Err(ScraperError::LoginFlow(format!(
                        "unsupported login subtask: {other}"
                    )));
                }
            };

            let flow_token = flow
                .flow_token
                .clone()
                .ok_or_else(|| ScraperError::LoginFlow("flow response had no flow_token".into()))?;

            flow = self
                .execute_flow(
                    &[],
                    json!({"flow_token": flow_token, "subtask_inputs": [input]}),
                )
                .await?;
        }

        Err(ScraperError::LoginFlow(format!(
            "login did not complete within {MAX_LOGIN_STEPS} steps"
        )))
    }

    async fn cookies(&self) -> Vec<SessionCookie> {
        self.jar.read().await.clone()
    }

    async fn set_cookies(&self, cookies: Vec<SessionCookie>) -> Result<(), ScraperError> {
        let now = Utc::now();
        let live: Vec<SessionCookie> = cookies.into_iter().filter(|c| !c.is_expired(now)).collect();
        tracing::debug!(count = live.len(), "Applied session cookies");
        *self.jar.write().await = live;
        Ok(())
    }

    async fn is_logged_in(&self) -> Result<bool, ScraperError> {
        if live_cookie(&self.jar.read().await, "auth_token", Utc::now()).is_none() {
            return Ok(false);
        }

        let request = self.request(Method::GET, VERIFY_CREDENTIALS_PATH).await;
        match self.send_json(request).await {
            Ok(body) => Ok(body.get("errors").is_none()),
            Err(ScraperError::Status {
                status: 401 | 403, ..
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn search(
        &self,
        query: &str,
        max_items: usize,
        mode: SearchMode,
    ) -> BoxStream<'_, Result<RawTweet, ScraperError>> {
        let query = query.to_string();
        let start = Pager {
            cursor: None,
            remaining: max_items,
            done: max_items == 0,
        };

        stream::unfold(start, move |mut pager| {
            let query = query.clone();
            async move {
                if pager.done {
                    return None;
                }

                let count = pager.remaining.min(PAGE_SIZE);
                let batch = match self
                    .fetch_search_page(&query, count, mode, pager.cursor.as_deref())
                    .await
                {
                    Ok(page) => {
                        let next = page
                            .next_cursor
                            .filter(|c| pager.cursor.as_ref() != Some(c));
                        let tweets: Vec<_> = page
                            .tweets
                            .into_iter()
                            .take(pager.remaining)
                            .map(Ok)
                            .collect();
                        pager.remaining -= tweets.len();
                        pager.done = tweets.is_empty() || pager.remaining == 0 || next.is_none();
                        pager.cursor = next;
                        tweets
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Search page request failed");
                        pager.done = true;
                        vec![Err(e)]
                    }
                };

                Some((stream::iter(batch), pager))
            }
        })
        .flatten()
        .boxed()
    }
}
