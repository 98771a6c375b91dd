//! Integration tests for the reqwest scraping session against a mock upstream.

mod common;

use futures::StreamExt;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use twitter_search::{Scraper, ScraperError, SearchMode, SessionCookie, XScraper};

const FLOW_PATH: &str = "/1.1/onboarding/task.json";
const VERIFY_PATH: &str = "/1.1/account/verify_credentials.json";
const SEARCH_PATH: &str = "/graphql/gkjsKepM6gl_HmFWoWKfgg/SearchTimeline";

/// Matches search requests by the `cursor` and `product` inside `variables`.
struct SearchVariables {
    cursor: Option<&'static str>,
    product: &'static str,
}

impl Match for SearchVariables {
    fn matches(&self, request: &Request) -> bool {
        let Some((_, raw)) = request.url.query_pairs().find(|(k, _)| k == "variables") else {
            return false;
        };
        let Ok(variables) = serde_json::from_str::<Value>(&raw) else {
            return false;
        };
        variables.get("cursor").and_then(Value::as_str) == self.cursor
            && variables.get("product").and_then(Value::as_str) == Some(self.product)
    }
}

fn latest(cursor: Option<&'static str>) -> SearchVariables {
    SearchVariables {
        cursor,
        product: "Latest",
    }
}

fn flow(token: &str, subtask: &str) -> Value {
    json!({
        "flow_token": token,
        "status": "success",
        "subtasks": [{"subtask_id": subtask}]
    })
}

fn search_page(ids: &[&str], cursor: Option<&str>) -> Value {
    let mut entries: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "entryId": format!("tweet-{id}"),
                "content": {
                    "entryType": "TimelineTimelineItem",
                    "itemContent": {
                        "tweet_results": {"result": {
                            "rest_id": id,
                            "legacy": {
                                "full_text": format!("text of {id}"),
                                "created_at": "Wed Oct 10 20:19:24 +0000 2018",
                                "retweet_count": 3,
                                "favorite_count": 7
                            }
                        }}
                    }
                }
            })
        })
        .collect();
    if let Some(cursor) = cursor {
        entries.push(json!({
            "entryId": "cursor-bottom-0",
            "content": {"cursorType": "Bottom", "value": cursor}
        }));
    }

    json!({"data": {"search_by_raw_query": {"search_timeline": {"timeline": {
        "instructions": [{"type": "TimelineAddEntries", "entries": entries}]
    }}}}})
}

async fn mount_guest_activation(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/1.1/guest/activate.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"guest_token": "g-1"})))
        .expect(1)
        .mount(server)
        .await;
}

async fn logged_in_scraper(server: &MockServer) -> XScraper {
    let scraper = XScraper::new(&server.uri()).unwrap();
    scraper
        .set_cookies(vec![
            SessionCookie::new("auth_token", "tok", "127.0.0.1"),
            SessionCookie::new("ct0", "csrf-1", "127.0.0.1"),
        ])
        .await
        .unwrap();
    scraper
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn rejects_unusable_base_url() {
    let err = XScraper::new("not a url").err().unwrap();
    assert!(matches!(err, ScraperError::InvalidBaseUrl(_)));
}

// =============================================================================
// Login flow
// =============================================================================

#[tokio::test]
async fn login_walks_the_flow_and_keeps_cookies() {
    let server = MockServer::start().await;
    mount_guest_activation(&server).await;

    Mock::given(method("POST"))
        .and(path(FLOW_PATH))
        .and(query_param("flow_name", "login"))
        .and(header("x-guest-token", "g-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(flow("f1", "LoginJsInstrumentationSubtask")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FLOW_PATH))
        .and(body_partial_json(json!({"flow_token": "f1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(flow("f2", "LoginEnterUserIdentifierSSO")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FLOW_PATH))
        .and(body_partial_json(json!({"flow_token": "f2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(flow("f3", "LoginEnterPassword")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FLOW_PATH))
        .and(body_partial_json(json!({"flow_token": "f3"})))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "auth_token=tok-123; Path=/; Secure; HttpOnly")
                .append_header("set-cookie", "ct0=csrf-123; Path=/; Secure")
                .set_body_json(flow("f4", "LoginSuccessSubtask")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .and(header("x-twitter-auth-type", "OAuth2Session"))
        .and(header("x-csrf-token", "csrf-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"screen_name": "searcher"})))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = XScraper::new(&server.uri()).unwrap();
    scraper.login(&common::credentials()).await.unwrap();

    let cookies = scraper.cookies().await;
    let auth = cookies.iter().find(|c| c.key == "auth_token").unwrap();
    assert_eq!(auth.value, "tok-123");
    assert!(auth.http_only);
    assert!(cookies.iter().any(|c| c.key == "ct0" && c.value == "csrf-123"));

    assert!(scraper.is_logged_in().await.unwrap());
}

#[tokio::test]
async fn denied_login_is_an_error() {
    let server = MockServer::start().await;
    mount_guest_activation(&server).await;

    Mock::given(method("POST"))
        .and(path(FLOW_PATH))
        .and(query_param("flow_name", "login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(flow("f1", "DenyLoginSubtask")))
        .mount(&server)
        .await;

    let scraper = XScraper::new(&server.uri()).unwrap();
    let err = scraper.login(&common::credentials()).await.unwrap_err();

    assert!(matches!(err, ScraperError::LoginFlow(_)));
    assert!(scraper.cookies().await.is_empty());
}

#[tokio::test]
async fn flow_errors_are_reported() {
    let server = MockServer::start().await;
    mount_guest_activation(&server).await;

    Mock::given(method("POST"))
        .and(path(FLOW_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"code": 399, "message": "Incorrect. Please try again."}]
        })))
        .mount(&server)
        .await;

    let scraper = XScraper::new(&server.uri()).unwrap();
    let err = scraper.login(&common::credentials()).await.unwrap_err();

    assert!(err.to_string().contains("(399) Incorrect"));
}

// =============================================================================
// Login-status probe
// =============================================================================

#[tokio::test]
async fn probe_without_auth_token_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let scraper = XScraper::new(&server.uri()).unwrap();
    scraper
        .set_cookies(vec![SessionCookie::new("ct0", "csrf", "127.0.0.1")])
        .await
        .unwrap();

    assert!(!scraper.is_logged_in().await.unwrap());
}

#[tokio::test]
async fn rejected_probe_means_logged_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{"code": 32, "message": "Could not authenticate you."}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = logged_in_scraper(&server).await;
    assert!(!scraper.is_logged_in().await.unwrap());
}

#[tokio::test]
async fn probe_server_error_is_propagated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let scraper = logged_in_scraper(&server).await;
    let err = scraper.is_logged_in().await.unwrap_err();
    assert!(matches!(err, ScraperError::Status { status: 503, .. }));
}

// =============================================================================
// Search pagination
// =============================================================================

#[tokio::test]
async fn search_follows_cursors_until_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(latest(None))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(search_page(&["1", "2"], Some("C1"))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(latest(Some("C1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(search_page(&["3", "4"], Some("C2"))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(latest(Some("C2")))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(&["5"], None)))
        .expect(0)
        .mount(&server)
        .await;

    let scraper = logged_in_scraper(&server).await;
    let results: Vec<_> = scraper.search("rust", 3, SearchMode::Latest).collect().await;

    let ids: Vec<String> = results
        .into_iter()
        .map(|r| r.unwrap().id.unwrap())
        .collect();
    assert_eq!(ids, ["1", "2", "3"]);
}

#[tokio::test]
async fn search_stops_on_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(latest(None))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(search_page(&["1", "2"], Some("C1"))),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(latest(Some("C1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(&[], Some("C2"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(latest(Some("C2")))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(&["9"], None)))
        .expect(0)
        .mount(&server)
        .await;

    let scraper = logged_in_scraper(&server).await;
    let results: Vec<_> = scraper.search("rust", 100, SearchMode::Latest).collect().await;

    assert_eq!(results.len(), 2);
    let first = results[0].as_ref().unwrap();
    assert_eq!(first.text.as_deref(), Some("text of 1"));
    assert_eq!(first.retweets, Some(3));
    assert_eq!(first.likes, Some(7));
    assert!(first.created_at.is_some());
}

#[tokio::test]
async fn search_stops_on_repeated_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(latest(None))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(&["1"], Some("C1"))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(latest(Some("C1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(&["2"], Some("C1"))))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = logged_in_scraper(&server).await;
    let results: Vec<_> = scraper.search("rust", 100, SearchMode::Latest).collect().await;

    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn top_mode_requests_top_product() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(SearchVariables {
            cursor: None,
            product: "Top",
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(&["1"], None)))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = logged_in_scraper(&server).await;
    let results: Vec<_> = scraper.search("rust", 10, SearchMode::Top).collect().await;

    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn search_failure_yields_error_and_stops() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let scraper = logged_in_scraper(&server).await;
    let results: Vec<_> = scraper.search("rust", 10, SearchMode::Latest).collect().await;

    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0],
        Err(ScraperError::Status { status: 500, .. })
    ));
}
