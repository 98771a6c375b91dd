//! Parser for upstream search timeline payloads.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::types::RawTweet;

/// Date layout used by the `created_at` field of legacy tweet objects.
const LEGACY_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// Tweets on this page, in timeline order.
    pub tweets: Vec<RawTweet>,
    /// Cursor for the next page, if upstream returned one.
    pub next_cursor: Option<String>,
}

/// Parser for the `SearchTimeline` GraphQL response.
pub struct TimelineParser;

impl TimelineParser {
    /// Extract tweets and the bottom cursor from a search timeline payload.
    ///
    /// Entries may arrive through `TimelineAddEntries` (an `entries` array)
    /// or `TimelineReplaceEntry` (a single `entry`, used for cursors on later
    /// pages). Module entries carry their tweets under `items`.
    pub fn parse(payload: &Value) -> SearchPage {
        let mut page = SearchPage::default();

        let Some(instructions) = payload
            .pointer("/data/search_by_raw_query/search_timeline/timeline/instructions")
            .and_then(Value::as_array)
        else {
            tracing::debug!("Search payload has no timeline instructions");
            return page;
        };

        for instruction in instructions {
            if let Some(entries) = instruction.get("entries").and_then(Value::as_array) {
                for entry in entries {
                    Self::parse_entry(entry, &mut page);
                }
            }
            if let Some(entry) = instruction.get("entry") {
                Self::parse_entry(entry, &mut page);
            }
        }

        tracing::debug!(
            count = page.tweets.len(),
            has_cursor = page.next_cursor.is_some(),
            "Parsed search page"
        );
        page
    }

    fn parse_entry(entry: &Value, page: &mut SearchPage) {
        let Some(content) = entry.get("content") else {
            return;
        };

        if content.get("cursorType").and_then(Value::as_str) == Some("Bottom") {
            if let Some(cursor) = content.get("value").and_then(Value::as_str) {
                page.next_cursor = Some(cursor.to_string());
            }
            return;
        }

        if let Some(item) = content.get("itemContent") {
            if let Some(tweet) = Self::parse_item(item) {
                page.tweets.push(tweet);
            }
        }

        if let Some(items) = content.get("items").and_then(Value::as_array) {
            for item in items {
                if let Some(tweet) = item
                    .pointer("/item/itemContent")
                    .and_then(Self::parse_item)
                {
                    page.tweets.push(tweet);
                }
            }
        }
    }

    fn parse_item(item: &Value) -> Option<RawTweet> {
        let mut result = item.pointer("/tweet_results/result")?;
        if result.get("__typename").and_then(Value::as_str) == Some("TweetWithVisibilityResults") {
            result = result.get("tweet")?;
        }

        let legacy = result.get("legacy")?;

        let id = result
            .get("rest_id")
            .or_else(|| legacy.get("id_str"))
            .and_then(Value::as_str)
            .map(String::from);

        // Long-form tweets keep the untruncated text in note_tweet.
        let text = result
            .pointer("/note_tweet/note_tweet_results/result/text")
            .or_else(|| legacy.get("full_text"))
            .and_then(Value::as_str)
            .map(String::from);

        Some(RawTweet {
            id,
            text,
            created_at: legacy
                .get("created_at")
                .and_then(Value::as_str)
                .and_then(Self::parse_created_at),
            retweets: legacy.get("retweet_count").and_then(Value::as_u64),
            likes: legacy.get("favorite_count").and_then(Value::as_u64),
        })
    }

    /// Parse a legacy `created_at` value such as `Wed Oct 10 20:19:24 +0000 2018`.
    pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_str(raw, LEGACY_DATE_FORMAT)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
