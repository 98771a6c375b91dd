//! `GET /api/search` handler and parameter validation.

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::twitter::{
    SearchClient, SearchMode, SearchRequest, DEFAULT_LIMIT, MAX_LIMIT, MAX_QUERY_CHARS,
};

use super::{ApiError, FieldIssue, SearchResponse};

/// Raw query parameters of a search request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Search query (`q`).
    pub q: Option<String>,
    /// Result limit, unparsed.
    pub limit: Option<String>,
    /// Ranking mode, unparsed.
    pub mode: Option<String>,
}

impl SearchParams {
    /// Collect parameters from decoded query pairs. The first occurrence of a key wins.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "q" => &mut params.q,
                "limit" => &mut params.limit,
                "mode" => &mut params.mode,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }

    /// Validate into a [`SearchRequest`], reporting every bad parameter.
    pub fn validate(self) -> Result<SearchRequest, Vec<FieldIssue>> {
        let mut issues = Vec::new();

        let query = match self.q {
            None => {
                issues.push(FieldIssue::new("q", "Required"));
                None
            }
            Some(q) => {
                let chars = q.chars().count();
                if chars == 0 {
                    issues.push(FieldIssue::new(
                        "q",
                        "Query must contain at least 1 character(s)",
                    ));
                    None
                } else if chars > MAX_QUERY_CHARS {
                    issues.push(FieldIssue::new(
                        "q",
                        format!("Query must contain at most {MAX_QUERY_CHARS} character(s)"),
                    ));
                    None
                } else {
                    Some(q)
                }
            }
        };

        // An empty limit counts as omitted.
        let limit = match self.limit.as_deref().filter(|l| !l.is_empty()) {
            None => Some(DEFAULT_LIMIT),
            Some(raw) => match leading_integer(raw) {
                None => {
                    issues.push(FieldIssue::new(
                        "limit",
                        format!("Expected integer, received '{raw}'"),
                    ));
                    None
                }
                Some(n) if n < 1 => {
                    issues.push(FieldIssue::new(
                        "limit",
                        "Number must be greater than or equal to 1",
                    ));
                    None
                }
                Some(n) if n > MAX_LIMIT as i64 => {
                    issues.push(FieldIssue::new(
                        "limit",
                        format!("Number must be less than or equal to {MAX_LIMIT}"),
                    ));
                    None
                }
                Some(n) => Some(n as usize),
            },
        };

        let mode = match self.mode.as_deref() {
            None => Some(SearchMode::default()),
            Some(raw) => match raw.parse::<SearchMode>() {
                Ok(mode) => Some(mode),
                Err(e) => {
                    issues.push(FieldIssue::new("mode", e.to_string()));
                    None
                }
            },
        };

        match (query, limit, mode) {
            (Some(query), Some(limit), Some(mode)) if issues.is_empty() => Ok(SearchRequest {
                query,
                limit,
                mode,
            }),
            _ => Err(issues),
        }
    }
}

/// Read the integer prefix of `raw`: leading whitespace, an optional sign,
/// then digits. Anything after the digits is ignored, so `"2.5"` is 2 and
/// `"10abc"` is 10. Returns `None` when no digit follows. Values beyond
/// `i64` saturate.
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let magnitude = rest[..digits].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Search tweets matching `q`.
pub async fn search_handler(
    State(client): State<Arc<SearchClient>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<SearchResponse>, ApiError> {
    let request = SearchParams::from_pairs(pairs)
        .validate()
        .map_err(ApiError::Validation)?;

    let tweets = client.search(&request).await?;
    Ok(Json(SearchResponse::new(request.query, tweets)))
}
