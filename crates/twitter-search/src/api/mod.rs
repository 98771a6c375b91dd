//! HTTP API handlers and response shapes.

mod search;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::error::SearchError;
use crate::twitter::{serialize_timestamp, Tweet};

pub use search::{search_handler, SearchParams};

/// A problem with one request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Query parameter name.
    pub field: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl FieldIssue {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Successful search response body.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// Always `true`.
    pub success: bool,
    /// Matching tweets.
    pub data: Vec<Tweet>,
    /// Request echo and counts.
    pub metadata: SearchMetadata,
}

/// Metadata attached to a search response.
#[derive(Debug, Serialize)]
pub struct SearchMetadata {
    /// Query as received.
    pub query: String,
    /// Number of tweets in `data`.
    pub count: usize,
    /// When the response was produced.
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl SearchResponse {
    /// Wrap search results.
    #[must_use]
    pub fn new(query: String, data: Vec<Tweet>) -> Self {
        Self {
            success: true,
            metadata: SearchMetadata {
                query,
                count: data.len(),
                timestamp: Utc::now(),
            },
            data,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse<D> {
    /// Always `false`.
    pub success: bool,
    /// Short error category.
    pub error: &'static str,
    /// Structured or textual detail.
    pub details: D,
}

/// Errors surfaced by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more parameters failed validation
    #[error("Invalid input parameters")]
    Validation(Vec<FieldIssue>),

    /// Authentication or upstream failure
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(issues) => {
                tracing::info!(issues = ?issues, "Rejected search request");
                (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        success: false,
                        error: "Invalid input parameters",
                        details: issues,
                    }),
                )
                    .into_response()
            }
            Self::Search(e) => {
                tracing::error!(error = %e, "Search error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        success: false,
                        error: "Internal server error",
                        details: e.to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
