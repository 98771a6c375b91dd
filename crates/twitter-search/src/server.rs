//! HTTP server for the search API.
//!
//! Provides REST API endpoints for:
//! - Health checks
//! - Tweet search

use anyhow::Result;
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::api::search_handler;
use crate::twitter::{format_timestamp, SearchClient};

/// Build the HTTP router.
pub fn build_router(client: Arc<SearchClient>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/search", get(search_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(client)
}

/// Start the HTTP server and run until Ctrl+C or SIGTERM.
pub async fn run_server(client: Arc<SearchClient>, addr: &str) -> Result<()> {
    let app = build_router(client);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Search API listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server closed");
    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": format_timestamp(&Utc::now()),
    }))
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("SIGTERM received. Shutting down gracefully");
        },
    }
}
