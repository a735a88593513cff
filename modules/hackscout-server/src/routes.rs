use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use hackscout_pipeline::Pipeline;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScrapeRequest {
    url: Option<String>,
    /// Extra tags to probe alongside the ones found on the page.
    hashtags: Vec<String>,
}

pub fn build_router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/api/scrape", post(scrape))
        .route("/health", get(health))
        .with_state(pipeline)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

async fn health() -> &'static str {
    "ok"
}

fn error_response(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({ "error": error }))).into_response()
}

async fn scrape(
    State(pipeline): State<Arc<Pipeline>>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable scrape request");
            return error_response(StatusCode::BAD_REQUEST, "URL is required");
        }
    };

    let url = body.url.as_deref().map(str::trim).unwrap_or_default();
    if url.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "URL is required");
    }
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        _ => return error_response(StatusCode::BAD_REQUEST, "Invalid URL"),
    }

    info!(url, "Scraping");
    match pipeline.run_with_tags(url, &body.hashtags).await {
        Ok(record) => (StatusCode::OK, Json(json!({ "data": record }))).into_response(),
        Err(e) => {
            warn!(url, error = %e, "Scrape failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to scrape URL", "details": e.to_string() })),
            )
                .into_response()
        }
    }
}
