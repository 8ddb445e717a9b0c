use crate::cms::FetchError;
use crate::types::*;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

type HandlerError = (StatusCode, Json<ErrorResponse>);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/search", post(search_handler))
        .route("/refresh", post(refresh_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cms-text-search",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// CMS failures are the upstream's fault (502); anything else is ours (500).
fn error_response(context: &str, e: anyhow::Error) -> HandlerError {
    let cause = e.chain().find_map(|c| c.downcast_ref::<FetchError>());
    let status = match cause {
        Some(FetchError::MissingToken) | Some(FetchError::InvalidUrl(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Some(_) => StatusCode::BAD_GATEWAY,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!("{} error: {}", context, e);
    (
        status,
        Json(ErrorResponse {
            error: format!("{} failed: {}", context, e),
        }),
    )
}

pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, HandlerError> {
    if request.query.trim().is_empty() {
        warn!("rejected search with empty query");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "query must not be empty".to_string(),
            }),
        ));
    }

    state
        .search(&request)
        .await
        .map(Json)
        .map_err(|e| error_response("Search", e))
}

pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, HandlerError> {
    state
        .refresh(request.locale.as_deref())
        .await
        .map(Json)
        .map_err(|e| error_response("Refresh", e))
}
