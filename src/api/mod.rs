// Plain HTTP endpoints served next to the MCP endpoint

use axum::{Router, extract::State, http::StatusCode, response::Json, routing::get};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::JiraService;

pub type AppState = Arc<JiraService>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let resolver = state.resolver();

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "caches": {
            "siteSelections": resolver.selections().len(),
            "accessibleResources": resolver.resources().cache().len(),
        }
    })))
}
