//! HTTP API server for front-ends.
//!
//! Provides REST endpoints for recommendations and corpus status.

use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::Category;
use crate::error::TldwError;
use crate::ranking::Recommendation;
use crate::recommender::Recommender;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    recommender: Recommender,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        recommender: Recommender::new(&settings),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state).layer(cors);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("TLDW API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Categories", "GET  /categories");
    Output::kv("Recommend", "POST /recommend");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/categories", get(categories))
        .route("/recommend", post(recommend))
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct RecommendRequest {
    transcript: String,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default)]
    top_k: Option<usize>,
}

fn default_category() -> String {
    Category::Ted.as_str().to_string()
}

#[derive(Serialize)]
struct RecommendResponse {
    category: String,
    recommendations: Vec<Recommendation>,
}

#[derive(Serialize)]
struct CategoryInfo {
    name: &'static str,
    label: &'static str,
    catalog_rows: Option<usize>,
    providers: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP status for a failed recommendation.
fn status_for(error: &TldwError) -> StatusCode {
    match error {
        TldwError::InvalidInput(_) | TldwError::UnknownCategory(_) => StatusCode::BAD_REQUEST,
        TldwError::CorpusNotFound(_) => StatusCode::NOT_FOUND,
        TldwError::ModelUnavailable(_) | TldwError::CorpusLocked(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.recommender.store();
    let categories: Vec<CategoryInfo> = Category::ALL
        .into_iter()
        .map(|category| {
            let status = store.status(category);
            CategoryInfo {
                name: category.as_str(),
                label: category.label(),
                catalog_rows: status.catalog_rows,
                providers: status
                    .vector_files
                    .iter()
                    .map(|f| f.provider.to_string())
                    .collect(),
            }
        })
        .collect();

    Json(categories)
}

async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecommendRequest>,
) -> impl IntoResponse {
    let top_k = req.top_k.unwrap_or(state.recommender.top_k());

    match state
        .recommender
        .recommend_top(&req.transcript, &req.category, top_k)
        .await
    {
        Ok(recommendations) => Json(RecommendResponse {
            category: req.category.trim().to_lowercase(),
            recommendations,
        })
        .into_response(),
        Err(e) => (
            status_for(&e),
            Json(ErrorResponse {
                error: e.user_message(),
            }),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&TldwError::InvalidInput("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&TldwError::UnknownCategory("movies".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&TldwError::CorpusNotFound("ted".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&TldwError::ModelUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&TldwError::CorpusLocked("ted".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&TldwError::DimensionMismatch {
                expected: 3,
                actual: 4
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_request_defaults() {
        let req: RecommendRequest = serde_json::from_str(r#"{"transcript": "hello"}"#).unwrap();
        assert_eq!(req.category, "ted");
        assert!(req.top_k.is_none());
    }
}
