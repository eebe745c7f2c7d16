use super::search::QueryCoordinator;
use super::types::{QueryError, SearchHit};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub count: usize,
    pub degraded: bool,
    pub results: Vec<SearchHit>,
}

pub async fn handle_search(
    Query(params): Query<SearchParams>,
    Extension(coordinator): Extension<Arc<QueryCoordinator>>,
) -> (StatusCode, Json<SearchResponse>) {
    let top_k = params.limit.unwrap_or(coordinator.default_top_k());

    match coordinator.search(&params.q, top_k).await {
        Ok(results) => (
            StatusCode::OK,
            Json(SearchResponse {
                query: params.q,
                count: results.hits.len(),
                degraded: results.degraded,
                results: results.hits,
            }),
        ),
        Err(e @ QueryError::Unavailable { .. }) => {
            tracing::error!("Search failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(SearchResponse {
                    query: params.q,
                    count: 0,
                    degraded: true,
                    results: Vec::new(),
                }),
            )
        }
    }
}
