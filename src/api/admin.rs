//! Admin API endpoints
//!
//! Staff-only list views over the stored entities:
//! - GET /api/admin/ - every entity configuration (columns, search, filters)
//! - GET /api/admin/{model}/?q=&page=&limit=&<filter>= - one page of rows

use axum::{
    extract::{OriginalUri, Path, RawQuery, State},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::admin::ModelAdmin;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{Page, QueryPairs};

/// Query keys that are not entity filters
const RESERVED_PARAMS: &[&str] = &["q", "page", "limit"];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/", get(list_models))
        .route("/admin/{model}/", get(list_rows))
}

async fn list_models(State(state): State<AppState>) -> Json<&'static [ModelAdmin]> {
    Json(state.admin_service.models())
}

async fn list_rows(
    State(state): State<AppState>,
    Path(model): Path<String>,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw): RawQuery,
) -> Result<Json<Page<Map<String, Value>>>, ApiError> {
    let query = QueryPairs::parse(raw.as_deref());
    let params = query.list_params(&state.pagination);

    let filters: HashMap<String, String> = query
        .iter()
        .filter(|(key, value)| !RESERVED_PARAMS.contains(key) && !value.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let search = query.get("q").filter(|q| !q.trim().is_empty());

    let result = state.admin_service.list(&model, search, &filters, &params).await?;
    Ok(Json(Page::new(result, &state.public_url, &uri)))
}
