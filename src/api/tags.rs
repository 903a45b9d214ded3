//! Tag API endpoints
//!
//! - GET /api/tags/ - every tag, unpaginated
//! - GET /api/tags/{id}/ - one tag
//! - POST /api/tags/ - create a tag (staff only)

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, ApiJson, AppState, MaybeUser};
use crate::models::Tag;
use crate::permissions::{authorize_object, Action, AdminOrReadOnly};
use crate::serializers::TagInput;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags/", get(list_tags).post(create_tag))
        .route("/tags/{id}/", get(get_tag))
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tag_service.list().await?))
}

async fn get_tag(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tag_service.get(id).await?))
}

async fn create_tag(
    State(state): State<AppState>,
    requester: MaybeUser,
    method: Method,
    ApiJson(input): ApiJson<TagInput>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    authorize_object(&AdminOrReadOnly, requester.user(), Action::from_method(&method), &input)?;

    let tag = state.tag_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}
