//! Ingredient API endpoints
//!
//! - GET /api/ingredients/?name=<prefix> - search by name prefix, unpaginated
//! - GET /api/ingredients/{id}/ - one ingredient
//! - POST /api/ingredients/ - add an ingredient (staff only)

use axum::{
    extract::{Path, RawQuery, State},
    http::{Method, StatusCode},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, ApiJson, AppState, MaybeUser};
use crate::api::responses::QueryPairs;
use crate::models::Ingredient;
use crate::permissions::{authorize_object, Action, AdminOrReadOnly};
use crate::serializers::IngredientInput;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingredients/", get(search_ingredients).post(create_ingredient))
        .route("/ingredients/{id}/", get(get_ingredient))
}

async fn search_ingredients(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let query = QueryPairs::parse(raw.as_deref());
    Ok(Json(state.ingredient_service.search(query.get("name")).await?))
}

async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Ingredient>, ApiError> {
    Ok(Json(state.ingredient_service.get(id).await?))
}

async fn create_ingredient(
    State(state): State<AppState>,
    requester: MaybeUser,
    method: Method,
    ApiJson(input): ApiJson<IngredientInput>,
) -> Result<(StatusCode, Json<Ingredient>), ApiError> {
    authorize_object(&AdminOrReadOnly, requester.user(), Action::from_method(&method), &input)?;

    let ingredient = state.ingredient_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}
