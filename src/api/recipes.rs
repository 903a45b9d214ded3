//! Recipe API endpoints
//!
//! - GET /api/recipes/ - paginated list with `author`, `tags`, `is_favorited`
//!   and `is_in_shopping_cart` filters
//! - POST /api/recipes/ - create
//! - GET/PATCH/DELETE /api/recipes/{id}/ - read, update, delete (author only for writes)
//! - POST/DELETE /api/recipes/{id}/favorite/ - favourites
//! - POST/DELETE /api/recipes/{id}/shopping_cart/ - shopping cart
//! - GET /api/recipes/download_shopping_cart/ - aggregated shopping list as text

use axum::{
    extract::{OriginalUri, Path, RawQuery, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedUser, MaybeUser};
use crate::api::responses::{Page, QueryPairs};
use crate::models::{BookmarkKind, PagedResult, Recipe, RecipeFilter, User};
use crate::permissions::{authorize, authorize_object, Action, RecipeAccess};
use crate::serializers::{FieldErrors, RecipeRead, RecipeShort, RecipeWriteInput, ViewContext};
use crate::services::render_shopping_list;

const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes/", get(list_recipes).post(create_recipe))
        .route("/recipes/download_shopping_cart/", get(download_shopping_cart))
        .route(
            "/recipes/{id}/",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/{id}/favorite/", post(add_favorite).delete(remove_favorite))
        .route(
            "/recipes/{id}/shopping_cart/",
            post(add_to_cart).delete(remove_from_cart),
        )
}

/// Build the list filter from query parameters.
///
/// Returns `None` when a viewer-relative flag is set but nobody is logged in:
/// such a list is empty.
fn recipe_filter(query: &QueryPairs, viewer: Option<i64>) -> Result<Option<RecipeFilter>, ApiError> {
    let author = match query.get("author") {
        None | Some("") => None,
        Some(raw) => Some(
            raw.trim()
                .parse::<i64>()
                .map_err(|_| FieldErrors::single("author", "Enter a number."))?,
        ),
    };

    let mut filter = RecipeFilter {
        author,
        tags: query.all("tags").into_iter().filter(|slug| !slug.is_empty()).collect(),
        ..RecipeFilter::default()
    };

    for (flag, slot) in [
        ("is_favorited", &mut filter.favorited_by),
        ("is_in_shopping_cart", &mut filter.in_cart_of),
    ] {
        if query.flag(flag) {
            match viewer {
                Some(id) => *slot = Some(id),
                None => return Ok(None),
            }
        }
    }

    Ok(Some(filter))
}

async fn list_recipes(
    State(state): State<AppState>,
    requester: MaybeUser,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw): RawQuery,
) -> Result<Json<Page<RecipeRead>>, ApiError> {
    let query = QueryPairs::parse(raw.as_deref());
    let params = query.list_params(&state.pagination);
    let ctx = ViewContext::for_viewer(requester.id());

    let result = match recipe_filter(&query, requester.id())? {
        Some(filter) => state.recipe_service.list(&filter, &params).await?,
        None => PagedResult::new(Vec::new(), 0, &params),
    };
    let recipes = state.shapes.recipes(&result.items, &ctx).await?;

    Ok(Json(Page::new(
        PagedResult::new(recipes, result.total, &params),
        &state.public_url,
        &uri,
    )))
}

async fn create_recipe(
    State(state): State<AppState>,
    requester: MaybeUser,
    ApiJson(input): ApiJson<RecipeWriteInput>,
) -> Result<(StatusCode, Json<RecipeRead>), ApiError> {
    authorize::<Recipe, _>(&RecipeAccess, requester.user(), Action::Unsafe)?;
    let author = requester
        .user()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let recipe = state.recipe_service.create(author, input).await?;
    let ctx = ViewContext::for_viewer(Some(author.id));
    Ok((StatusCode::CREATED, Json(state.shapes.recipe(&recipe, &ctx).await?)))
}

async fn get_recipe(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<RecipeRead>, ApiError> {
    let recipe = state.recipe_service.get(id).await?;
    let ctx = ViewContext::for_viewer(requester.id());
    Ok(Json(state.shapes.recipe(&recipe, &ctx).await?))
}

/// Request-level check, lookup, then object-level check
async fn writable_recipe(
    state: &AppState,
    requester: &MaybeUser,
    method: &Method,
    id: i64,
) -> Result<Recipe, ApiError> {
    let action = Action::from_method(method);
    authorize::<Recipe, _>(&RecipeAccess, requester.user(), action)?;
    let recipe = state.recipe_service.get(id).await?;
    authorize_object(&RecipeAccess, requester.user(), action, &recipe)?;
    Ok(recipe)
}

async fn update_recipe(
    State(state): State<AppState>,
    requester: MaybeUser,
    method: Method,
    Path(id): Path<i64>,
    ApiJson(input): ApiJson<RecipeWriteInput>,
) -> Result<Json<RecipeRead>, ApiError> {
    let recipe = writable_recipe(&state, &requester, &method, id).await?;

    let updated = state.recipe_service.update(&recipe, input).await?;
    let ctx = ViewContext::for_viewer(requester.id());
    Ok(Json(state.shapes.recipe(&updated, &ctx).await?))
}

async fn delete_recipe(
    State(state): State<AppState>,
    requester: MaybeUser,
    method: Method,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let recipe = writable_recipe(&state, &requester, &method, id).await?;
    state.recipe_service.delete(&recipe).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_bookmark(
    state: &AppState,
    kind: BookmarkKind,
    user: &User,
    recipe_id: i64,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    let recipe = state.bookmark_service.add(kind, user, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(state.shapes.recipe_short(&recipe))))
}

async fn add_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    add_bookmark(&state, BookmarkKind::Favourite, &user, id).await
}

async fn remove_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.bookmark_service.remove(BookmarkKind::Favourite, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    add_bookmark(&state, BookmarkKind::ShoppingCart, &user, id).await
}

async fn remove_from_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.bookmark_service.remove(BookmarkKind::ShoppingCart, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.recipe_service.shopping_list(&user).await?;
    let body = render_shopping_list(&items);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", SHOPPING_LIST_FILENAME),
            ),
        ],
        body,
    ))
}
