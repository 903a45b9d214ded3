//! User endpoints
//!
//! - GET/POST /api/users/ - list users / register
//! - GET /api/users/{id}/ - profile
//! - GET /api/users/me/ - own profile
//! - POST /api/users/set_password/ - change own password
//! - GET /api/users/subscriptions/ - followed authors with their recipes
//! - POST/DELETE /api/users/{id}/subscribe/ - follow / unfollow

use axum::{
    extract::{OriginalUri, Path, RawQuery, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, ApiJson, AppState, AuthenticatedUser, MaybeUser};
use crate::api::responses::{Page, QueryPairs};
use crate::models::{PagedResult, User};
use crate::permissions::{authorize, Action, CurrentUserOnly};
use crate::serializers::{
    SetPasswordInput, SubscriptionRead, UserCreateInput, UserCreated, UserRead, ViewContext,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users).post(create_user))
        .route("/users/me/", get(me))
        .route("/users/set_password/", post(set_password))
        .route("/users/subscriptions/", get(subscriptions))
        .route("/users/{id}/", get(get_user))
        .route("/users/{id}/subscribe/", post(subscribe).delete(unsubscribe))
}

/// Cap on nested recipes from `recipes_limit`
fn recipes_limit(query: &QueryPairs) -> Option<i64> {
    query.number("recipes_limit").map(i64::from)
}

async fn list_users(
    State(state): State<AppState>,
    requester: MaybeUser,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw): RawQuery,
) -> Result<Json<Page<UserRead>>, ApiError> {
    let query = QueryPairs::parse(raw.as_deref());
    let params = query.list_params(&state.pagination);
    let ctx = ViewContext::for_viewer(requester.id());

    let result = state.user_service.list(&params).await?;
    let mut users = Vec::with_capacity(result.items.len());
    for user in &result.items {
        users.push(state.shapes.user(user, &ctx).await?);
    }

    Ok(Json(Page::new(
        PagedResult::new(users, result.total, &params),
        &state.public_url,
        &uri,
    )))
}

async fn create_user(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<UserCreateInput>,
) -> Result<(StatusCode, Json<UserCreated>), ApiError> {
    let user = state.user_service.register(input).await?;
    Ok((StatusCode::CREATED, Json(UserCreated::from(&user))))
}

async fn get_user(
    State(state): State<AppState>,
    requester: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<UserRead>, ApiError> {
    let user = state.user_service.get_by_id(id).await?;
    let ctx = ViewContext::for_viewer(requester.id());
    Ok(Json(state.shapes.user(&user, &ctx).await?))
}

fn current_user(requester: &MaybeUser, action: Action) -> Result<&User, ApiError> {
    authorize::<User, _>(&CurrentUserOnly, requester.user(), action)?;
    requester
        .user()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

async fn me(State(state): State<AppState>, requester: MaybeUser) -> Result<Json<UserRead>, ApiError> {
    let user = current_user(&requester, Action::Safe)?;
    let ctx = ViewContext::for_viewer(Some(user.id));
    Ok(Json(state.shapes.user(user, &ctx).await?))
}

async fn set_password(
    State(state): State<AppState>,
    requester: MaybeUser,
    ApiJson(input): ApiJson<SetPasswordInput>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&requester, Action::Unsafe)?;
    state.user_service.set_password(user, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn subscriptions(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    OriginalUri(uri): OriginalUri,
    RawQuery(raw): RawQuery,
) -> Result<Json<Page<SubscriptionRead>>, ApiError> {
    let query = QueryPairs::parse(raw.as_deref());
    let params = query.list_params(&state.pagination);
    let ctx = ViewContext::for_viewer(Some(user.id)).with_recipes_limit(recipes_limit(&query));

    let result = state.follow_service.subscriptions(&user, &params).await?;
    let mut authors = Vec::with_capacity(result.items.len());
    for author in &result.items {
        authors.push(state.shapes.subscription(author, &ctx).await?);
    }

    Ok(Json(Page::new(
        PagedResult::new(authors, result.total, &params),
        &state.public_url,
        &uri,
    )))
}

async fn subscribe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    RawQuery(raw): RawQuery,
) -> Result<(StatusCode, Json<SubscriptionRead>), ApiError> {
    let query = QueryPairs::parse(raw.as_deref());
    let author = state.follow_service.subscribe(&user, id).await?;
    let ctx = ViewContext::for_viewer(Some(user.id)).with_recipes_limit(recipes_limit(&query));

    Ok((StatusCode::CREATED, Json(state.shapes.subscription(&author, &ctx).await?)))
}

async fn unsubscribe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.follow_service.unsubscribe(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipes_limit_keeps_full_range() {
        let query = QueryPairs::parse(Some("recipes_limit=4294967295"));
        assert_eq!(recipes_limit(&query), Some(4_294_967_295));

        assert_eq!(recipes_limit(&QueryPairs::parse(Some("recipes_limit=3"))), Some(3));
        assert_eq!(recipes_limit(&QueryPairs::parse(Some("recipes_limit=-1"))), None);
        assert_eq!(recipes_limit(&QueryPairs::parse(Some("recipes_limit=abc"))), None);
        assert_eq!(recipes_limit(&QueryPairs::parse(None)), None);
    }
}
