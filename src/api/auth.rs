//! Token authentication endpoints
//!
//! - POST /api/auth/token/login/ - exchange email and password for a token
//! - POST /api/auth/token/logout/ - invalidate the presented token

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{extract_session_token, ApiError, ApiJson, AppState, AuthenticatedUser};
use crate::services::LoginInput;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/token/login/", post(login))
        .route("/auth/token/logout/", post(logout))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<Json<TokenResponse>, ApiError> {
    let session = state.user_service.login(input).await?;
    Ok(Json(TokenResponse {
        auth_token: session.id,
    }))
}

async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
