//! API middleware
//!
//! Contains:
//! - `AppState` with the shared services
//! - `ApiError` and the mapping from service errors to HTTP responses
//! - Token authentication (`optional_auth`, `require_admin`) and the
//!   `AuthenticatedUser` / `MaybeUser` extractors

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::{Config, PaginationConfig};
use crate::db::repositories::{
    SqlxAdminRepository, SqlxBookmarkRepository, SqlxFollowRepository, SqlxIngredientRepository,
    SqlxRecipeRepository, SqlxSessionRepository, SqlxTagRepository, SqlxUserRepository,
};
use crate::db::DbPool;
use crate::models::User;
use crate::permissions::PermissionDenied;
use crate::serializers::{FieldErrors, ReadShapes};
use crate::services::{
    AdminService, AdminServiceError, BookmarkService, BookmarkServiceError, FollowService,
    FollowServiceError, IngredientService, IngredientServiceError, MediaStorage, RecipeService,
    RecipeServiceError, TagService, TagServiceError, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub tag_service: Arc<TagService>,
    pub ingredient_service: Arc<IngredientService>,
    pub recipe_service: Arc<RecipeService>,
    pub follow_service: Arc<FollowService>,
    pub bookmark_service: Arc<BookmarkService>,
    pub admin_service: Arc<AdminService>,
    pub shapes: ReadShapes,
    pub pagination: PaginationConfig,
    /// Scheme and host used for absolute links in responses
    pub public_url: String,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: DbPool, config: &Config) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let sessions = SqlxSessionRepository::boxed(pool.clone());
        let tags = SqlxTagRepository::boxed(pool.clone());
        let ingredients = SqlxIngredientRepository::boxed(pool.clone());
        let recipes = SqlxRecipeRepository::boxed(pool.clone());
        let follows = SqlxFollowRepository::boxed(pool.clone());
        let bookmarks = SqlxBookmarkRepository::boxed(pool.clone());
        let media = Arc::new(MediaStorage::from_config(&config.media));

        let public_url = config.server.public_url.trim_end_matches('/').to_string();
        let media_url = format!("{}/{}", public_url, config.media.url.trim_matches('/'));

        Self {
            user_service: Arc::new(UserService::new(users.clone(), sessions)),
            tag_service: Arc::new(TagService::new(tags.clone())),
            ingredient_service: Arc::new(IngredientService::new(ingredients.clone())),
            recipe_service: Arc::new(RecipeService::new(
                recipes.clone(),
                tags.clone(),
                ingredients.clone(),
                media,
            )),
            follow_service: Arc::new(FollowService::new(follows.clone(), users.clone())),
            bookmark_service: Arc::new(BookmarkService::new(bookmarks.clone(), recipes.clone())),
            admin_service: Arc::new(AdminService::new(SqlxAdminRepository::boxed(pool.clone()))),
            shapes: ReadShapes::new(users, follows, tags, ingredients, recipes, bookmarks, media_url),
            pagination: config.pagination.clone(),
            public_url,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The requester, if the request carried a valid token
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    /// Field-level validation failure
    pub fn validation(errors: FieldErrors) -> Self {
        let message = errors.to_string();
        let details = serde_json::to_value(&errors).unwrap_or_default();
        Self::with_details("VALIDATION_ERROR", message, details)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "UNSUPPORTED_MEDIA_TYPE" => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Field errors are answered with the bare `{field: [messages]}` map
        if status == StatusCode::BAD_REQUEST {
            if let Some(details) = self.error.details.clone() {
                return (status, Json(details)).into_response();
            }
        }

        (status, Json(self)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Request failed: {:#}", err);
        ApiError::internal_error("Internal server error")
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::validation(errors)
    }
}

impl From<PermissionDenied> for ApiError {
    fn from(denied: PermissionDenied) -> Self {
        match denied {
            PermissionDenied::NotAuthenticated => ApiError::unauthorized(denied.to_string()),
            PermissionDenied::Forbidden => ApiError::forbidden(denied.to_string()),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::Validation(errors) => errors.into(),
            UserServiceError::NotFound(msg) => ApiError::not_found(msg),
            UserServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::Validation(errors) => errors.into(),
            TagServiceError::NotFound(id) => ApiError::not_found(format!("Tag not found: {}", id)),
            TagServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<IngredientServiceError> for ApiError {
    fn from(err: IngredientServiceError) -> Self {
        match err {
            IngredientServiceError::Validation(errors) => errors.into(),
            IngredientServiceError::NotFound(id) => ApiError::not_found(format!("Ingredient not found: {}", id)),
            IngredientServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<RecipeServiceError> for ApiError {
    fn from(err: RecipeServiceError) -> Self {
        match err {
            RecipeServiceError::Validation(errors) => errors.into(),
            RecipeServiceError::NotFound(id) => ApiError::not_found(format!("Recipe not found: {}", id)),
            RecipeServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<FollowServiceError> for ApiError {
    fn from(err: FollowServiceError) -> Self {
        match err {
            FollowServiceError::Validation(errors) => errors.into(),
            FollowServiceError::NotFound(id) => ApiError::not_found(format!("User not found: {}", id)),
            FollowServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<BookmarkServiceError> for ApiError {
    fn from(err: BookmarkServiceError) -> Self {
        match err {
            BookmarkServiceError::Validation(errors) => errors.into(),
            BookmarkServiceError::NotFound(id) => ApiError::not_found(format!("Recipe not found: {}", id)),
            BookmarkServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<AdminServiceError> for ApiError {
    fn from(err: AdminServiceError) -> Self {
        match err {
            AdminServiceError::NotFound(model) => ApiError::not_found(format!("Unknown model: {}", model)),
            AdminServiceError::InternalError(e) => e.into(),
        }
    }
}

/// Extract the auth token from the request headers.
///
/// Accepts `Authorization: Token <t>`, `Authorization: Bearer <t>` and a
/// `session=<t>` cookie, in that order of precedence.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(header::AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        let token = auth
            .strip_prefix("Token ")
            .or_else(|| auth.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if let Some(token) = token {
            return Some(token.to_string());
        }
    }

    headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .find_map(|cookie| cookie.trim().strip_prefix("session="))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
}

/// Resolve the token, if any, and attach the user to the request.
///
/// Unknown or expired tokens leave the request anonymous; handlers decide
/// whether that is acceptable.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Session validation failed"),
        }
    }
    next.run(request).await
}

/// Staff-only routes
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::from(PermissionDenied::NotAuthenticated))?;

    if !user.0.is_staff() {
        return Err(PermissionDenied::Forbidden.into());
    }

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| PermissionDenied::NotAuthenticated.into())
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone()),
        ))
    }
}

/// JSON request body whose decoding failures are reported as field errors
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection_error(&rejection)),
        }
    }
}

const NON_FIELD_ERRORS: &str = "non_field_errors";

fn json_rejection_error(rejection: &JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => ApiError::validation(data_error_fields(&err.body_text())),
        JsonRejection::JsonSyntaxError(_) => {
            ApiError::validation(FieldErrors::single(NON_FIELD_ERRORS, "JSON parse error."))
        }
        JsonRejection::MissingJsonContentType(_) => ApiError::new(
            "UNSUPPORTED_MEDIA_TYPE",
            "Expected request with `Content-Type: application/json`",
        ),
        other => ApiError::validation(FieldErrors::single(NON_FIELD_ERRORS, other.body_text())),
    }
}

/// Turn a body decoding message into field errors.
///
/// The message reads `<prefix>: <path>: <reason>`, where `<path>` looks like
/// `tags[0]` or `ingredients[1].id` and is absent for errors on the whole body.
/// Errors are keyed by the top-level field; nested paths stay in the message.
fn data_error_fields(text: &str) -> FieldErrors {
    let detail = text.split_once(": ").map_or(text, |(_, rest)| rest);

    let located = detail
        .split_once(": ")
        .filter(|(path, _)| !path.is_empty() && !path.contains(char::is_whitespace));

    match located {
        Some((path, reason)) => {
            let field = path.split(['[', '.']).next().unwrap_or(path);
            let message = if field == path {
                format!("Incorrect type: {}.", reason)
            } else {
                format!("Incorrect type at {}: {}.", path, reason)
            };
            FieldErrors::single(field, message)
        }
        None => FieldErrors::single(NON_FIELD_ERRORS, format!("Invalid data: {}.", detail)),
    }
}
