//! API layer - HTTP handlers and routing
//!
//! Every endpoint lives under `/api`:
//! - Token authentication
//! - Users and subscriptions
//! - Tags and ingredients
//! - Recipes, favourites and the shopping cart
//! - Staff-only admin listings
//!
//! Uploaded media is served from the configured media URL.

pub mod admin;
pub mod auth;
pub mod ingredients;
pub mod middleware;
pub mod recipes;
pub mod responses;
pub mod tags;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::Config;

pub use middleware::{ApiError, ApiJson, AppState, AuthenticatedUser, MaybeUser};

/// Build the `/api` router
pub fn build_api_router() -> Router<AppState> {
    // Sub-routers carry their full paths: nesting would drop the trailing
    // slash on their collection routes
    let admin_routes =
        admin::router().route_layer(axum_middleware::from_fn(middleware::require_admin));

    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(tags::router())
        .merge(ingredients::router())
        .merge(recipes::router())
        .merge(admin_routes)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE]);

    if origin == "*" {
        return cors.allow_origin(Any);
    }

    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value).allow_credentials(true),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, cross-origin requests are disabled");
            cors
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, config: &Config) -> Router {
    let media_path = format!("/{}", config.media.url.trim_matches('/'));

    Router::new()
        .nest("/api", build_api_router())
        .nest_service(&media_path, ServeDir::new(&config.media.root))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .layer(cors_layer(&config.server.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{insert_ingredient, insert_tag, migrated_pool};
    use crate::db::DbPool;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    struct TestApp {
        router: Router,
        pool: DbPool,
        _media: TempDir,
    }

    impl TestApp {
        async fn new() -> Self {
            let media = TempDir::new().unwrap();
            let mut config = Config::default();
            config.media.root = media.path().to_path_buf();

            let pool = migrated_pool().await;
            let state = AppState::new(pool.clone(), &config);
            Self {
                router: build_router(state, &config),
                pool,
                _media: media,
            }
        }

        async fn raw(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, String) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                request = request.header(header::AUTHORIZATION, format!("Token {}", token));
            }
            let body = match body {
                Some(body) => {
                    request = request.header(header::CONTENT_TYPE, "application/json");
                    Body::from(body.to_string())
                }
                None => Body::empty(),
            };

            let response = self
                .router
                .clone()
                .oneshot(request.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, String::from_utf8(bytes.to_vec()).unwrap())
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let (status, text) = self.raw(method, uri, token, body).await;
            let value = if text.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).unwrap()
            };
            (status, value)
        }

        /// Register an account and return its id and token
        async fn signup(&self, username: &str) -> (i64, String) {
            let (status, created) = self
                .call(
                    Method::POST,
                    "/api/users/",
                    None,
                    Some(json!({
                        "username": username,
                        "email": format!("{}@example.com", username),
                        "first_name": "Ivan",
                        "last_name": "Petrov",
                        "password": "s3cret-pass",
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{}", created);

            let (status, login) = self
                .call(
                    Method::POST,
                    "/api/auth/token/login/",
                    None,
                    Some(json!({"email": format!("{}@example.com", username), "password": "s3cret-pass"})),
                )
                .await;
            assert_eq!(status, StatusCode::OK);

            (
                created["id"].as_i64().unwrap(),
                login["auth_token"].as_str().unwrap().to_string(),
            )
        }

        async fn make_staff(&self, user_id: i64) {
            sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .unwrap();
        }

        async fn create_recipe(&self, token: &str, name: &str, tag: i64, ingredient: i64) -> Value {
            let (status, recipe) = self
                .call(
                    Method::POST,
                    "/api/recipes/",
                    Some(token),
                    Some(json!({
                        "name": name,
                        "text": "Boil and serve",
                        "cooking_time": 15,
                        "image": PNG,
                        "tags": [tag],
                        "ingredients": [{"id": ingredient, "amount": 200}],
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{}", recipe);
            recipe
        }
    }

    #[tokio::test]
    async fn test_register_login_me_logout() {
        let app = TestApp::new().await;
        let (id, token) = app.signup("cook").await;

        let (status, me) = app.call(Method::GET, "/api/users/me/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], id);
        assert_eq!(me["is_subscribed"], false);

        let (status, _) = app.call(Method::GET, "/api/users/me/", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .call(Method::POST, "/api/auth/token/logout/", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.call(Method::GET, "/api/users/me/", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_login_and_duplicate_signup() {
        let app = TestApp::new().await;
        app.signup("cook").await;

        let (status, body) = app
            .call(
                Method::POST,
                "/api/auth/token/login/",
                None,
                Some(json!({"email": "cook@example.com", "password": "wrong"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["non_field_errors"].is_array());

        let (status, body) = app
            .call(
                Method::POST,
                "/api/users/",
                None,
                Some(json!({
                    "username": "cook",
                    "email": "cook@example.com",
                    "first_name": "A",
                    "last_name": "B",
                    "password": "pass",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["email"].is_array());
        assert!(body["username"].is_array());
    }

    #[tokio::test]
    async fn test_set_password() {
        let app = TestApp::new().await;
        let (_, token) = app.signup("cook").await;

        let (status, body) = app
            .call(
                Method::POST,
                "/api/users/set_password/",
                Some(&token),
                Some(json!({"current_password": "nope", "new_password": "fresh"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["current_password"].is_array());

        let (status, _) = app
            .call(
                Method::POST,
                "/api/users/set_password/",
                Some(&token),
                Some(json!({"current_password": "s3cret-pass", "new_password": "fresh"})),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app
            .call(
                Method::POST,
                "/api/auth/token/login/",
                None,
                Some(json!({"email": "cook@example.com", "password": "fresh"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_recipe_lifecycle_and_permissions() {
        let app = TestApp::new().await;
        let (author_id, author) = app.signup("chef").await;
        let (_, stranger) = app.signup("guest").await;
        let tag = insert_tag(&app.pool, "Lunch", "lunch").await;
        let potato = insert_ingredient(&app.pool, "potato", "g").await;

        // Anonymous writes need authentication
        let (status, _) = app
            .call(Method::POST, "/api/recipes/", None, Some(json!({"name": "x"})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let recipe = app.create_recipe(&author, "Mash", tag, potato).await;
        let id = recipe["id"].as_i64().unwrap();
        assert_eq!(recipe["author"]["id"], author_id);
        assert_eq!(recipe["tags"][0]["slug"], "lunch");
        assert_eq!(recipe["ingredients"][0]["amount"], 200);
        assert!(recipe["image"]
            .as_str()
            .unwrap()
            .starts_with("http://localhost:8000/media/recipes/images/"));

        let uri = format!("/api/recipes/{}/", id);
        let (status, _) = app
            .call(Method::PATCH, &uri, Some(&stranger), Some(json!({"name": "Stolen"})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.call(Method::DELETE, &uri, Some(&stranger), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Omitting ingredients on update is a validation error
        let (status, body) = app
            .call(
                Method::PATCH,
                &uri,
                Some(&author),
                Some(json!({"name": "Better mash", "tags": [tag]})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["ingredients"].is_array());

        let (status, updated) = app
            .call(
                Method::PATCH,
                &uri,
                Some(&author),
                Some(json!({
                    "name": "Better mash",
                    "tags": [tag],
                    "ingredients": [{"id": potato, "amount": 300}],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", updated);
        assert_eq!(updated["name"], "Better mash");
        assert_eq!(updated["ingredients"][0]["amount"], 300);

        let (status, _) = app.call(Method::DELETE, &uri, Some(&author), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.call(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_field_types_are_field_errors() {
        let app = TestApp::new().await;
        let (_, token) = app.signup("chef").await;
        let tag = insert_tag(&app.pool, "Lunch", "lunch").await;
        let potato = insert_ingredient(&app.pool, "potato", "g").await;
        let recipe = |overrides: Value| {
            let mut body = json!({
                "name": "Mash",
                "text": "Boil and serve",
                "cooking_time": 15,
                "image": PNG,
                "tags": [tag],
                "ingredients": [{"id": potato, "amount": 200}],
            });
            for (key, value) in overrides.as_object().unwrap() {
                body[key] = value.clone();
            }
            body
        };

        for (overrides, field) in [
            (json!({"tags": ["lunch"]}), "tags"),
            (json!({"cooking_time": 1.5}), "cooking_time"),
            (json!({"ingredients": [{"id": "abc", "amount": 1}]}), "ingredients"),
        ] {
            let (status, body) = app
                .call(Method::POST, "/api/recipes/", Some(&token), Some(recipe(overrides)))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert!(body[field].is_array(), "{}", body);
        }

        let (status, body) = app
            .call(
                Method::POST,
                "/api/users/",
                None,
                Some(json!({
                    "username": "typo",
                    "email": 5,
                    "first_name": "A",
                    "last_name": "B",
                    "password": "pass",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["email"].is_array());

        let (_, page) = app.call(Method::GET, "/api/recipes/", None, None).await;
        assert_eq!(page["count"], 0);
    }

    #[tokio::test]
    async fn test_favourites_cart_and_download() {
        let app = TestApp::new().await;
        let (_, chef) = app.signup("chef").await;
        let (_, fan) = app.signup("fan").await;
        let tag = insert_tag(&app.pool, "Dinner", "dinner").await;
        let flour = insert_ingredient(&app.pool, "flour", "g").await;

        let first = app.create_recipe(&chef, "Bread", tag, flour).await["id"].as_i64().unwrap();
        let second = app.create_recipe(&chef, "Pie", tag, flour).await["id"].as_i64().unwrap();

        let favorite = format!("/api/recipes/{}/favorite/", first);
        let (status, short) = app.call(Method::POST, &favorite, Some(&fan), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(short["name"], "Bread");
        assert!(short.get("author").is_none());

        let (status, body) = app.call(Method::POST, &favorite, Some(&fan), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.is_object());

        let (status, page) = app
            .call(Method::GET, "/api/recipes/?is_favorited=1", Some(&fan), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["count"], 1);
        assert_eq!(page["results"][0]["is_favorited"], true);

        // Anonymous viewers asking for their favourites get nothing
        let (_, page) = app.call(Method::GET, "/api/recipes/?is_favorited=1", None, None).await;
        assert_eq!(page["count"], 0);

        for id in [first, second] {
            let uri = format!("/api/recipes/{}/shopping_cart/", id);
            let (status, _) = app.call(Method::POST, &uri, Some(&fan), None).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, text) = app
            .raw(Method::GET, "/api/recipes/download_shopping_cart/", Some(&fan), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("flour (g) - 400"), "{}", text);

        let (status, _) = app
            .call(Method::DELETE, &favorite, Some(&fan), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app
            .call(Method::DELETE, &favorite, Some(&fan), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .raw(Method::GET, "/api/recipes/download_shopping_cart/", None, None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_subscriptions() {
        let app = TestApp::new().await;
        let (chef_id, chef) = app.signup("chef").await;
        let (fan_id, fan) = app.signup("fan").await;
        let tag = insert_tag(&app.pool, "Soup", "soup").await;
        let beet = insert_ingredient(&app.pool, "beet", "pcs").await;
        app.create_recipe(&chef, "Borscht", tag, beet).await;
        app.create_recipe(&chef, "Shchi", tag, beet).await;

        let (status, _) = app
            .call(Method::POST, &format!("/api/users/{}/subscribe/", fan_id), Some(&fan), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, author) = app
            .call(
                Method::POST,
                &format!("/api/users/{}/subscribe/?recipes_limit=1", chef_id),
                Some(&fan),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(author["is_subscribed"], true);
        assert_eq!(author["recipes_count"], 2);
        assert_eq!(author["recipes"].as_array().unwrap().len(), 1);

        let (status, page) = app
            .call(Method::GET, "/api/users/subscriptions/", Some(&fan), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["count"], 1);
        assert_eq!(page["results"][0]["username"], "chef");

        let (status, _) = app
            .call(Method::DELETE, &format!("/api/users/{}/subscribe/", chef_id), Some(&fan), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_tags_and_ingredients_staff_writes() {
        let app = TestApp::new().await;
        let (user_id, token) = app.signup("cook").await;
        let tag = json!({"name": "Breakfast", "color": "#E26C2D", "slug": "breakfast"});

        let (status, _) = app.call(Method::POST, "/api/tags/", None, Some(tag.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app
            .call(Method::POST, "/api/tags/", Some(&token), Some(tag.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        app.make_staff(user_id).await;
        let (status, created) = app
            .call(Method::POST, "/api/tags/", Some(&token), Some(tag))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, tags) = app.call(Method::GET, "/api/tags/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tags, json!([created]));

        insert_ingredient(&app.pool, "сахар", "г").await;
        insert_ingredient(&app.pool, "соль", "г").await;
        let (_, found) = app
            .call(Method::GET, "/api/ingredients/?name=%D1%81%D0%B0", None, None)
            .await;
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["name"], "сахар");
    }

    #[tokio::test]
    async fn test_user_list_pagination_links() {
        let app = TestApp::new().await;
        for name in ["a1", "a2", "a3"] {
            app.signup(name).await;
        }

        let (status, page) = app.call(Method::GET, "/api/users/?limit=2", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["count"], 3);
        assert_eq!(page["results"].as_array().unwrap().len(), 2);
        assert_eq!(page["next"], "http://localhost:8000/api/users/?limit=2&page=2");
        assert_eq!(page["previous"], Value::Null);
    }

    #[tokio::test]
    async fn test_admin_requires_staff() {
        let app = TestApp::new().await;
        let (user_id, token) = app.signup("boss").await;

        let (status, _) = app.call(Method::GET, "/api/admin/", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app.call(Method::GET, "/api/admin/", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        app.make_staff(user_id).await;
        let (status, models) = app.call(Method::GET, "/api/admin/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(models.as_array().unwrap().iter().any(|m| m["name"] == "recipes"));

        let (status, page) = app
            .call(Method::GET, "/api/admin/users/?email=boss%40example.com", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["count"], 1);

        let (status, _) = app
            .call(Method::GET, "/api/admin/nothing/", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
