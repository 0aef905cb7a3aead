//! Middleware for protecting authenticated routes and handling authorization.
//!
//! This module contains logic for validating bearer tokens and enforcing
//! role-based permissions across the API endpoints.

use crate::config::Config;
use crate::database::models::{Role, User};
use crate::repositories::user_repository::UserRepository;
use crate::utils::jwt::JwtUtils;
use axum::{
    extract::Request,
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use sqlx::SqlitePool;

/// JWT authentication middleware.
///
/// Validates the bearer token, loads the referenced user from the database,
/// and inserts both the claims and the user into the request extensions.
pub async fn jwt_auth(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Check if it's a Bearer token
    if !auth_header.starts_with("Bearer ") {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let token = &auth_header[7..]; // Remove "Bearer " prefix

    let config = request
        .extensions()
        .get::<Config>()
        .cloned()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
    let pool = request
        .extensions()
        .get::<SqlitePool>()
        .cloned()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let jwt_utils = JwtUtils::new(&config.jwt_secret, config.jwt_expires_in_seconds);
    let claims = jwt_utils
        .validate_token(token)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    // The token may outlive the account it was issued for.
    let user = UserRepository::new(&pool)
        .get_user_by_id(&claims.sub)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Role authorization middleware.
///
/// Expects `jwt_auth` to have attached the user; rejects with 403 when the
/// user's role is not in the allowed set.
pub async fn require_roles(
    allowed: &[Role],
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = request
        .extensions()
        .get::<User>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !allowed.contains(&user.role) {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}

/// Admin-only convenience gate
pub async fn admin_auth(request: Request, next: Next) -> Result<Response, StatusCode> {
    require_roles(&[Role::Admin], request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::database::models::CreateUser;
    use axum::{Extension, Router, body::Body, middleware, routing::get};
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    async fn guarded() -> &'static str {
        "ok"
    }

    /// Router with a staff-or-admin gate, plus a token for a user of `role`.
    async fn setup(role: Role) -> (Router, String) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let config = Config::for_tests("test-secret");

        let user = UserRepository::new(&pool)
            .create_user(CreateUser {
                id: "u-1".to_string(),
                username: "alice".to_string(),
                name: None,
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
                phone: None,
                role,
            })
            .await
            .unwrap();

        let token = JwtUtils::new("test-secret", 3600)
            .generate_token(&user)
            .unwrap();

        let app = Router::new()
            .route("/guarded", get(guarded))
            .layer(middleware::from_fn(|request: Request, next: Next| {
                require_roles(&[Role::Admin, Role::Staff], request, next)
            }))
            .layer(middleware::from_fn(jwt_auth))
            .layer(Extension(pool))
            .layer(Extension(config));

        (app, token)
    }

    fn request_with_token(token: &str) -> Request {
        Request::builder()
            .uri("/guarded")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (app, _) = setup(Role::Staff).await;

        let request = Request::builder()
            .uri("/guarded")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let (app, _) = setup(Role::Staff).await;

        let response = app
            .oneshot(request_with_token("not-a-jwt"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_permitted_role_passes_gate() {
        let (app, token) = setup(Role::Staff).await;

        let response = app.oneshot(request_with_token(&token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_excluded_role_is_forbidden() {
        let (app, token) = setup(Role::User).await;

        let response = app.oneshot(request_with_token(&token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_gate_rejects_staff() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let config = Config::for_tests("test-secret");

        let user = UserRepository::new(&pool)
            .create_user(CreateUser {
                id: "u-2".to_string(),
                username: "bob".to_string(),
                name: None,
                email: "bob@example.com".to_string(),
                password_hash: "hash".to_string(),
                phone: None,
                role: Role::Staff,
            })
            .await
            .unwrap();

        let token = JwtUtils::new("test-secret", 3600)
            .generate_token(&user)
            .unwrap();

        let app = Router::new()
            .route("/guarded", get(guarded))
            .layer(middleware::from_fn(admin_auth))
            .layer(middleware::from_fn(jwt_auth))
            .layer(Extension(pool))
            .layer(Extension(config));

        let response = app.oneshot(request_with_token(&token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
