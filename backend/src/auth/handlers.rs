//! Handler functions for authentication-related API endpoints.
//!
//! These functions process incoming HTTP requests for registration, OTP
//! verification, login, and password reset, parse request data, and interact
//! with the `auth::service` for core business logic.

use crate::api::common::service_error_to_http;
use crate::auth::models::*;
use crate::auth::service::AuthService;
use crate::config::Config;
use crate::database::models::User;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::Json as ResponseJson,
};
use sqlx::SqlitePool;

/// Handle a registration request
#[axum::debug_handler]
pub async fn register(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ResponseJson<MessageResponse>, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool, &config);

    match auth_service.register(payload).await {
        Ok(()) => Ok(ResponseJson(MessageResponse::new(
            "Verification code sent to your email",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle an OTP verification request
#[axum::debug_handler]
pub async fn verify(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Json(payload): Json<VerifyRequest>,
) -> Result<(StatusCode, ResponseJson<VerifyResponse>), (StatusCode, String)> {
    let auth_service = AuthService::new(&pool, &config);

    match auth_service.verify_registration(payload).await {
        Ok(user) => Ok((
            StatusCode::CREATED,
            ResponseJson(VerifyResponse {
                message: "Account verified successfully".to_string(),
                user_id: user.id,
            }),
        )),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle user login request
#[axum::debug_handler]
pub async fn login(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<LoginResponse>, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool, &config);

    match auth_service.login(payload).await {
        Ok(response) => Ok(ResponseJson(response)),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle an OTP resend request
#[axum::debug_handler]
pub async fn resend_otp(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Json(payload): Json<ResendOtpRequest>,
) -> Result<ResponseJson<MessageResponse>, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool, &config);

    match auth_service.resend_otp(payload).await {
        Ok(()) => Ok(ResponseJson(MessageResponse::new(
            "A new verification code has been sent",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle a forgot-password request
#[axum::debug_handler]
pub async fn forgot_password(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<ResponseJson<MessageResponse>, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool, &config);

    match auth_service.forgot_password(payload).await {
        Ok(()) => Ok(ResponseJson(MessageResponse::new(
            "Password reset code sent to your email",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Handle a password reset request
#[axum::debug_handler]
pub async fn reset_password(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<Config>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<ResponseJson<MessageResponse>, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool, &config);

    match auth_service.reset_password(payload).await {
        Ok(()) => Ok(ResponseJson(MessageResponse::new(
            "Password updated successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// Get current user information from the attached token
#[axum::debug_handler]
pub async fn me(
    Extension(user): Extension<User>,
) -> Result<ResponseJson<UserInfo>, (StatusCode, String)> {
    Ok(ResponseJson(UserInfo::from(user)))
}
