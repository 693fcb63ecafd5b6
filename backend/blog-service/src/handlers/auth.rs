//! Registration, login, and current-user handlers.

use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, ErrorResponse, Result};
use crate::middleware::UserId;
use crate::models::{AuthResponse, LoginRequest, NewUser, RegisterRequest, UserResponse};
use crate::security::{password, token};
use crate::AppState;

/// Create an account and sign its first token.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email or username already taken", body = ErrorResponse)
    )
)]
pub async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;

    if state.users.email_exists(&payload.email).await? {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }
    if state.users.username_exists(&payload.username).await? {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            id: Uuid::new_v4(),
            username: payload.username.clone(),
            email: payload.email.clone(),
            password_hash,
        })
        .await?;

    let access_token = token::generate_token(user.id)
        .map_err(|e| AppError::Internal(format!("Failed to issue token: {}", e)))?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(HttpResponse::Created().json(AuthResponse {
        token: access_token,
        user: UserResponse::from(user),
    }))
}

/// Exchange email and password for a token.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;

    // Unknown email and wrong password produce the same answer.
    let user = state
        .users
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

    if !password::verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Authentication(
            "Invalid email or password".to_string(),
        ));
    }

    let access_token = token::generate_token(user.id)
        .map_err(|e| AppError::Internal(format!("Failed to issue token: {}", e)))?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(HttpResponse::Ok().json(AuthResponse {
        token: access_token,
        user: UserResponse::from(user),
    }))
}

/// Current account, resolved from the bearer token.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "The authenticated account", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn me(state: web::Data<AppState>, user_id: UserId) -> Result<HttpResponse> {
    let user = super::require_user(state.users.as_ref(), user_id.0).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
