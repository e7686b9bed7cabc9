// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: registration, login, session refresh and profile.

use crate::error::{AppError, Result};
use crate::middleware::auth::{bearer_token, require_auth, AuthUser};
use crate::models::{NewUser, ProfileUpdate, User};
use crate::routes::ApiResponse;
use crate::services::{Session, SignUpMetadata};
use crate::validation::{non_blank, validate_password_strength, ValidatedJson};
use crate::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// User routes. Only `/profile` requires a bearer token.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
        .merge(protected)
}

// ─── Request bodies ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[serde(default)]
    #[validate(
        length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"),
        custom(function = "validate_password_strength")
    )]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub nome: String,
    #[validate(length(max = 100, message = "Company name must be at most 100 characters"))]
    pub empresa: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[serde(default)]
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub nome: String,
    #[validate(length(max = 100, message = "Company name must be at most 100 characters"))]
    pub empresa: Option<String>,
}

// ─── Responses ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct UserData {
    pub user: User,
}

#[derive(Serialize)]
pub struct LoginData {
    pub user: User,
    pub session: Session,
}

#[derive(Serialize)]
pub struct SessionData {
    pub session: Session,
}

// ─── Handlers ────────────────────────────────────────────────

/// Create the auth account, then the profile row.
///
/// If the profile insert fails the auth account is deleted again.
async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserData>>)> {
    if state.db.find_user_by_email(&body.email).await?.is_some() {
        return Err(AppError::BadRequest(
            "This email is already registered".to_string(),
        ));
    }

    let empresa = non_blank(body.empresa);
    let metadata = SignUpMetadata {
        nome: body.nome.clone(),
        empresa: empresa.clone(),
    };
    let user_id = state
        .identity
        .sign_up(&body.email, &body.password, &metadata)
        .await?;

    let new_user = NewUser {
        id: user_id,
        email: body.email,
        nome: body.nome,
        empresa,
        created_at: chrono::Utc::now(),
    };

    let user = match state.db.insert_user(&new_user).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to save user profile");
            if let Err(rollback) = state.identity.admin_delete_user(user_id).await {
                tracing::error!(user_id = %user_id, error = %rollback, "Failed to roll back auth user");
            }
            return Err(e);
        }
    };

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(
            UserData { user },
            "User created. Check your email to confirm the account.",
        ),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginData>>> {
    let (session, identity_user) = state
        .identity
        .sign_in_with_password(&body.email, &body.password)
        .await?;

    let user = state
        .db
        .get_user(identity_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User profile {} not found", identity_user.id)))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(ApiResponse::with_message(
        LoginData { user, session },
        "Logged in",
    ))
}

/// Revoke the caller's session if a token was sent. Always succeeds.
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<ApiResponse<()>> {
    if let Ok(Some(token)) = bearer_token(&headers) {
        if let Err(e) = state.identity.sign_out(token).await {
            tracing::warn!(error = %e, "Sign-out failed");
        }
    }

    ApiResponse::<()>::message("Logged out")
}

async fn refresh_token(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<SessionData>>> {
    let session = state.identity.refresh_session(&body.refresh_token).await?;
    Ok(ApiResponse::with_message(
        SessionData { session },
        "Token refreshed",
    ))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserData>>> {
    let user = state
        .db
        .get_user(auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.id)))?;

    Ok(ApiResponse::ok(UserData { user }))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<ProfileRequest>,
) -> Result<Json<ApiResponse<UserData>>> {
    let update = ProfileUpdate {
        nome: body.nome,
        empresa: non_blank(body.empresa),
        updated_at: chrono::Utc::now(),
    };

    let user = state
        .db
        .update_user_profile(auth.id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.id)))?;

    Ok(ApiResponse::with_message(UserData { user }, "Profile updated"))
}
