// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase Auth (GoTrue) client.
//!
//! Handles:
//! - Email/password sign-up and sign-in
//! - Session refresh and sign-out
//! - Bearer token validation (forwarded on every request, never cached)
//! - Admin deletion to roll back a half-finished registration

use crate::error::AppError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// User as reported by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Session tokens handed back to the client after login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as a Unix timestamp (seconds)
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Profile data attached to the auth user at sign-up.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpMetadata {
    pub nome: String,
    pub empresa: Option<String>,
}

/// Token endpoint response (password and refresh grants).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: IdentityUser,
}

impl TokenResponse {
    fn into_session(self) -> (Session, IdentityUser) {
        let expires_at = self.expires_at.or_else(|| {
            self.expires_in
                .map(|secs| chrono::Utc::now().timestamp() + secs)
        });
        (
            Session {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expires_at,
            },
            self.user,
        )
    }
}

/// Sign-up returns either a bare user (email confirmation pending) or a
/// session wrapping the user (auto-confirm enabled).
#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    user: Option<IdentityUser>,
}

/// GoTrue error bodies use several field names across versions.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self, status: StatusCode) -> String {
        self.msg
            .or(self.error_description)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| format!("HTTP {}", status))
    }
}

/// Identity provider client.
#[derive(Clone)]
pub struct IdentityService {
    http: reqwest::Client,
    auth_url: String,
    anon_key: String,
    service_key: Option<String>,
}

impl IdentityService {
    /// Create a new client for `{supabase_url}/auth/v1`.
    pub fn new(
        supabase_url: &str,
        anon_key: &str,
        service_key: Option<&str>,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Identity(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            auth_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
            service_key: service_key.map(str::to_string),
        })
    }

    /// Register a new account. Returns the identity-provider user ID.
    ///
    /// Rejections from the provider (weak password, disabled signups, ...)
    /// surface as `BadRequest` with the provider's message.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<Uuid, AppError> {
        let response = self
            .http
            .post(format!("{}/signup", self.auth_url))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Sign-up request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AppError::BadRequest(error_message(response).await));
        }
        let body: SignUpResponse = check_response_json(response).await?;

        body.user
            .map(|u| u.id)
            .or(body.id)
            .ok_or_else(|| AppError::Identity("Sign-up response missing user id".to_string()))
    }

    /// Exchange email + password for a session.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Session, IdentityUser), AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Sign-in request failed: {}", e)))?;

        if response.status().is_client_error() {
            tracing::debug!(status = %response.status(), "Sign-in rejected by identity provider");
            return Err(AppError::InvalidCredentials);
        }

        let token: TokenResponse = check_response_json(response).await?;
        Ok(token.into_session())
    }

    /// Exchange a refresh token for a new session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Token refresh request failed: {}", e)))?;

        if response.status().is_client_error() {
            return Err(AppError::InvalidToken);
        }

        let token: TokenResponse = check_response_json(response).await?;
        Ok(token.into_session().0)
    }

    /// Resolve the user behind an access token.
    pub async fn get_user(&self, access_token: &str) -> Result<IdentityUser, AppError> {
        let response = self
            .http
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Token verification failed: {}", e)))?;

        if response.status().is_client_error() {
            return Err(AppError::InvalidToken);
        }

        check_response_json(response).await
    }

    /// Revoke the session behind an access token.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Sign-out request failed: {}", e)))?;

        check_response(response).await
    }

    /// Delete an auth user with the service-role key.
    pub async fn admin_delete_user(&self, user_id: Uuid) -> Result<(), AppError> {
        let service_key = self.service_key.as_deref().ok_or_else(|| {
            AppError::Identity("SUPABASE_SERVICE_ROLE_KEY not configured".to_string())
        })?;

        let response = self
            .http
            .delete(format!("{}/admin/users/{}", self.auth_url, user_id))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Admin delete request failed: {}", e)))?;

        check_response(response).await?;
        tracing::info!(user_id = %user_id, "Rolled back identity user");
        Ok(())
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&body)
        .unwrap_or_default()
        .into_message(status)
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(AppError::Identity(error_message(response).await))
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        return Err(AppError::Identity(error_message(response).await));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Identity(format!("Invalid response body: {}", e)))
}
