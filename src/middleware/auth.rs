// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.
//!
//! Tokens are opaque to this service: each request forwards the token to the
//! identity provider, which resolves it to a user or rejects it.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated user resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// `Ok(None)` means the header is absent; a present but malformed header is
/// an invalid token.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| AppError::InvalidToken)?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(AppError::InvalidToken),
    }
}

/// Middleware that requires a valid bearer token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?
        .ok_or(AppError::Unauthorized)?
        .to_string();
    let user = state.identity.get_user(&token).await?;

    tracing::debug!(user_id = %user.id, "Authenticated request");

    request.extensions_mut().insert(AuthUser { id: user.id });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token_missing() {
        assert!(matches!(bearer_token(&HeaderMap::new()), Ok(None)));
    }

    #[test]
    fn test_bearer_token_parsed() {
        let h = headers("Bearer abc.def");
        assert_eq!(bearer_token(&h).unwrap(), Some("abc.def"));
        let h = headers("bearer xyz");
        assert_eq!(bearer_token(&h).unwrap(), Some("xyz"));
    }

    #[test]
    fn test_bearer_token_malformed() {
        assert!(matches!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer ")),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            bearer_token(&headers("token-without-scheme")),
            Err(AppError::InvalidToken)
        ));
    }
}
