// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request body validation.
//!
//! `ValidatedJson` deserializes a JSON body and runs its `validator` rules,
//! turning every failure into a 400 with field-level details.

use crate::error::AppError;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// Characters accepted as "special" in passwords.
pub const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// JSON body extractor that also validates the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                AppError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
            })?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Password complexity rule.
///
/// Requires a lowercase letter, an uppercase letter, a digit and one of
/// `@$!%*?&`, and the first character must itself come from that alphabet.
/// Length is checked separately.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let is_special = |c: char| PASSWORD_SPECIALS.contains(c);

    let starts_ok = password
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || is_special(c));
    let strong = starts_ok
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(is_special);

    if strong {
        Ok(())
    } else {
        Err(ValidationError::new("password_strength").with_message(Cow::Borrowed(
            "Password must contain at least one lowercase letter, one uppercase letter, \
             one number and one special character (@$!%*?&)",
        )))
    }
}

/// Reject strings that are not hyphenated or simple-form UUIDs.
pub fn validate_uuid(value: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(value).map(|_| ()).map_err(|_| {
        ValidationError::new("uuid").with_message(Cow::Borrowed("Must be a valid UUID"))
    })
}

/// Deserialize a string with surrounding whitespace removed, so length
/// rules see the value that is actually used.
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

/// Treat blank optional text as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
