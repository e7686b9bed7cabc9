//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User profile row in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Identifier assigned by the identity provider at registration
    pub id: Uuid,
    pub email: String,
    /// Display name
    pub nome: String,
    /// Company name
    #[serde(default)]
    pub empresa: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload for a freshly registered user.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub nome: String,
    pub empresa: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile fields a user may change.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub nome: String,
    pub empresa: Option<String>,
    pub updated_at: DateTime<Utc>,
}
