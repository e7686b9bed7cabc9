// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase REST (PostgREST) client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile rows mirrored from the identity provider)
//! - Analyses (generated market analyses, always filtered by owner)
//!
//! The hosted database is treated as an opaque request/response store: every
//! operation is a single HTTP call and ownership is enforced with an
//! equality filter on `user_id`.

use crate::db::tables;
use crate::error::AppError;
use crate::models::{
    Analysis, AnalysisSummary, NewAnalysis, NewUser, ProfileUpdate, User,
};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_RANGE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_COLUMNS: &str = "id,email,nome,empresa,created_at,updated_at";

/// Page of rows plus the exact total reported by the server.
#[derive(Debug, Clone)]
pub struct CountedRows<T> {
    pub rows: Vec<T>,
    pub total: u64,
}

/// Supabase database client.
#[derive(Clone)]
pub struct SupabaseDb {
    http: reqwest::Client,
    rest_url: String,
    api_key: String,
}

impl SupabaseDb {
    /// Create a new client for `{supabase_url}/rest/v1`.
    ///
    /// `api_key` is sent both as `apikey` and as bearer; the service-role key
    /// is preferred server-side when configured.
    pub fn new(supabase_url: &str, api_key: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Storage(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn headers(&self, prefer: Option<&'static str>) -> Result<HeaderMap, AppError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| AppError::Storage("Invalid Supabase API key".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| AppError::Storage("Invalid Supabase API key".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);
        if let Some(prefer) = prefer {
            headers.insert("Prefer", HeaderValue::from_static(prefer));
        }
        Ok(headers)
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user profile by identity-provider ID.
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let rows: Vec<User> = self
            .select(
                tables::USERS,
                &[("select", USER_COLUMNS.to_string()), ("id", eq(user_id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Look up a user profile by email (used for duplicate detection).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let rows: Vec<User> = self
            .select(
                tables::USERS,
                &[
                    ("select", USER_COLUMNS.to_string()),
                    ("email", eq(email)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Insert a new user profile and return the stored row.
    pub async fn insert_user(&self, user: &NewUser) -> Result<User, AppError> {
        self.insert(tables::USERS, user).await
    }

    /// Update the editable profile fields. Returns `None` if no row matched.
    pub async fn update_user_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AppError> {
        let response = self
            .http
            .patch(self.table_url(tables::USERS))
            .headers(self.headers(Some("return=representation"))?)
            .query(&[("id", eq(user_id))])
            .json(update)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let rows: Vec<User> = check_response_json(response).await?;
        Ok(rows.into_iter().next())
    }

    // ─── Analysis Operations ─────────────────────────────────────

    /// Store a new analysis and return the stored row.
    pub async fn insert_analysis(&self, analysis: &NewAnalysis) -> Result<Analysis, AppError> {
        self.insert(tables::ANALYSES, analysis).await
    }

    /// Get one analysis, only if it belongs to `user_id`.
    pub async fn get_analysis(
        &self,
        analysis_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Analysis>, AppError> {
        let rows: Vec<Analysis> = self
            .select(
                tables::ANALYSES,
                &[
                    ("select", "*".to_string()),
                    ("id", eq(analysis_id)),
                    ("user_id", eq(user_id)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// List a user's analyses, newest first, with the exact total.
    pub async fn list_analyses(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<CountedRows<AnalysisSummary>, AppError> {
        self.select_counted(
            tables::ANALYSES,
            vec![
                ("select", AnalysisSummary::COLUMNS.to_string()),
                ("user_id", eq(user_id)),
            ],
            offset,
            limit,
        )
        .await
    }

    /// List a user's analyses whose segment contains `segment` (case-insensitive).
    pub async fn search_analyses(
        &self,
        user_id: Uuid,
        segment: &str,
        offset: u64,
        limit: u64,
    ) -> Result<CountedRows<AnalysisSummary>, AppError> {
        self.select_counted(
            tables::ANALYSES,
            vec![
                ("select", AnalysisSummary::COLUMNS.to_string()),
                ("user_id", eq(user_id)),
                ("segmento", ilike_contains(segment)),
            ],
            offset,
            limit,
        )
        .await
    }

    /// Delete an analysis owned by `user_id`. Returns whether a row was removed.
    pub async fn delete_analysis(&self, analysis_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let response = self
            .http
            .delete(self.table_url(tables::ANALYSES))
            .headers(self.headers(Some("return=representation"))?)
            .query(&[("id", eq(analysis_id)), ("user_id", eq(user_id))])
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let deleted: Vec<serde_json::Value> = check_response_json(response).await?;
        Ok(!deleted.is_empty())
    }

    /// Count a user's analyses, optionally only those created at or after `since`.
    pub async fn count_analyses(
        &self,
        user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64, AppError> {
        let mut query = vec![("select", "id".to_string()), ("user_id", eq(user_id))];
        if let Some(since) = since {
            query.push(("created_at", format!("gte.{}", since.to_rfc3339())));
        }

        let response = self
            .http
            .head(self.table_url(tables::ANALYSES))
            .headers(self.headers(Some("count=exact"))?)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let response = check_response(response).await?;
        total_from_headers(response.headers())
    }

    /// All segment strings a user has analysed (for ranking).
    pub async fn list_segments(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        #[derive(Deserialize)]
        struct SegmentRow {
            segmento: String,
        }

        let rows: Vec<SegmentRow> = self
            .select(
                tables::ANALYSES,
                &[("select", "segmento".to_string()), ("user_id", eq(user_id))],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.segmento).collect())
    }

    // ─── Request helpers ─────────────────────────────────────────

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, AppError> {
        let response = self
            .http
            .get(self.table_url(table))
            .headers(self.headers(None)?)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        check_response_json(response).await
    }

    async fn select_counted<T: DeserializeOwned>(
        &self,
        table: &str,
        mut query: Vec<(&str, String)>,
        offset: u64,
        limit: u64,
    ) -> Result<CountedRows<T>, AppError> {
        query.push(("order", "created_at.desc".to_string()));
        query.push(("offset", offset.to_string()));
        query.push(("limit", limit.to_string()));

        let response = self
            .http
            .get(self.table_url(table))
            .headers(self.headers(Some("count=exact"))?)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let response = check_response(response).await?;
        let total = total_from_headers(response.headers())?;
        let rows = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Invalid response body: {}", e)))?;

        Ok(CountedRows { rows, total })
    }

    async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .post(self.table_url(table))
            .headers(self.headers(Some("return=representation"))?)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let rows: Vec<T> = check_response_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Storage(format!("Insert into {} returned no row", table)))
    }
}

/// PostgREST equality filter value.
fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

/// PostgREST case-insensitive substring filter value.
fn ilike_contains(value: &str) -> String {
    // `*` is the URL-safe wildcard; strip the ones a caller might send
    format!("ilike.*{}*", value.replace(['*', '%'], ""))
}

/// Parse the total out of `Content-Range: 0-9/42` (or `*/0`).
fn total_from_headers(headers: &HeaderMap) -> Result<u64, AppError> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range_total)
        .ok_or_else(|| AppError::Storage("Missing or invalid Content-Range header".to_string()))
}

fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Storage(format!("HTTP {}: {}", status, body)))
}

/// Check response and parse JSON body.
async fn check_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    check_response(response)
        .await?
        .json()
        .await
        .map_err(|e| AppError::Storage(format!("Invalid response body: {}", e)))
}
