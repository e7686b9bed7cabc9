// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod analysis;
pub mod users;

use crate::error::AppError;
use crate::middleware::rate_limit::limit_api;
use crate::AppState;
use axum::extract::{OriginalUri, State};
use axum::http::{header, HeaderValue, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Success envelope shared by every API handler.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: None,
        })
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        })
    }
}

impl ApiResponse<()> {
    /// Envelope carrying only a message.
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            message: Some(message.into()),
        })
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since the server started
    pub uptime: f64,
    pub environment: String,
}

/// Health check response
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: crate::time_utils::format_utc_rfc3339(chrono::Utc::now()),
        uptime: state.started_at.elapsed().as_secs_f64(),
        environment: state.config.environment.clone(),
    })
}

#[derive(Serialize)]
struct ApiEndpoints {
    health: &'static str,
    analysis: &'static str,
    users: &'static str,
}

#[derive(Serialize)]
struct ApiInfo {
    message: &'static str,
    version: &'static str,
    endpoints: ApiEndpoints,
}

async fn api_info() -> Json<ApiInfo> {
    Json(ApiInfo {
        message: "Market Analyst API - AI market research",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ApiEndpoints {
            health: "/health",
            analysis: "/api/analysis",
            users: "/api/users",
        },
    })
}

async fn api_not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(format!("Route {} does not exist", uri.path()))
}

/// Build the CORS layer from the configured origins.
///
/// Outside production any localhost origin is accepted as well.
fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = state.config.cors_origins.clone();
    let any_origin = state.config.allows_any_origin();
    let allow_localhost = !state.config.is_production();

    let allow_origin = AllowOrigin::predicate(
        move |origin: &HeaderValue, _request_parts: &axum::http::request::Parts| {
            let origin_str = origin.to_str().unwrap_or("");
            any_origin
                || origins.iter().any(|o| o == origin_str)
                || (allow_localhost
                    && (origin_str.starts_with("http://localhost")
                        || origin_str.starts_with("http://127.0.0.1")))
        },
    );

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state);

    let api_routes = Router::new()
        .route("/", get(api_info))
        .nest("/users", users::routes(state.clone()))
        .nest("/analysis", analysis::routes(state.clone()))
        .fallback(api_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), limit_api));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
