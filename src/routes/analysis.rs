// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Market analysis routes (all require authentication).

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_auth, AuthUser};
use crate::middleware::rate_limit::limit_analysis;
use crate::models::pagination::{default_limit, default_page, PageQuery, PageRequest};
use crate::models::stats::{top_segments, TOP_SEGMENTS_LIMIT};
use crate::models::{Analysis, AnalysisMetadata, AnalysisSummary, NewAnalysis, Pagination, StatsOverview};
use crate::routes::ApiResponse;
use crate::services::ai::ProviderInfo;
use crate::services::AnalysisContext;
use crate::time_utils::start_of_month;
use crate::validation::{non_blank, trimmed, validate_uuid, ValidatedJson};
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

/// Analysis routes. Generation has its own, stricter rate limit.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/market",
            post(create_market_analysis).layer(middleware::from_fn_with_state(
                state.clone(),
                limit_analysis,
            )),
        )
        .route("/history", get(get_history))
        .route("/search", get(search_history))
        .route("/stats/overview", get(get_stats_overview))
        .route("/providers", get(get_providers))
        .route("/{id}", get(get_analysis).delete(delete_analysis))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

// ─── Market Analysis ─────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct MarketRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 2, max = 100, message = "Segment must be between 2 and 100 characters"))]
    pub segmento: String,
    #[validate(length(max = 2000, message = "Additional context must be at most 2000 characters"))]
    pub contexto_adicional: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_uuid"))]
    pub usuario_id: String,
}

/// Generated analysis returned to the client.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub struct MarketAnalysisResponse {
    /// `None` when the analysis could not be stored
    pub id: Option<Uuid>,
    pub segmento: String,
    pub analysis: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "Record<string, unknown>"))]
    pub metadata: AnalysisMetadata,
}

/// Generate, store and return a market analysis.
///
/// A storage failure after a successful generation is not fatal: the
/// analysis is still returned, with `id: null` and `savedToDatabase: false`.
async fn create_market_analysis(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<MarketRequest>,
) -> Result<Json<ApiResponse<MarketAnalysisResponse>>> {
    let started = Instant::now();

    let usuario_id = Uuid::parse_str(&body.usuario_id)
        .map_err(|_| AppError::BadRequest("usuario_id must be a valid UUID".to_string()))?;
    if usuario_id != auth.id {
        return Err(AppError::Forbidden(
            "usuario_id does not match the authenticated user".to_string(),
        ));
    }

    let context = AnalysisContext {
        segmento: body.segmento,
        contexto_adicional: non_blank(body.contexto_adicional),
        usuario_id,
        requested_at: chrono::Utc::now(),
    };

    let result = state.ai_service.analyze_market(&context).await?;

    let new_analysis = NewAnalysis {
        user_id: auth.id,
        segmento: context.segmento.clone(),
        contexto_adicional: context.contexto_adicional.clone(),
        resultado: result.analysis.clone(),
        metadata: result.metadata.clone(),
        created_at: chrono::Utc::now(),
    };

    let saved_id = match state.db.insert_analysis(&new_analysis).await {
        Ok(saved) => Some(saved.id),
        Err(e) => {
            tracing::error!(user_id = %auth.id, error = %e, "Failed to save analysis");
            None
        }
    };

    let mut metadata = result.metadata;
    metadata.processing_time_ms = Some(started.elapsed().as_millis() as u64);
    metadata.saved_to_database = Some(saved_id.is_some());

    tracing::info!(
        user_id = %auth.id,
        segment = %context.segmento,
        saved = saved_id.is_some(),
        processing_time_ms = metadata.processing_time_ms,
        "Market analysis completed"
    );

    Ok(ApiResponse::with_message(
        MarketAnalysisResponse {
            id: saved_id,
            segmento: context.segmento,
            analysis: result.analysis,
            metadata,
        },
        "Market analysis completed",
    ))
}

// ─── History & Search ────────────────────────────────────────

/// Paginated list of analysis summaries.
#[derive(Debug, Serialize)]
pub struct AnalysisList {
    pub analyses: Vec<AnalysisSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub segmento: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn query_params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(q)| q)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<AnalysisList>>> {
    let query = query_params(query)?;
    let request = PageRequest::from_query(query.page, query.limit)?;

    let page = state
        .db
        .list_analyses(auth.id, request.offset(), request.limit)
        .await?;

    Ok(ApiResponse::ok(AnalysisList {
        analyses: page.rows,
        pagination: Pagination::new(request, page.total),
    }))
}

async fn search_history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<AnalysisList>>> {
    let query = query_params(query)?;
    let segment = query.segmento.trim();
    if segment.is_empty() {
        return Err(AppError::BadRequest(
            "Query parameter segmento is required".to_string(),
        ));
    }
    let request = PageRequest::from_query(query.page, query.limit)?;

    let page = state
        .db
        .search_analyses(auth.id, segment, request.offset(), request.limit)
        .await?;

    Ok(ApiResponse::ok(AnalysisList {
        analyses: page.rows,
        pagination: Pagination::new(request, page.total),
    }))
}

// ─── Stats & Providers ───────────────────────────────────────

async fn get_stats_overview(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<StatsOverview>>> {
    let month_start = start_of_month(chrono::Utc::now());

    let total_analyses = state.db.count_analyses(auth.id, None).await?;
    let this_month = state.db.count_analyses(auth.id, Some(month_start)).await?;
    let segments = state.db.list_segments(auth.id).await?;

    Ok(ApiResponse::ok(StatsOverview {
        total_analyses,
        this_month,
        top_segments: top_segments(segments, TOP_SEGMENTS_LIMIT),
    }))
}

async fn get_providers(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ProviderInfo>> {
    ApiResponse::ok(state.ai_service.provider_info())
}

// ─── Single Analysis ─────────────────────────────────────────

/// IDs that are not UUIDs cannot name a stored analysis.
fn parse_analysis_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| AppError::NotFound(format!("Analysis {} not found", id)))
}

async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Analysis>>> {
    let analysis_id = parse_analysis_id(&id)?;
    let analysis = state
        .db
        .get_analysis(analysis_id, auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {} not found", analysis_id)))?;

    Ok(ApiResponse::ok(analysis))
}

async fn delete_analysis(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    let analysis_id = parse_analysis_id(&id)?;
    if !state.db.delete_analysis(analysis_id, auth.id).await? {
        return Err(AppError::NotFound(format!(
            "Analysis {} not found",
            analysis_id
        )));
    }

    tracing::info!(user_id = %auth.id, analysis_id = %analysis_id, "Analysis deleted");
    Ok(ApiResponse::<()>::message("Analysis deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market_body(segmento: &str, usuario_id: &str) -> MarketRequest {
        MarketRequest {
            segmento: segmento.to_string(),
            contexto_adicional: None,
            usuario_id: usuario_id.to_string(),
        }
    }

    #[test]
    fn test_market_request_rules() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        assert!(market_body("tecnologia", id).validate().is_ok());
        assert!(market_body("", id).validate().is_err());
        assert!(market_body("x", id).validate().is_err());
        assert!(market_body(&"x".repeat(101), id).validate().is_err());
        assert!(market_body("tecnologia", "123").validate().is_err());

        let mut body = market_body("tecnologia", id);
        body.contexto_adicional = Some("c".repeat(2001));
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_market_request_segment_is_trimmed_before_validation() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        let parse = |segmento: &str| -> MarketRequest {
            serde_json::from_value(serde_json::json!({ "segmento": segmento, "usuario_id": id }))
                .unwrap()
        };

        let body = parse("  moda  ");
        assert_eq!(body.segmento, "moda");
        assert!(body.validate().is_ok());
        assert!(parse("   ").validate().is_err());
        assert!(parse(" a ").validate().is_err());
    }

    #[test]
    fn test_parse_analysis_id() {
        assert!(parse_analysis_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(matches!(
            parse_analysis_id("abc"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_search_query_defaults() {
        let query: SearchQuery = serde_json::from_str(r#"{"segmento":"moda"}"#).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 10);
    }
}
