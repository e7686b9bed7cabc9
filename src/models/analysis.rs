// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Market analysis records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provenance of a generated analysis, stored as JSON alongside the text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisMetadata {
    pub segmento: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Provider whose text was kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Providers that answered successfully (dual-provider mode only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_provider: Option<String>,
    pub web_results_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to_database: Option<bool>,
}

/// Full analysis row in the `analyses` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: Uuid,
    pub user_id: Uuid,
    pub segmento: String,
    #[serde(default)]
    pub contexto_adicional: Option<String>,
    /// Generated analysis text
    pub resultado: String,
    #[serde(default)]
    pub metadata: AnalysisMetadata,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// History listing row (result text omitted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub id: Uuid,
    pub segmento: String,
    #[serde(default)]
    pub contexto_adicional: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: AnalysisMetadata,
}

impl AnalysisSummary {
    /// Column list for history queries.
    pub const COLUMNS: &'static str = "id,segmento,contexto_adicional,created_at,metadata";
}

/// Insert payload for a new analysis.
#[derive(Debug, Clone, Serialize)]
pub struct NewAnalysis {
    pub user_id: Uuid,
    pub segmento: String,
    pub contexto_adicional: Option<String>,
    pub resultado: String,
    pub metadata: AnalysisMetadata,
    pub created_at: DateTime<Utc>,
}
