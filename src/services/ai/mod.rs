// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Market analysis generation across two interchangeable text providers.
//!
//! Selection modes:
//! - `gemini` / `deepseek`: call that provider, and on failure retry once on
//!   the other one
//! - `both`: call both concurrently and keep whichever succeeded, preferring
//!   DeepSeek when both answer

pub mod deepseek;
pub mod gemini;

pub use deepseek::DeepSeekClient;
pub use gemini::GeminiClient;

use crate::config::Config;
use crate::error::AppError;
use crate::models::AnalysisMetadata;
use crate::services::prompt::{build_analysis_prompt, AnalysisContext, TrendHints, SYSTEM_PROMPT};
use crate::services::web_search::WebSearchService;
use chrono::Datelike;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A single text provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    DeepSeek,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::DeepSeek => "deepseek",
        }
    }

    /// The provider used as fallback for this one.
    pub fn other(self) -> Self {
        match self {
            Provider::Gemini => Provider::DeepSeek,
            Provider::DeepSeek => Provider::Gemini,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    Single(Provider),
    Both,
}

impl ProviderMode {
    pub const AVAILABLE: [&'static str; 3] = ["gemini", "deepseek", "both"];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderMode::Single(p) => p.as_str(),
            ProviderMode::Both => "both",
        }
    }

    /// Parse a configured value, falling back to Gemini on anything unknown.
    pub fn from_config(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!(provider = %value, "Invalid AI provider, using gemini");
            ProviderMode::Single(Provider::Gemini)
        })
    }
}

impl FromStr for ProviderMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderMode::Single(Provider::Gemini)),
            "deepseek" => Ok(ProviderMode::Single(Provider::DeepSeek)),
            "both" => Ok(ProviderMode::Both),
            other => Err(AppError::BadRequest(format!(
                "Unsupported AI provider: {}",
                other
            ))),
        }
    }
}

/// Text produced by one provider.
#[derive(Debug, Clone)]
struct Generation {
    provider: Provider,
    model: String,
    text: String,
}

/// Result of a market analysis request.
#[derive(Debug, Clone)]
pub struct MarketAnalysis {
    pub analysis: String,
    pub metadata: AnalysisMetadata,
}

/// Provider configuration summary for the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub current: &'static str,
    pub available: [&'static str; 3],
    pub has_gemini_key: bool,
    pub has_deep_seek_key: bool,
    pub web_search_enabled: bool,
}

/// Market analysis service.
#[derive(Clone)]
pub struct AiService {
    mode: ProviderMode,
    gemini: GeminiClient,
    deepseek: DeepSeekClient,
    web_search: WebSearchService,
}

impl AiService {
    pub fn new(
        mode: ProviderMode,
        gemini: GeminiClient,
        deepseek: DeepSeekClient,
        web_search: WebSearchService,
    ) -> Self {
        Self {
            mode,
            gemini,
            deepseek,
            web_search,
        }
    }

    /// Build the service and its clients from configuration.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let gemini = GeminiClient::new(
            &config.gemini_base_url,
            config.gemini_api_key.clone(),
            &config.gemini_model,
        )?;
        let deepseek = DeepSeekClient::new(
            &config.deepseek_base_url,
            config.deepseek_api_key.clone(),
            &config.deepseek_model,
        )?;
        let web_search = WebSearchService::new(
            &config.web_search_url,
            config.web_search_enabled,
            Duration::from_millis(config.web_search_delay_ms),
        )?;

        Ok(Self::new(
            ProviderMode::from_config(&config.ai_provider),
            gemini,
            deepseek,
            web_search,
        ))
    }

    pub fn mode(&self) -> ProviderMode {
        self.mode
    }

    pub fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            current: self.mode.as_str(),
            available: ProviderMode::AVAILABLE,
            has_gemini_key: self.gemini.has_key(),
            has_deep_seek_key: self.deepseek.has_key(),
            web_search_enabled: self.web_search.is_enabled(),
        }
    }

    /// Research the segment, build the prompt and generate the analysis.
    pub async fn analyze_market(&self, context: &AnalysisContext) -> Result<MarketAnalysis, AppError> {
        tracing::info!(
            segment = %context.segmento,
            user_id = %context.usuario_id,
            provider = self.mode.as_str(),
            "Starting market analysis"
        );

        let research = self
            .web_search
            .research(&context.segmento, context.requested_at.year())
            .await;
        let trends = TrendHints::for_segment(&context.segmento, context.requested_at);
        let prompt = build_analysis_prompt(context, &research, &trends);

        let mut metadata = AnalysisMetadata {
            segmento: context.segmento.clone(),
            web_results_count: research.len(),
            ..Default::default()
        };

        let generation = match self.mode {
            ProviderMode::Single(primary) => self.generate_with_fallback(primary, &prompt).await?,
            ProviderMode::Both => {
                let (generation, succeeded) = self.generate_with_both(&prompt).await?;
                metadata.providers = succeeded.iter().map(|p| p.to_string()).collect();
                metadata.primary_provider = Some(generation.provider.to_string());
                generation
            }
        };

        metadata.model = Some(generation.model);
        metadata.provider = Some(generation.provider.to_string());
        metadata.generated_at = Some(chrono::Utc::now());

        Ok(MarketAnalysis {
            analysis: generation.text,
            metadata,
        })
    }

    async fn generate(&self, provider: Provider, prompt: &str) -> Result<Generation, AppError> {
        let (text, model) = match provider {
            Provider::Gemini => (self.gemini.generate(prompt).await?, self.gemini.model()),
            Provider::DeepSeek => (
                self.deepseek.generate(SYSTEM_PROMPT, prompt).await?,
                self.deepseek.model(),
            ),
        };

        Ok(Generation {
            provider,
            model: model.to_string(),
            text,
        })
    }

    /// Call `primary`, retrying once on the other provider if it fails.
    ///
    /// When both fail the primary's error is returned.
    async fn generate_with_fallback(
        &self,
        primary: Provider,
        prompt: &str,
    ) -> Result<Generation, AppError> {
        let primary_err = match self.generate(primary, prompt).await {
            Ok(generation) => return Ok(generation),
            Err(e) => e,
        };

        let fallback = primary.other();
        tracing::warn!(
            provider = %primary,
            fallback = %fallback,
            error = %primary_err,
            "AI provider failed, trying fallback"
        );

        match self.generate(fallback, prompt).await {
            Ok(generation) => Ok(generation),
            Err(fallback_err) => {
                tracing::error!(provider = %fallback, error = %fallback_err, "Fallback AI provider failed");
                Err(primary_err)
            }
        }
    }

    /// Call both providers concurrently and wait for both to settle.
    ///
    /// Returns the kept generation plus every provider that succeeded.
    async fn generate_with_both(
        &self,
        prompt: &str,
    ) -> Result<(Generation, Vec<Provider>), AppError> {
        let (gemini, deepseek) = tokio::join!(
            self.generate(Provider::Gemini, prompt),
            self.generate(Provider::DeepSeek, prompt)
        );

        let mut succeeded = Vec::with_capacity(2);
        let gemini = match gemini {
            Ok(g) => {
                succeeded.push(Provider::Gemini);
                Some(g)
            }
            Err(e) => {
                tracing::error!(provider = "gemini", error = %e, "AI provider failed");
                None
            }
        };
        let deepseek = match deepseek {
            Ok(g) => {
                succeeded.push(Provider::DeepSeek);
                Some(g)
            }
            Err(e) => {
                tracing::error!(provider = "deepseek", error = %e, "AI provider failed");
                None
            }
        };

        deepseek
            .or(gemini)
            .map(|g| (g, succeeded))
            .ok_or_else(|| AppError::AiProvider("Both AI providers failed".to_string()))
    }
}
