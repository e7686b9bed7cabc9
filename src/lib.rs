// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Market Analyst: AI-generated market research for digital product launches
//!
//! This crate provides the backend API. Accounts and storage live in a hosted
//! Supabase project; analyses are generated by Gemini or DeepSeek, enriched
//! with web search snippets.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod validation;

use config::Config;
use db::SupabaseDb;
use error::AppError;
use middleware::RateLimiter;
use services::{AiService, IdentityService};
use std::time::{Duration, Instant};

/// Window for the per-IP analysis limiter.
pub const ANALYSIS_RATE_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: SupabaseDb,
    pub identity: IdentityService,
    pub ai_service: AiService,
    pub api_limiter: RateLimiter,
    pub analysis_limiter: RateLimiter,
    pub started_at: Instant,
}

impl AppState {
    /// Build every client from configuration.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        error::expose_internal_details(!config.is_production());

        // Row access goes through the service key when one is configured
        let db_key = config
            .supabase_service_key
            .as_deref()
            .unwrap_or(&config.supabase_anon_key);
        let db = SupabaseDb::new(&config.supabase_url, db_key)?;

        let identity = IdentityService::new(
            &config.supabase_url,
            &config.supabase_anon_key,
            config.supabase_service_key.as_deref(),
        )?;
        let ai_service = AiService::from_config(&config)?;

        let api_limiter = RateLimiter::new(
            config.rate_limit_max_requests,
            Duration::from_millis(config.rate_limit_window_ms),
        );
        let analysis_limiter =
            RateLimiter::new(config.analysis_rate_limit_max, ANALYSIS_RATE_WINDOW);

        Ok(Self {
            config,
            db,
            identity,
            ai_service,
            api_limiter,
            analysis_limiter,
            started_at: Instant::now(),
        })
    }
}
