// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Market Analyst API Server
//!
//! Generates AI market research for digital product launches, with accounts
//! and history stored in Supabase.

use market_analyst::{config::Config, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        environment = %config.environment,
        "Starting Market Analyst API"
    );

    let state = AppState::from_config(config.clone())?;
    let provider_info = state.ai_service.provider_info();
    tracing::info!(
        provider = provider_info.current,
        has_gemini_key = provider_info.has_gemini_key,
        has_deepseek_key = provider_info.has_deep_seek_key,
        web_search = provider_info.web_search_enabled,
        "AI service initialized"
    );
    if config.supabase_service_key.is_none() {
        tracing::warn!("SUPABASE_SERVICE_ROLE_KEY not set, registration rollback unavailable");
    }

    // Build router
    let app = market_analyst::routes::create_router(Arc::new(state));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["market_analyst=debug", "info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
