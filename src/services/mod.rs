// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod ai;
pub mod identity;
pub mod prompt;
pub mod web_search;

pub use ai::{AiService, MarketAnalysis, Provider, ProviderMode};
pub use identity::{IdentityService, IdentityUser, Session, SignUpMetadata};
pub use prompt::AnalysisContext;
pub use web_search::{SearchResult, WebSearchService};
