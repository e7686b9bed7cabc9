// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Web research via DuckDuckGo's HTML results page.
//!
//! Scraping is best effort: any failure yields no results rather than an
//! error, so an analysis can still be generated without web context.

use crate::error::AppError;
use crate::services::prompt::search_queries;
use scraper::{Html, Selector};
use serde::Serialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// Results kept per research query.
pub const RESULTS_PER_QUERY: usize = 3;

/// One scraped search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Search-page scraper.
#[derive(Clone)]
pub struct WebSearchService {
    http: reqwest::Client,
    base_url: String,
    enabled: bool,
    delay: Duration,
}

impl WebSearchService {
    pub fn new(base_url: &str, enabled: bool, delay: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build search HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            enabled,
            delay,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run the research queries for a segment one at a time.
    ///
    /// Queries are spaced by the configured delay to stay under the search
    /// engine's rate limits.
    pub async fn research(&self, segment: &str, year: i32) -> Vec<SearchResult> {
        if !self.enabled {
            return Vec::new();
        }

        let mut results = Vec::new();
        let queries = search_queries(segment, year);
        let last = queries.len().saturating_sub(1);
        for (i, query) in queries.iter().enumerate() {
            results.extend(self.search(query, RESULTS_PER_QUERY).await);
            if i < last && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        tracing::debug!(
            segment = %segment,
            results = results.len(),
            "Web research finished"
        );
        results
    }

    /// Fetch and parse one results page.
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        let url = format!("{}/html/?q={}", self.base_url, urlencoding::encode(query));

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Web search request failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(query = %query, status = %response.status(), "Web search returned error status");
            return Vec::new();
        }

        match response.text().await {
            Ok(html) => parse_results(&html, max_results),
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Failed to read web search body");
                Vec::new()
            }
        }
    }
}

/// Extract `.result` blocks from a results page.
///
/// Entries without both a title and a snippet are skipped.
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let (Ok(result_sel), Ok(title_sel), Ok(snippet_sel), Ok(url_sel)) = (
        Selector::parse(".result"),
        Selector::parse(".result__title"),
        Selector::parse(".result__snippet"),
        Selector::parse(".result__url"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let text_of = |el: scraper::ElementRef<'_>, sel: &Selector| {
        el.select(sel)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    };

    document
        .select(&result_sel)
        .take(max_results)
        .filter_map(|el| {
            let title = text_of(el, &title_sel);
            let snippet = text_of(el, &snippet_sel);
            if title.is_empty() || snippet.is_empty() {
                return None;
            }
            let url = el
                .select(&url_sel)
                .next()
                .and_then(|u| u.value().attr("href"))
                .unwrap_or_default()
                .to_string();
            Some(SearchResult {
                title,
                snippet,
                url,
            })
        })
        .collect()
}
