//! Application configuration loaded from environment variables.
//!
//! Keys for the hosted services are read once at startup and kept in memory.

use std::env;

/// Environment name that hides internal error details from API responses.
pub const PRODUCTION_ENV: &str = "production";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Server ---
    /// Server port
    pub port: u16,
    /// Deployment environment (`development`, `production`, ...)
    pub environment: String,
    /// Allowed CORS origins; `*` allows any origin
    pub cors_origins: Vec<String>,

    // --- Supabase (auth + storage) ---
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub supabase_url: String,
    /// Public anon key
    pub supabase_anon_key: String,
    /// Service-role key for admin operations (optional)
    pub supabase_service_key: Option<String>,

    // --- AI providers ---
    /// Provider selection: `gemini`, `deepseek` or `both`
    pub ai_provider: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub deepseek_api_key: Option<String>,
    pub deepseek_model: String,
    pub deepseek_base_url: String,

    // --- Web research ---
    pub web_search_enabled: bool,
    pub web_search_url: String,
    /// Pause between consecutive search queries (milliseconds)
    pub web_search_delay_ms: u64,

    // --- Rate limiting ---
    /// Window for the general `/api` limiter (milliseconds)
    pub rate_limit_window_ms: u64,
    /// Requests allowed per client IP per window on `/api`
    pub rate_limit_max_requests: u32,
    /// Market analyses allowed per client IP per hour
    pub analysis_rate_limit_max: u32,
    /// Key rate limits on the first `X-Forwarded-For` hop instead of the
    /// socket peer. Only safe behind a proxy that overwrites the header.
    pub trust_proxy: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let environment = env::var("APP_ENV")
            .or_else(|_| env::var("NODE_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            port: parse_or("PORT", 3000),
            environment,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| split_origins(&v))
                .unwrap_or_default(),

            supabase_url: env::var("SUPABASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            supabase_service_key: optional_secret("SUPABASE_SERVICE_ROLE_KEY"),

            ai_provider: env::var("AI_PROVIDER").unwrap_or_else(|_| "gemini".to_string()),
            gemini_api_key: optional_secret("GEMINI_API_KEY"),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash-exp".to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            deepseek_api_key: optional_secret("DEEPSEEK_API_KEY"),
            deepseek_model: env::var("DEEPSEEK_MODEL")
                .unwrap_or_else(|_| "deepseek-chat".to_string()),
            deepseek_base_url: env::var("DEEPSEEK_BASE_URL")
                .unwrap_or_else(|_| "https://api.deepseek.com/v1".to_string()),

            web_search_enabled: env::var("WEB_SEARCH_ENABLED")
                .map(|v| !matches!(v.trim(), "false" | "0" | "off"))
                .unwrap_or(true),
            web_search_url: env::var("WEB_SEARCH_URL")
                .unwrap_or_else(|_| "https://duckduckgo.com".to_string()),
            web_search_delay_ms: parse_or("WEB_SEARCH_DELAY_MS", 1000),

            rate_limit_window_ms: parse_or("RATE_LIMIT_WINDOW_MS", 15 * 60 * 1000),
            rate_limit_max_requests: parse_or("RATE_LIMIT_MAX_REQUESTS", 100),
            analysis_rate_limit_max: parse_or("ANALYSIS_RATE_LIMIT_MAX", 10),
            trust_proxy: env::var("TRUST_PROXY")
                .map(|v| matches!(v.trim(), "true" | "1" | "on"))
                .unwrap_or(false),
        })
    }

    /// Config for tests: every outbound URL points at `base_url`.
    pub fn test_default(base_url: &str) -> Self {
        Self {
            port: 3000,
            environment: "test".to_string(),
            cors_origins: vec!["http://localhost:5173".to_string()],
            supabase_url: base_url.to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            supabase_service_key: Some("test_service_key".to_string()),
            ai_provider: "gemini".to_string(),
            gemini_api_key: Some("test_gemini_key".to_string()),
            gemini_model: "gemini-2.0-flash-exp".to_string(),
            gemini_base_url: format!("{}/gemini", base_url),
            deepseek_api_key: Some("test_deepseek_key".to_string()),
            deepseek_model: "deepseek-chat".to_string(),
            deepseek_base_url: format!("{}/deepseek", base_url),
            web_search_enabled: true,
            web_search_url: format!("{}/search", base_url),
            web_search_delay_ms: 0,
            rate_limit_window_ms: 15 * 60 * 1000,
            rate_limit_max_requests: 1000,
            analysis_rate_limit_max: 100,
            trust_proxy: false,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case(PRODUCTION_ENV)
    }

    /// Whether `CORS_ORIGINS` contains the `*` wildcard.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn optional_secret(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
