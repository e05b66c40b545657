//! Configuration management.
//!
//! Settings come from, in increasing priority: built-in defaults, an optional
//! TOML file and `UNIFIED_SEARCH__SECTION__KEY` environment variables.
//! Provider credentials additionally default from `GOOGLE_API_KEY`,
//! `GOOGLE_CSE_ID` and `YOUTUBE_API_KEY`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::SourceKind;
use crate::utils::RetryConfig;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "UNIFIED_SEARCH";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API keys for the providers
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Rate limiting settings
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Orchestrator settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Academic provider settings
    #[serde(default)]
    pub academic: AcademicConfig,

    /// Web provider settings
    #[serde(default)]
    pub web: WebConfig,

    /// Video provider settings
    #[serde(default)]
    pub video: VideoConfig,

    /// Daily quota ceilings
    #[serde(default)]
    pub quotas: QuotaConfig,

    /// Retry/backoff settings for the JSON APIs
    #[serde(default)]
    pub retry: RetrySettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API keys for external services
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Google API key used by Custom Search
    #[serde(default)]
    pub google_api_key: Option<String>,

    /// Custom Search engine id (cx)
    #[serde(default)]
    pub google_cse_id: Option<String>,

    /// YouTube Data API key
    #[serde(default)]
    pub youtube_api_key: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            google_api_key: non_empty_env("GOOGLE_API_KEY"),
            google_cse_id: non_empty_env("GOOGLE_CSE_ID"),
            youtube_api_key: non_empty_env("YOUTUBE_API_KEY"),
        }
    }
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(key: &Option<String>) -> &'static str {
            if key.is_some() {
                "<set>"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("ApiKeys")
            .field("google_api_key", &mask(&self.google_api_key))
            .field("google_cse_id", &mask(&self.google_cse_id))
            .field("youtube_api_key", &mask(&self.youtube_api_key))
            .finish()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_http_timeout() -> u64 {
    30
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum entries held by the in-process cache
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,

    /// Fallback TTL in seconds
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: u64,

    /// Academic search TTL in seconds
    #[serde(default = "default_academic_ttl")]
    pub academic_ttl_secs: u64,

    /// Author profile TTL in seconds
    #[serde(default = "default_author_ttl")]
    pub author_ttl_secs: u64,

    /// Web search TTL in seconds
    #[serde(default = "default_ttl")]
    pub web_ttl_secs: u64,

    /// Video search TTL in seconds
    #[serde(default = "default_ttl")]
    pub video_ttl_secs: u64,

    /// Composite response TTL in seconds
    #[serde(default = "default_unified_ttl")]
    pub unified_ttl_secs: u64,

    /// Redis URL; the in-process cache is used when unset or unreachable
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Namespace for Redis keys
    #[serde(default = "default_redis_prefix")]
    pub redis_key_prefix: String,

    /// Upper bound for a single remote cache operation in milliseconds
    #[serde(default = "default_cache_op_timeout")]
    pub operation_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
            default_ttl_secs: default_ttl(),
            academic_ttl_secs: default_academic_ttl(),
            author_ttl_secs: default_author_ttl(),
            web_ttl_secs: default_ttl(),
            video_ttl_secs: default_ttl(),
            unified_ttl_secs: default_unified_ttl(),
            redis_url: None,
            redis_key_prefix: default_redis_prefix(),
            operation_timeout_ms: default_cache_op_timeout(),
        }
    }
}

impl CacheConfig {
    /// Result TTL for one provider
    pub fn ttl_for(&self, kind: SourceKind) -> Duration {
        Duration::from_secs(match kind {
            SourceKind::Academic => self.academic_ttl_secs,
            SourceKind::Web => self.web_ttl_secs,
            SourceKind::Video => self.video_ttl_secs,
        })
    }

    pub fn author_ttl(&self) -> Duration {
        Duration::from_secs(self.author_ttl_secs)
    }

    pub fn unified_ttl(&self) -> Duration {
        Duration::from_secs(self.unified_ttl_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> u64 {
    1000
}

fn default_ttl() -> u64 {
    3600
}

fn default_academic_ttl() -> u64 {
    7200
}

fn default_author_ttl() -> u64 {
    86400
}

fn default_unified_ttl() -> u64 {
    1800
}

fn default_redis_prefix() -> String {
    "unified_search".to_string()
}

fn default_cache_op_timeout() -> u64 {
    2000
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether the per-source sliding window is enforced
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests admitted per source within one window
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Window length in seconds
    #[serde(default = "default_window")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

fn default_max_requests() -> usize {
    100
}

fn default_window() -> u64 {
    3600
}

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results per source when a caller does not say
    #[serde(default = "default_num_results")]
    pub default_num_results: usize,

    /// Upper bound for one source's part of a unified search, in seconds
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_num_results: default_num_results(),
            source_timeout_secs: default_source_timeout(),
        }
    }
}

impl SearchConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

fn default_num_results() -> usize {
    crate::models::DEFAULT_NUM_RESULTS
}

fn default_source_timeout() -> u64 {
    60
}

/// Academic provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicConfig {
    /// Whether the academic adapter is registered
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Scholar base URL
    #[serde(default = "default_scholar_url")]
    pub base_url: String,

    /// Minimum time between upstream requests in milliseconds
    #[serde(default = "default_request_spacing")]
    pub request_spacing_ms: u64,

    /// Attempts per search, including the first
    #[serde(default = "default_academic_attempts")]
    pub max_attempts: u32,

    /// Minimum backoff after a CAPTCHA page, in seconds
    #[serde(default = "default_blocked_delay")]
    pub blocked_delay_secs: u64,
}

impl Default for AcademicConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_scholar_url(),
            request_spacing_ms: default_request_spacing(),
            max_attempts: default_academic_attempts(),
            blocked_delay_secs: default_blocked_delay(),
        }
    }
}

fn default_scholar_url() -> String {
    "https://scholar.google.com".to_string()
}

fn default_request_spacing() -> u64 {
    2000
}

fn default_academic_attempts() -> u32 {
    3
}

fn default_blocked_delay() -> u64 {
    5
}

/// Web provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebConfig {
    /// Custom Search endpoint
    #[serde(default = "default_cse_url")]
    pub base_url: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            base_url: default_cse_url(),
        }
    }
}

fn default_cse_url() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

/// Video provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// YouTube Data API root
    #[serde(default = "default_youtube_url")]
    pub base_url: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            base_url: default_youtube_url(),
        }
    }
}

fn default_youtube_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

/// Daily quota ceilings, counted in upstream searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_daily_limit")]
    pub web_daily_limit: u64,

    #[serde(default = "default_daily_limit")]
    pub video_daily_limit: u64,

    /// Academic scraping has no published quota; `None` means unlimited
    #[serde(default)]
    pub academic_daily_limit: Option<u64>,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            web_daily_limit: default_daily_limit(),
            video_daily_limit: default_daily_limit(),
            academic_daily_limit: None,
        }
    }
}

impl QuotaConfig {
    /// Ceiling for one provider, if it has one
    pub fn limit_for(&self, kind: SourceKind) -> Option<u64> {
        match kind {
            SourceKind::Academic => self.academic_daily_limit,
            SourceKind::Web => Some(self.web_daily_limit),
            SourceKind::Video => Some(self.video_daily_limit),
        }
    }
}

fn default_daily_limit() -> u64 {
    100
}

/// Retry settings, converted into [`RetryConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_multiplier(),
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            ..RetryConfig::default()
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Invalid configuration value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid configuration: {field} {reason}")]
pub struct ConfigValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl Config {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        fn check(ok: bool, field: &'static str, reason: &str) -> Result<(), ConfigValidationError> {
            if ok {
                Ok(())
            } else {
                Err(ConfigValidationError {
                    field,
                    reason: reason.to_string(),
                })
            }
        }

        check(
            (1..=300).contains(&self.http.timeout_secs),
            "http.timeout_secs",
            "must be between 1 and 300",
        )?;
        check(
            (1..=100_000).contains(&self.cache.max_entries),
            "cache.max_entries",
            "must be between 1 and 100000",
        )?;
        check(
            (60..=86_400).contains(&self.cache.default_ttl_secs),
            "cache.default_ttl_secs",
            "must be between 60 and 86400",
        )?;
        check(
            self.rate_limits.max_requests >= 1,
            "rate_limits.max_requests",
            "must be at least 1",
        )?;
        check(
            (60..=86_400).contains(&self.rate_limits.window_secs),
            "rate_limits.window_secs",
            "must be between 60 and 86400",
        )?;
        check(
            (1..=50).contains(&self.search.default_num_results),
            "search.default_num_results",
            "must be between 1 and 50",
        )?;
        check(
            self.search.source_timeout_secs >= 1,
            "search.source_timeout_secs",
            "must be at least 1",
        )?;
        check(
            self.retry.max_attempts >= 1 && self.academic.max_attempts >= 1,
            "max_attempts",
            "must be at least 1",
        )?;
        check(
            self.retry.backoff_multiplier >= 1.0,
            "retry.backoff_multiplier",
            "must be at least 1.0",
        )?;
        check(
            self.retry.initial_delay_ms <= self.retry.max_delay_ms,
            "retry.initial_delay_ms",
            "must not exceed retry.max_delay_ms",
        )?;
        Ok(())
    }

    /// Render the configuration as TOML, with credentials masked
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        let mut masked = self.clone();
        for key in [
            &mut masked.api_keys.google_api_key,
            &mut masked.api_keys.google_cse_id,
            &mut masked.api_keys.youtube_api_key,
        ] {
            if key.is_some() {
                *key = Some("********".to_string());
            }
        }
        toml::to_string_pretty(&masked)
    }
}

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    // File/env values win; fill credentials still missing from the plain env vars
    let env_keys = ApiKeys::default();
    config.api_keys.google_api_key = config.api_keys.google_api_key.or(env_keys.google_api_key);
    config.api_keys.google_cse_id = config.api_keys.google_cse_id.or(env_keys.google_cse_id);
    config.api_keys.youtube_api_key = config.api_keys.youtube_api_key.or(env_keys.youtube_api_key);
    Ok(config)
}

/// Find a configuration file in the default locations
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("unified-search.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("unified-search").join("config.toml"))
        .filter(|path| path.is_file())
}
