use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::MatchCriteria;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub smtp: Option<SmtpSettings>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// Shared L2 cache; L1-only when absent
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub criteria: CriteriaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CriteriaConfig {
    #[serde(default = "default_minimum_score")]
    pub minimum_score: Decimal,
    #[serde(default = "default_service_weight")]
    pub service_weight: Decimal,
    #[serde(default = "default_rating_weight")]
    pub rating_weight: Decimal,
    #[serde(default = "default_fast_sla_bonus")]
    pub fast_sla_bonus: Decimal,
    #[serde(default = "default_medium_sla_bonus")]
    pub medium_sla_bonus: Decimal,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            minimum_score: default_minimum_score(),
            service_weight: default_service_weight(),
            rating_weight: default_rating_weight(),
            fast_sla_bonus: default_fast_sla_bonus(),
            medium_sla_bonus: default_medium_sla_bonus(),
        }
    }
}

impl From<&CriteriaConfig> for MatchCriteria {
    fn from(config: &CriteriaConfig) -> Self {
        MatchCriteria {
            minimum_score: config.minimum_score,
            service_weight: config.service_weight,
            rating_weight: config.rating_weight,
            fast_sla_bonus: config.fast_sla_bonus,
            medium_sla_bonus: config.medium_sla_bonus,
        }
    }
}

fn default_minimum_score() -> Decimal { MatchCriteria::default().minimum_score }
fn default_service_weight() -> Decimal { MatchCriteria::default().service_weight }
fn default_rating_weight() -> Decimal { MatchCriteria::default().rating_weight }
fn default_fast_sla_bonus() -> Decimal { MatchCriteria::default().fast_sla_bonus }
fn default_medium_sla_bonus() -> Decimal { MatchCriteria::default().medium_sla_bonus }

/// Daily job slots, in UTC
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_refresh_hour")]
    pub refresh_hour: u32,
    #[serde(default)]
    pub refresh_minute: u32,
    #[serde(default = "default_sla_sweep_hour")]
    pub sla_sweep_hour: u32,
    #[serde(default)]
    pub sla_sweep_minute: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_hour: default_refresh_hour(),
            refresh_minute: 0,
            sla_sweep_hour: default_sla_sweep_hour(),
            sla_sweep_minute: 0,
        }
    }
}

fn default_true() -> bool { true }
fn default_refresh_hour() -> u32 { 2 }
fn default_sla_sweep_hour() -> u32 { 1 }

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub use_tls: bool,
    #[serde(default = "default_mail_from")]
    pub from: String,
}

fn default_smtp_port() -> u16 { 587 }
fn default_mail_from() -> String { "no-reply@example.com".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with VENDOR_MATCH__)
    /// 5. DATABASE_URL, when set
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., VENDOR_MATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("VENDOR_MATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", database_url)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn match_criteria(&self) -> MatchCriteria {
        MatchCriteria::from(&self.scoring.criteria)
    }
}
