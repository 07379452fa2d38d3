use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Secret key placeholder shipped in example configs. Deployments outside
/// development must replace it or startup fails.
pub const SENTINEL_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Deployment environment name ("development", "staging", "production").
    pub environment: String,
    pub server: ServerConfig,
    pub opensearch: OpenSearchConfig,
    pub alerting: AlertingConfig,
    pub auth: AuthConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            environment: env_or("ENVIRONMENT", "development"),
            server: ServerConfig::from_env(),
            opensearch: OpenSearchConfig::from_env(),
            alerting: AlertingConfig::from_env(),
            auth: AuthConfig::from_env(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Validate settings that must hold before the service starts.
    ///
    /// Outside development, authentication must be enabled and the signing
    /// key must not be the shipped sentinel.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.opensearch.scheme.as_str(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: "OPENSEARCH_SCHEME".to_string(),
                message: format!("must be 'http' or 'https', got '{}'", self.opensearch.scheme),
            });
        }
        if self.alerting.webhook_retries == 0 {
            return Err(ConfigError::Invalid {
                key: "WEBHOOK_RETRIES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !self.is_development() {
            if !self.auth.enabled {
                return Err(ConfigError::Insecure(format!(
                    "AUTH_ENABLED must be true when ENVIRONMENT={}",
                    self.environment
                )));
            }
            if self.auth.secret_key == SENTINEL_SECRET {
                return Err(ConfigError::Insecure(
                    "API_SECRET_KEY is still the default placeholder".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (environment: {}):", self.environment);
        tracing::info!("  server:     {}:{}", self.server.host, self.server.port);
        tracing::info!("  opensearch: {}", self.opensearch.base_url());
        tracing::info!(
            "  alerting:   rules_dir={}, state_index={}, history_index={}",
            self.alerting.rules_dir.display(),
            self.alerting.state_index,
            self.alerting.history_index
        );
        tracing::info!(
            "  webhooks:   timeout={}s, retries={}",
            self.alerting.webhook_timeout_secs,
            self.alerting.webhook_retries
        );
        tracing::info!("  auth:       enabled={}", self.auth.enabled);
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("ALERTING_API_HOST", "0.0.0.0"),
            port: env_u16("ALERTING_API_PORT", 8001),
        }
    }
}

// ── OpenSearch ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSearchConfig {
    pub host: String,
    pub port: u16,
    pub scheme: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verify_certs: bool,
    pub timeout_secs: u64,
}

impl OpenSearchConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("OPENSEARCH_HOST", "localhost"),
            port: env_u16("OPENSEARCH_PORT", 9200),
            scheme: env_or("OPENSEARCH_SCHEME", "http"),
            username: env_opt("OPENSEARCH_ADMIN_USERNAME"),
            password: env_opt("OPENSEARCH_ADMIN_PASSWORD"),
            verify_certs: env_bool("OPENSEARCH_VERIFY_CERTS", false),
            timeout_secs: env_u64("OPENSEARCH_TIMEOUT", 30),
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

// ── Alerting ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// Directory of per-rule JSON definition files.
    pub rules_dir: PathBuf,
    /// Index holding one state document per rule.
    pub state_index: String,
    /// Append-only alert event index.
    pub history_index: String,
    pub webhook_timeout_secs: u64,
    pub webhook_retries: u32,
}

impl AlertingConfig {
    fn from_env() -> Self {
        Self {
            rules_dir: PathBuf::from(env_or("ALERT_RULES_DIR", "configs/alert-rules")),
            state_index: env_or("ALERT_STATE_INDEX", ".alerts-state"),
            history_index: env_or("ALERT_HISTORY_INDEX", ".alerts-history"),
            webhook_timeout_secs: env_u64("WEBHOOK_TIMEOUT", 10),
            webhook_retries: env_u32("WEBHOOK_RETRIES", 3),
        }
    }
}

// ── Auth ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Opt-in: disabled by default for development.
    pub enabled: bool,
    pub secret_key: String,
}

impl AuthConfig {
    fn from_env() -> Self {
        Self {
            enabled: env_bool("AUTH_ENABLED", false),
            secret_key: env_or("API_SECRET_KEY", SENTINEL_SECRET),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev_config() -> Config {
        Config {
            environment: "development".to_string(),
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8001,
            },
            opensearch: OpenSearchConfig {
                host: "localhost".to_string(),
                port: 9200,
                scheme: "http".to_string(),
                username: None,
                password: None,
                verify_certs: false,
                timeout_secs: 30,
            },
            alerting: AlertingConfig {
                rules_dir: PathBuf::from("configs/alert-rules"),
                state_index: ".alerts-state".to_string(),
                history_index: ".alerts-history".to_string(),
                webhook_timeout_secs: 10,
                webhook_retries: 3,
            },
            auth: AuthConfig {
                enabled: false,
                secret_key: SENTINEL_SECRET.to_string(),
            },
        }
    }

    #[test]
    fn development_allows_disabled_auth() {
        assert!(dev_config().validate().is_ok());
    }

    #[test]
    fn production_requires_auth_enabled() {
        let mut config = dev_config();
        config.environment = "production".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("AUTH_ENABLED"));
    }

    #[test]
    fn production_rejects_sentinel_secret() {
        let mut config = dev_config();
        config.environment = "production".to_string();
        config.auth.enabled = true;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("API_SECRET_KEY"));
    }

    #[test]
    fn production_passes_with_real_secret() {
        let mut config = dev_config();
        config.environment = "production".to_string();
        config.auth.enabled = true;
        config.auth.secret_key = "a-real-signing-key".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_scheme_rejected() {
        let mut config = dev_config();
        config.opensearch.scheme = "ftp".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("OPENSEARCH_SCHEME"));
    }

    #[test]
    fn zero_retries_rejected() {
        let mut config = dev_config();
        config.alerting.webhook_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn base_url_formats_scheme_host_port() {
        let config = dev_config();
        assert_eq!(config.opensearch.base_url(), "http://localhost:9200");
    }
}
