// src/config/mod.rs
// All tunables load from the environment (.env supported), with defaults that
// match the single-instance deployment this crate targets.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct HearthConfig {
    // ── Server Configuration
    pub host: String,
    pub port: u16,

    // ── Classifier Configuration (Gemini)
    pub gemini_api_key: String,
    pub classifier_model: String,
    pub classifier_timeout_ms: u64,

    // ── Pending Action Configuration
    pub pending_action_ttl_ms: i64,

    // ── Conversation Context Configuration
    pub context_idle_secs: i64,

    // ── Background Cleanup
    pub cleanup_interval_secs: u64,

    // ── Logging Configuration
    pub log_level: String,
}

/// Parse an env var, falling back to `default` when missing or unparseable.
/// Values may carry trailing comments (`FOO=5 # bar`), which are stripped.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl HearthConfig {
    pub fn from_env() -> Self {
        // Load from .env file first if it exists
        let _ = dotenvy::dotenv();

        Self {
            host: env_var_or("HEARTH_HOST", "127.0.0.1".to_string()),
            port: env_var_or("HEARTH_PORT", 8090),
            gemini_api_key: env_var_or("GEMINI_API_KEY", String::new()),
            classifier_model: env_var_or(
                "HEARTH_CLASSIFIER_MODEL",
                "gemini-2.0-flash".to_string(),
            ),
            classifier_timeout_ms: env_var_or("HEARTH_CLASSIFIER_TIMEOUT_MS", 3000),
            pending_action_ttl_ms: env_var_or("HEARTH_PENDING_TTL_MS", 300_000),
            context_idle_secs: env_var_or("HEARTH_CONTEXT_IDLE_SECS", 1800),
            cleanup_interval_secs: env_var_or("HEARTH_CLEANUP_INTERVAL_SECS", 60),
            log_level: env_var_or("HEARTH_LOG_LEVEL", "info".to_string()),
        }
    }
}

pub static CONFIG: Lazy<HearthConfig> = Lazy::new(HearthConfig::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_or_strips_comments() {
        unsafe { std::env::set_var("HEARTH_TEST_PORT", "9000 # local override") };
        let port: u16 = env_var_or("HEARTH_TEST_PORT", 8090);
        assert_eq!(port, 9000);
    }

    #[test]
    fn test_env_var_or_default_on_missing() {
        let ttl: i64 = env_var_or("HEARTH_TEST_MISSING_KEY", 300_000);
        assert_eq!(ttl, 300_000);
    }
}
