use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ClaimsError, Result};

pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-4.1-mini";
pub const DEFAULT_OCR_MODEL: &str = "openai/gpt-4.1-mini";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_AUDIT_LOG_PATH: &str = "logs/audit_logs.csv";
pub const DEFAULT_POLICY_INDEX_PATH: &str = "data/policy_index.json";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_RETRIEVAL_TOP_K: usize = 3;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
pub const DEFAULT_PORT: u16 = 3000;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub openrouter_api_key: String,
    pub llm_model: String,
    pub ocr_model: String,
    pub llm_timeout: Duration,
    pub audit_log_path: PathBuf,
    pub policy_index_path: PathBuf,
    /// Claim documents named in requests must live under this directory.
    pub upload_dir: PathBuf,
    pub retrieval_top_k: usize,
    pub session_ttl: Duration,
    pub port: u16,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let openrouter_api_key = lookup("OPENROUTER_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ClaimsError::Config("OPENROUTER_API_KEY not set".to_string()))?;

        let retrieval_top_k = parse_or(&lookup, "RETRIEVAL_TOP_K", DEFAULT_RETRIEVAL_TOP_K)?;
        if retrieval_top_k == 0 {
            return Err(ClaimsError::Config(
                "RETRIEVAL_TOP_K must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            openrouter_api_key,
            llm_model: lookup("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            ocr_model: lookup("OCR_MODEL").unwrap_or_else(|| DEFAULT_OCR_MODEL.to_string()),
            llm_timeout: Duration::from_secs(parse_or(
                &lookup,
                "LLM_TIMEOUT_SECS",
                DEFAULT_LLM_TIMEOUT_SECS,
            )?),
            audit_log_path: lookup("AUDIT_LOG_PATH")
                .unwrap_or_else(|| DEFAULT_AUDIT_LOG_PATH.to_string())
                .into(),
            policy_index_path: lookup("POLICY_INDEX_PATH")
                .unwrap_or_else(|| DEFAULT_POLICY_INDEX_PATH.to_string())
                .into(),
            upload_dir: lookup("UPLOAD_DIR")
                .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string())
                .into(),
            retrieval_top_k,
            session_ttl: Duration::from_secs(parse_or(
                &lookup,
                "SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            )?),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ClaimsError::Config(format!("{key} has invalid value {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServiceConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let config = config(&[("OPENROUTER_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.llm_timeout, Duration::from_secs(30));
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert_eq!(config.retrieval_top_k, 3);
        assert_eq!(config.port, 3000);
        assert_eq!(config.audit_log_path, PathBuf::from("logs/audit_logs.csv"));
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn api_key_is_required() {
        assert!(matches!(config(&[]), Err(ClaimsError::Config(_))));
        assert!(matches!(
            config(&[("OPENROUTER_API_KEY", "  ")]),
            Err(ClaimsError::Config(_))
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("LLM_TIMEOUT_SECS", "5"),
            ("PORT", "8080"),
            ("LLM_MODEL", "anthropic/claude-3.5-haiku"),
            ("UPLOAD_DIR", "/srv/claims/uploads"),
        ])
        .unwrap();
        assert_eq!(config.upload_dir, PathBuf::from("/srv/claims/uploads"));
        assert_eq!(config.llm_timeout, Duration::from_secs(5));
        assert_eq!(config.port, 8080);
        assert_eq!(config.llm_model, "anthropic/claude-3.5-haiku");
    }

    #[test]
    fn malformed_numbers_are_config_errors() {
        let err = config(&[("OPENROUTER_API_KEY", "sk-test"), ("PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        assert!(config(&[("OPENROUTER_API_KEY", "k"), ("RETRIEVAL_TOP_K", "0")]).is_err());
    }
}
