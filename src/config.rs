//! Configuration types.
//!
//! Everything is read from the environment once at startup and handed to
//! constructors; nothing below reads ambient state after that.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Default HTTP port.
const DEFAULT_PORT: u16 = 8000;

/// Default backend timeout in seconds.
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// libSQL database file.
    pub db_path: PathBuf,
    /// HTTP listen port.
    pub port: u16,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
    /// JSON file consumed by the ingestion boundary.
    pub mock_inbox_path: PathBuf,
    /// Background `run_pending` period. `None` disables the ticker.
    pub process_interval: Option<Duration>,
    /// Generative backend selection and credentials.
    pub llm: LlmConfig,
    /// Orchestrator knobs.
    pub enrichment: EnrichmentConfig,
}

/// Knobs for the enrichment orchestrator.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentConfig {
    /// Operator instructions injected into categorization and extraction prompts.
    pub instructions: String,
    /// Call the summarization step when an active summarization template exists.
    pub summarize: bool,
}

impl AppConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Tests use this to avoid mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = get("INBOX_AGENT_DB_PATH")
            .unwrap_or_else(|| "./data/inbox-agent.db".to_string())
            .into();

        let port = match get("INBOX_AGENT_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "INBOX_AGENT_PORT".into(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            None => DEFAULT_PORT,
        };

        let cors_origins = get("INBOX_AGENT_CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mock_inbox_path = get("INBOX_AGENT_MOCK_INBOX")
            .unwrap_or_else(|| "./data/mock_inbox.json".to_string())
            .into();

        let process_interval = match get("INBOX_AGENT_PROCESS_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "INBOX_AGENT_PROCESS_INTERVAL_SECS".into(),
                    message: format!("'{raw}' is not a number of seconds"),
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        let llm = llm_config_from_lookup(&get)?;

        let enrichment = EnrichmentConfig {
            instructions: get("ENRICH_INSTRUCTIONS").unwrap_or_default(),
            summarize: get("ENRICH_SUMMARIZE")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
        };

        Ok(Self {
            db_path,
            port,
            cors_origins,
            mock_inbox_path,
            process_interval,
            llm,
            enrichment,
        })
    }
}

fn llm_config_from_lookup<F>(get: &F) -> Result<LlmConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let backend: LlmBackend = get("LLM_PROVIDER")
        .unwrap_or_else(|| "openai".to_string())
        .parse()?;

    let (key_var, model_var, base_var, default_model) = match backend {
        LlmBackend::OpenAi => (
            "OPENAI_API_KEY",
            "OPENAI_MODEL",
            "OPENAI_BASE_URL",
            "gpt-3.5-turbo",
        ),
        LlmBackend::Gemini => (
            "GEMINI_API_KEY",
            "GEMINI_MODEL",
            "GEMINI_BASE_URL",
            "gemini-1.5-flash",
        ),
    };

    let timeout_secs = match get("LLM_TIMEOUT_SECS") {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "LLM_TIMEOUT_SECS".into(),
            message: format!("'{raw}' is not a number of seconds"),
        })?,
        None => DEFAULT_LLM_TIMEOUT_SECS,
    };

    Ok(LlmConfig {
        backend,
        api_key: get(key_var).map(SecretString::from),
        model: get(model_var).unwrap_or_else(|| default_model.to_string()),
        base_url: get(base_var),
        timeout: Duration::from_secs(timeout_secs),
    })
}
