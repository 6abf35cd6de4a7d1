//! Process configuration, read once at startup.
//!
//! Everything downstream receives plain values from here; nothing in the
//! classification path reads the environment.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;

use crate::categorize::{Category, LlmFallback};
use crate::channels::telegram::{DEFAULT_TELEGRAM_API_BASE, TelegramConfig};
use crate::error::ConfigError;
use crate::llm::{DEFAULT_LLM_TIMEOUT, LlmBackend, LlmConfig};
use crate::routing::RoutingTable;
use crate::store::notion::{DEFAULT_NOTION_API_BASE, NotionConfig};

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default timeout for Notion and Telegram calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Environment variable per category destination.
const DESTINATION_VARS: [(Category, &str); 4] = [
    (Category::Todo, "NOTION_TODO_PAGE"),
    (Category::Shopping, "NOTION_SHOPPING_PAGE"),
    (Category::Projects, "NOTION_PROJECTS_PAGE"),
    (Category::Personal, "NOTION_PERSONAL_PAGE"),
];

/// The default destination doubles as the brain dump destination.
const DEFAULT_DESTINATION_VAR: &str = "NOTION_BRAIN_DUMP_PAGE";

/// How messages get classified, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    KeywordOnly,
    LlmWithFallback,
}

impl ClassifierMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeywordOnly => "keyword_only",
            Self::LlmWithFallback => "llm_with_fallback",
        }
    }
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram: TelegramConfig,
    pub notion: NotionConfig,
    pub routing: RoutingTable,
    /// Present only in `LlmWithFallback` mode.
    pub llm: Option<LlmConfig>,
    pub classifier_mode: ClassifierMode,
    pub llm_fallback: LlmFallback,
    pub port: u16,
    /// Directory for rolling log files; stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl BotConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key → value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let authorized_chat_id: i64 = get("AUTHORIZED_CHAT_ID")
            .ok_or_else(|| ConfigError::MissingEnvVar("AUTHORIZED_CHAT_ID".into()))?
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "AUTHORIZED_CHAT_ID".into(),
                message: format!("expected an integer chat id: {e}"),
            })?;

        let telegram = TelegramConfig {
            bot_token: get("TELEGRAM_BOT_TOKEN").map(SecretString::from),
            api_base: get("TELEGRAM_API_BASE")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
            authorized_chat_id,
            webhook_secret: get("TELEGRAM_WEBHOOK_SECRET").map(SecretString::from),
            webhook_url: get("TELEGRAM_WEBHOOK_URL"),
            timeout: get("TELEGRAM_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT),
        };

        let notion = NotionConfig {
            api_key: get("NOTION_API_KEY").map(SecretString::from),
            api_base: get("NOTION_API_BASE").unwrap_or_else(|| DEFAULT_NOTION_API_BASE.to_string()),
            timeout: get("NOTION_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT),
        };

        let default_destination = get(DEFAULT_DESTINATION_VAR)
            .ok_or_else(|| ConfigError::MissingEnvVar(DEFAULT_DESTINATION_VAR.into()))?;
        let routing = DESTINATION_VARS.iter().fold(
            RoutingTable::new(default_destination),
            |table, (category, var)| match get(var) {
                Some(destination) => table.with_destination(*category, destination),
                None => table,
            },
        );

        let llm_fallback = match get("BRAIN_DUMP_LLM_FALLBACK") {
            Some(name) => {
                LlmFallback::from_name(&name).ok_or_else(|| ConfigError::InvalidValue {
                    key: "BRAIN_DUMP_LLM_FALLBACK".into(),
                    message: format!("unknown fallback '{name}' (expected keyword or trigger_words)"),
                })?
            }
            None => LlmFallback::default(),
        };

        let keyword_forced = match get("BRAIN_DUMP_CLASSIFIER").map(|v| v.to_lowercase()) {
            None => false,
            Some(v) if v == "auto" || v == "llm" => false,
            Some(v) if v == "keyword" || v == "keywords" => true,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "BRAIN_DUMP_CLASSIFIER".into(),
                    message: format!("unknown classifier '{other}' (expected auto, llm or keyword)"),
                });
            }
        };

        let backend = match get("BRAIN_DUMP_LLM_BACKEND").map(|v| v.to_lowercase()) {
            None => LlmBackend::Anthropic,
            Some(v) if v == "anthropic" || v == "claude" => LlmBackend::Anthropic,
            Some(v) if v == "openai" => LlmBackend::OpenAi,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "BRAIN_DUMP_LLM_BACKEND".into(),
                    message: format!("unknown backend '{other}' (expected anthropic or openai)"),
                });
            }
        };

        let llm = if keyword_forced {
            None
        } else {
            get(backend.api_key_var()).map(|api_key| LlmConfig {
                backend,
                api_key: SecretString::from(api_key),
                model: get("BRAIN_DUMP_MODEL")
                    .unwrap_or_else(|| backend.default_model().to_string()),
                base_url: get("BRAIN_DUMP_LLM_BASE_URL"),
                timeout: get("BRAIN_DUMP_LLM_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_LLM_TIMEOUT),
            })
        };

        let classifier_mode = if llm.is_some() {
            ClassifierMode::LlmWithFallback
        } else {
            ClassifierMode::KeywordOnly
        };

        let port: u16 = get("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            telegram,
            notion,
            routing,
            llm,
            classifier_mode,
            llm_fallback,
            port,
            log_dir: get("BRAIN_DUMP_LOG_DIR").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| env.get(key).cloned())
    }

    const MINIMAL: [(&str, &str); 2] = [
        ("AUTHORIZED_CHAT_ID", "4242"),
        ("NOTION_BRAIN_DUMP_PAGE", "db-brain"),
    ];

    #[test]
    fn minimal_config_is_keyword_only() {
        let config = load(&MINIMAL).unwrap();
        assert_eq!(config.telegram.authorized_chat_id, 4242);
        assert_eq!(config.classifier_mode, ClassifierMode::KeywordOnly);
        assert!(config.llm.is_none());
        assert!(config.telegram.bot_token.is_none());
        assert!(config.notion.api_key.is_none());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.routing.default_destination(), "db-brain");
        assert_eq!(config.llm_fallback, LlmFallback::KeywordClassifier);
    }

    #[test]
    fn missing_chat_id_is_an_error() {
        let err = load(&[("NOTION_BRAIN_DUMP_PAGE", "db")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "AUTHORIZED_CHAT_ID"));
    }

    #[test]
    fn non_numeric_chat_id_is_an_error() {
        let err = load(&[
            ("AUTHORIZED_CHAT_ID", "me"),
            ("NOTION_BRAIN_DUMP_PAGE", "db"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn missing_default_destination_is_an_error() {
        let err = load(&[("AUTHORIZED_CHAT_ID", "1")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "NOTION_BRAIN_DUMP_PAGE"));
    }

    #[test]
    fn api_key_enables_llm_mode() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("ANTHROPIC_API_KEY", "sk-ant-xyz"));
        pairs.push(("BRAIN_DUMP_LLM_TIMEOUT_SECS", "7"));
        let config = load(&pairs).unwrap();

        assert_eq!(config.classifier_mode, ClassifierMode::LlmWithFallback);
        let llm = config.llm.unwrap();
        assert_eq!(llm.backend, LlmBackend::Anthropic);
        assert_eq!(llm.model, "claude-3-haiku-20240307");
        assert_eq!(llm.api_key.expose_secret(), "sk-ant-xyz");
        assert_eq!(llm.timeout, Duration::from_secs(7));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("ANTHROPIC_API_KEY", "   "));
        let config = load(&pairs).unwrap();
        assert_eq!(config.classifier_mode, ClassifierMode::KeywordOnly);
    }

    #[test]
    fn openai_backend_uses_its_own_key() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("BRAIN_DUMP_LLM_BACKEND", "openai"));
        pairs.push(("ANTHROPIC_API_KEY", "sk-ant-xyz"));
        let config = load(&pairs).unwrap();
        assert_eq!(config.classifier_mode, ClassifierMode::KeywordOnly);

        pairs.push(("OPENAI_API_KEY", "sk-xyz"));
        let config = load(&pairs).unwrap();
        let llm = config.llm.unwrap();
        assert_eq!(llm.backend, LlmBackend::OpenAi);
        assert_eq!(llm.model, "gpt-4o-mini");
    }

    #[test]
    fn keyword_override_wins_over_credentials() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("ANTHROPIC_API_KEY", "sk-ant-xyz"));
        pairs.push(("BRAIN_DUMP_CLASSIFIER", "keyword"));
        let config = load(&pairs).unwrap();
        assert_eq!(config.classifier_mode, ClassifierMode::KeywordOnly);
        assert!(config.llm.is_none());
    }

    #[test]
    fn unknown_values_are_rejected() {
        for (key, value) in [
            ("BRAIN_DUMP_CLASSIFIER", "vibes"),
            ("BRAIN_DUMP_LLM_BACKEND", "llama"),
            ("BRAIN_DUMP_LLM_FALLBACK", "shrug"),
        ] {
            let mut pairs = MINIMAL.to_vec();
            pairs.push((key, value));
            assert!(
                matches!(load(&pairs), Err(ConfigError::InvalidValue { .. })),
                "{key}={value}"
            );
        }
    }

    #[test]
    fn destinations_are_routed() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("NOTION_TODO_PAGE", "db-todo"));
        pairs.push(("NOTION_PERSONAL_PAGE", ""));
        let config = load(&pairs).unwrap();
        assert_eq!(config.routing.destination_for(Category::Todo), "db-todo");
        assert_eq!(
            config.routing.destination_for(Category::Personal),
            "db-brain"
        );
    }

    #[test]
    fn tunables_parse_with_defaults_on_garbage() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("PORT", "8081"));
        pairs.push(("NOTION_TIMEOUT_SECS", "soon"));
        pairs.push(("BRAIN_DUMP_LLM_FALLBACK", "trigger_words"));
        pairs.push(("TELEGRAM_WEBHOOK_SECRET", "s3cret"));
        let config = load(&pairs).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.notion.timeout, DEFAULT_HTTP_TIMEOUT);
        assert_eq!(config.llm_fallback, LlmFallback::TriggerWords);
        assert_eq!(
            config
                .telegram
                .webhook_secret
                .as_ref()
                .map(|s| s.expose_secret().to_string()),
            Some("s3cret".to_string())
        );
    }
}
