use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AdmitError, Result};

/// Top-level configuration for the admissions assistant.
///
/// Loaded from `~/.admit/config.toml` by default. Each section corresponds
/// to one stage of the query pipeline or to a front end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmitConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl AdmitConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AdmitConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AdmitError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the pipeline cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.session.max_turns == 0 {
            return Err(AdmitError::Config(
                "session.max_turns must be at least 1".to_string(),
            ));
        }
        if self.context.top_k == 0 {
            return Err(AdmitError::Config("context.top_k must be at least 1".to_string()));
        }
        if self.context.max_chars == 0 {
            return Err(AdmitError::Config(
                "context.max_chars must be at least 1".to_string(),
            ));
        }
        if self.generation.timeout_secs == 0 {
            return Err(AdmitError::Config(
                "generation.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.chat.fallback_message.trim().is_empty() {
            return Err(AdmitError::Config(
                "chat.fallback_message must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.chat.quick_confidence) {
            return Err(AdmitError::Config(
                "chat.quick_confidence must be within [0, 1]".to_string(),
            ));
        }
        let c = &self.generation.confidence;
        for (name, value) in [
            ("baseline", c.baseline),
            ("high_score_bonus", c.high_score_bonus),
            ("unclassified_penalty", c.unclassified_penalty),
            ("short_reply_penalty", c.short_reply_penalty),
            ("uncertainty_penalty", c.uncertainty_penalty),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AdmitError::Config(format!(
                    "generation.confidence.{} must be within [0, 1]",
                    name
                )));
            }
        }
        if self.classifier.max_phrase_words == 0 {
            return Err(AdmitError::Config(
                "classifier.max_phrase_words must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Path to the JSON knowledge base document.
    pub knowledge_base: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            knowledge_base: "data/knowledge_base.json".to_string(),
        }
    }
}

/// HTTP front end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Maximum chat requests accepted per minute (fixed window).
    pub rate_limit_per_minute: u64,
    /// Longest query accepted by the HTTP layer, in characters.
    pub max_query_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            rate_limit_per_minute: 30,
            max_query_chars: 500,
        }
    }
}

/// Intent classifier tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Specificity weight per keyword, used to break score ties.
    /// Keywords missing from this table weigh their word count.
    pub keyword_weights: BTreeMap<String, f32>,
    /// Longest multi-word phrase looked up in the keyword index.
    pub max_phrase_words: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            keyword_weights: BTreeMap::new(),
            max_phrase_words: 3,
        }
    }
}

/// Context builder limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Number of top-ranked topics summarised into the context block.
    pub top_k: usize,
    /// Character budget for the whole context block.
    pub max_chars: usize,
    /// Maximum related FAQ entries appended to the context.
    pub max_faqs: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            max_chars: 2000,
            max_faqs: 3,
        }
    }
}

/// Which completion backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionProvider {
    /// Google Gemini `generateContent` REST API.
    #[default]
    Gemini,
    /// No backend; every generation attempt fails and yields the fallback.
    Disabled,
}

/// External generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: CompletionProvider,
    /// Model name passed to the provider.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Base URL of the provider API.
    pub endpoint: String,
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles for each further retry.
    pub retry_backoff_ms: u64,
    /// Number of recent conversation turns included in the prompt.
    pub history_turns: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: CompletionProvider::Gemini,
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 20,
            max_retries: 1,
            retry_backoff_ms: 500,
            history_turns: 4,
            temperature: 0.7,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 1000,
            confidence: ConfidenceConfig::default(),
        }
    }
}

/// Confidence heuristic constants for generated replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Starting confidence before adjustments.
    pub baseline: f32,
    /// Top classification score at or above which the bonus applies.
    pub high_score_threshold: u32,
    pub high_score_bonus: f32,
    /// Applied when no topic was classified and general context was used.
    pub unclassified_penalty: f32,
    /// Replies shorter than this many characters are penalised.
    pub min_reply_chars: usize,
    pub short_reply_penalty: f32,
    /// Applied when the reply contains any uncertainty marker.
    pub uncertainty_penalty: f32,
    /// Lowercase phrases signalling refusal or uncertainty.
    pub uncertainty_markers: Vec<String>,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            baseline: 0.7,
            high_score_threshold: 2,
            high_score_bonus: 0.1,
            unclassified_penalty: 0.2,
            min_reply_chars: 40,
            short_reply_penalty: 0.2,
            uncertainty_penalty: 0.3,
            uncertainty_markers: [
                "i'm not sure",
                "i am not sure",
                "i don't have",
                "i do not have",
                "i cannot",
                "i can't",
                "unable to",
                "not certain",
                "don't know",
                "no information",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Session store bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum turns retained per session; the oldest is dropped beyond this.
    pub max_turns: usize,
    /// Idle minutes after which a session is considered expired.
    pub idle_timeout_minutes: u32,
    /// Seconds between background sweeps of expired sessions.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            idle_timeout_minutes: 30,
            sweep_interval_secs: 300,
        }
    }
}

/// Response composer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Reply substituted when generation fails.
    pub fallback_message: String,
    /// Confidence attached to quick answers.
    pub quick_confidence: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            fallback_message: "I'm sorry, I can't answer that right now. Please contact the \
                               admissions office directly and they will be glad to help."
                .to_string(),
            quick_confidence: 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = AdmitConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.knowledge_base, "data/knowledge_base.json");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.rate_limit_per_minute, 30);
        assert_eq!(config.context.top_k, 2);
        assert_eq!(config.generation.provider, CompletionProvider::Gemini);
        assert_eq!(config.generation.max_retries, 1);
        assert_eq!(config.generation.confidence.baseline, 0.7);
        assert_eq!(config.session.max_turns, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"
knowledge_base = "/srv/admit/kb.json"

[server]
port = 8080

[generation]
provider = "disabled"
timeout_secs = 5
history_turns = 2

[generation.confidence]
baseline = 0.6
uncertainty_markers = ["no idea"]

[session]
max_turns = 4
"#;
        let file = create_temp_config(content);
        let config = AdmitConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.knowledge_base, "/srv/admit/kb.json");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.generation.provider, CompletionProvider::Disabled);
        assert_eq!(config.generation.timeout_secs, 5);
        assert_eq!(config.generation.confidence.baseline, 0.6);
        assert_eq!(config.generation.confidence.uncertainty_markers, vec!["no idea"]);
        // Unspecified confidence fields keep their defaults
        assert_eq!(config.generation.confidence.min_reply_chars, 40);
        assert_eq!(config.session.max_turns, 4);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = create_temp_config("[general]\nlog_level = \"warn\"\n");
        let config = AdmitConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.context.max_chars, 2000);
        assert_eq!(config.session.idle_timeout_minutes, 30);
    }

    #[test]
    fn test_load_empty_file_uses_all_defaults() {
        let file = create_temp_config("");
        let config = AdmitConfig::load(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.generation.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_keyword_weights_table() {
        let content = r#"
[classifier.keyword_weights]
"hostel fee" = 3.0
fee = 1.5
"#;
        let file = create_temp_config(content);
        let config = AdmitConfig::load(file.path()).unwrap();
        assert_eq!(config.classifier.keyword_weights.get("hostel fee"), Some(&3.0));
        assert_eq!(config.classifier.keyword_weights.get("fee"), Some(&1.5));
        assert_eq!(config.classifier.max_phrase_words, 3);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is not [valid toml");
        let result = AdmitConfig::load(file.path());
        assert!(matches!(result, Err(AdmitError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AdmitConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AdmitConfig::default();
        config.session.max_turns = 7;
        config.save(&path).unwrap();

        let reloaded = AdmitConfig::load(&path).unwrap();
        assert_eq!(reloaded.session.max_turns, 7);
        assert_eq!(reloaded.chat.fallback_message, config.chat.fallback_message);
        assert_eq!(
            reloaded.generation.confidence.uncertainty_markers,
            config.generation.confidence.uncertainty_markers
        );
    }

    // ---- Validation ----

    #[test]
    fn test_validate_rejects_zero_max_turns() {
        let file = create_temp_config("[session]\nmax_turns = 0\n");
        let err = AdmitConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("max_turns"));
    }

    #[test]
    fn test_validate_rejects_empty_fallback() {
        let mut config = AdmitConfig::default();
        config.chat.fallback_message = "   ".to_string();
        assert!(matches!(config.validate(), Err(AdmitError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = AdmitConfig::default();
        config.context.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = AdmitConfig::default();
        config.generation.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let mut config = AdmitConfig::default();
        config.generation.confidence.baseline = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("baseline"));

        let mut config = AdmitConfig::default();
        config.chat.quick_confidence = -0.1;
        assert!(config.validate().is_err());
    }
}
