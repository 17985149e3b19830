use thiserror::Error;

/// Top-level error type for the admissions assistant.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for AdmitError` so that `?` works across crate
/// boundaries. Only configuration and knowledge-base errors are fatal;
/// everything raised while answering a query is absorbed by the composer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdmitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Rate limit exceeded")]
    RateLimited,
}

impl From<toml::de::Error> for AdmitError {
    fn from(err: toml::de::Error) -> Self {
        AdmitError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AdmitError {
    fn from(err: toml::ser::Error) -> Self {
        AdmitError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AdmitError {
    fn from(err: serde_json::Error) -> Self {
        AdmitError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for admissions assistant operations.
pub type Result<T> = std::result::Result<T, AdmitError>;
