//! Error types for knowledge base loading.

use admit_core::AdmitError;

/// Errors raised while loading or validating the knowledge base.
///
/// All of these are fatal at startup; nothing in this crate fails at query
/// time.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed knowledge base: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid knowledge base: {0}")]
    Invalid(String),
}

impl From<KnowledgeError> for AdmitError {
    fn from(err: KnowledgeError) -> Self {
        match err {
            KnowledgeError::Read { source, .. } => AdmitError::Io(source),
            other => AdmitError::KnowledgeBase(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knowledge_error_display() {
        let err = KnowledgeError::Invalid("university name is empty".to_string());
        assert_eq!(
            err.to_string(),
            "invalid knowledge base: university name is empty"
        );

        let err = KnowledgeError::Read {
            path: "/tmp/kb.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(err.to_string(), "failed to read /tmp/kb.json: no such file");
    }

    #[test]
    fn test_parse_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: KnowledgeError = json_err.into();
        assert!(matches!(err, KnowledgeError::Parse(_)));
        assert!(err.to_string().starts_with("malformed knowledge base:"));
    }

    #[test]
    fn test_into_admit_error() {
        let err: AdmitError = KnowledgeError::Invalid("empty faq answer".to_string()).into();
        assert!(matches!(err, AdmitError::KnowledgeBase(_)));
        assert!(err.to_string().contains("empty faq answer"));

        let err: AdmitError = KnowledgeError::Read {
            path: "kb.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert!(matches!(err, AdmitError::Io(_)));
    }
}
