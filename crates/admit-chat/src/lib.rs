//! Query pipeline for the admissions assistant.
//!
//! Classifies free-text questions against the knowledge base topics, serves
//! quick answers where one exists, and otherwise builds a context block and
//! asks the external completion service. The [`ResponseComposer`] ties the
//! stages together and records every turn in the [`SessionStore`].

pub mod classifier;
pub mod context;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod orchestrator;
pub mod quick;
pub mod session;
pub mod state_machine;
pub mod types;

pub use classifier::IntentClassifier;
pub use context::{ContextBlock, ContextBuilder};
pub use error::{ChatError, GenerationError};
pub use gemini::GeminiCompleter;
pub use generation::{
    CompletionOptions, DisabledCompleter, GeneratedReply, GenerationClient, GenerationOutcome,
    GenerationRequest, MockCompleter, TextCompleter,
};
pub use orchestrator::ResponseComposer;
pub use quick::{QuickAnswerResolver, QuickHit, QuickMatch};
pub use session::{Session, SessionStore};
pub use state_machine::{validate_transition, ComposerState};
pub use types::{ChatReply, ClassificationResult, ConversationTurn, Statistics, TopicScore};
