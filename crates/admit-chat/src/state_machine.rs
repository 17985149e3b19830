//! Response composer state machine with validated transitions.
//!
//! Received -> Classified -> QuickHit -> Replied -> Recorded
//! Classified -> Generating -> Replied | Failed -> Recorded

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Stage of a single query inside the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposerState {
    Received,
    Classified,
    QuickHit,
    Generating,
    Replied,
    Failed,
    Recorded,
}

impl ComposerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComposerState::Received => "received",
            ComposerState::Classified => "classified",
            ComposerState::QuickHit => "quick_hit",
            ComposerState::Generating => "generating",
            ComposerState::Replied => "replied",
            ComposerState::Failed => "failed",
            ComposerState::Recorded => "recorded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ComposerState::Recorded)
    }
}

impl fmt::Display for ComposerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate that a composer transition is allowed.
///
/// Valid transitions:
/// - Received -> Classified
/// - Classified -> QuickHit
/// - Classified -> Generating
/// - QuickHit -> Replied
/// - Generating -> Replied
/// - Generating -> Failed
/// - Replied -> Recorded
/// - Failed -> Recorded
pub fn validate_transition(from: ComposerState, to: ComposerState) -> Result<(), ChatError> {
    let valid = matches!(
        (from, to),
        (ComposerState::Received, ComposerState::Classified)
            | (ComposerState::Classified, ComposerState::QuickHit)
            | (ComposerState::Classified, ComposerState::Generating)
            | (ComposerState::QuickHit, ComposerState::Replied)
            | (ComposerState::Generating, ComposerState::Replied)
            | (ComposerState::Generating, ComposerState::Failed)
            | (ComposerState::Replied, ComposerState::Recorded)
            | (ComposerState::Failed, ComposerState::Recorded)
    );

    if valid {
        Ok(())
    } else {
        Err(ChatError::InvalidTransition(from, to))
    }
}

/// Walk through composer states, rejecting illegal moves.
#[derive(Debug, Clone)]
pub struct StateTrace {
    path: Vec<ComposerState>,
}

impl Default for StateTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTrace {
    /// Start a trace in `Received`.
    pub fn new() -> Self {
        Self {
            path: vec![ComposerState::Received],
        }
    }

    pub fn current(&self) -> ComposerState {
        self.path
            .last()
            .copied()
            .unwrap_or(ComposerState::Received)
    }

    pub fn advance(&mut self, to: ComposerState) -> Result<(), ChatError> {
        validate_transition(self.current(), to)?;
        self.path.push(to);
        Ok(())
    }

    pub fn path(&self) -> &[ComposerState] {
        &self.path
    }

    pub fn into_path(self) -> Vec<ComposerState> {
        self.path
    }
}
