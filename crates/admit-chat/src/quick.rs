//! Quick-answer resolver.
//!
//! Serves pre-authored replies without calling the completion service: an
//! FAQ phrase match first, then the canned summary of the top topic.

use std::sync::Arc;

use admit_core::Topic;
use admit_knowledge::normalize::contains_phrase;
use admit_knowledge::{KnowledgeBase, MatchMode};

use crate::types::ClassificationResult;

/// What produced a quick answer.
#[derive(Debug, Clone, PartialEq)]
pub enum QuickMatch {
    /// FAQ entry, identified by its question.
    Faq { question: String },
    /// Canned summary for the top classified topic.
    TopicSummary(Topic),
}

/// A resolved quick answer.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickHit {
    pub text: String,
    pub matched: QuickMatch,
}

/// Deterministic lookup over the FAQ and quick-answer tables.
pub struct QuickAnswerResolver {
    kb: Arc<KnowledgeBase>,
}

impl QuickAnswerResolver {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self { kb }
    }

    /// Resolve a quick answer for a classified query.
    ///
    /// Unrecognised queries (empty classification) never get a quick answer.
    pub fn resolve(&self, classification: &ClassificationResult) -> Option<QuickHit> {
        let top = classification.top_topic()?;
        let query = classification.normalized.as_str();

        for faq in self.kb.faqs() {
            let hit = faq.patterns.iter().any(|p| match faq.entry.match_mode {
                MatchMode::Exact => p == query,
                MatchMode::Contains => contains_phrase(query, p),
            });
            if hit {
                return Some(QuickHit {
                    text: faq.entry.answer.clone(),
                    matched: QuickMatch::Faq {
                        question: faq.entry.question.clone(),
                    },
                });
            }
        }

        self.kb.quick_answer(top).map(|text| QuickHit {
            text: text.to_string(),
            matched: QuickMatch::TopicSummary(top),
        })
    }
}
