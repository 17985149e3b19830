//! Context block assembly for generation prompts.
//!
//! Summarises the knowledge base records of the top classified topics,
//! appends related FAQ entries, and keeps the result inside a character
//! budget by trimming the lowest-ranked contribution first.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use admit_core::config::ContextConfig;
use admit_core::Topic;
use admit_knowledge::KnowledgeBase;

use crate::types::ClassificationResult;

/// Topics summarised when the classifier recognised nothing.
const GENERAL_TOPICS: [Topic; 3] = [Topic::University, Topic::Courses, Topic::Fees];

const BLOCK_SEPARATOR: &str = "\n\n";

/// Context handed to the generation client.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBlock {
    pub text: String,
    /// Topics summarised, in rank order.
    pub topics: Vec<Topic>,
    /// True when the general overview was used instead of classified topics.
    pub general: bool,
    /// Topics that had no record and got a generic note instead.
    pub missing: Vec<Topic>,
    /// True when the budget forced content to be dropped or cut.
    pub truncated: bool,
}

// =============================================================================
// ContextBuilder
// =============================================================================

pub struct ContextBuilder {
    kb: Arc<KnowledgeBase>,
    top_k: usize,
    max_chars: usize,
    max_faqs: usize,
}

impl ContextBuilder {
    pub fn new(kb: Arc<KnowledgeBase>, config: &ContextConfig) -> Self {
        Self {
            kb,
            top_k: config.top_k.max(1),
            max_chars: config.max_chars.max(1),
            max_faqs: config.max_faqs,
        }
    }

    /// Build the context block for a classified query.
    ///
    /// Deterministic for a given classification and knowledge base.
    pub fn build(&self, classification: &ClassificationResult) -> ContextBlock {
        let general = classification.is_empty();
        let topics = if general {
            GENERAL_TOPICS.to_vec()
        } else {
            classification.top_topics(self.top_k)
        };

        let mut blocks = Vec::with_capacity(topics.len() + 1);
        let mut missing = Vec::new();
        for topic in &topics {
            let body = match self.kb.get(*topic) {
                Some(record) => record.render(),
                None => {
                    missing.push(*topic);
                    generic_note(*topic)
                }
            };
            blocks.push(format!("## {}\n{}", topic.heading(), body));
        }

        if !general {
            if let Some(faq_block) = self.faq_block(&classification.normalized, &topics) {
                blocks.push(faq_block);
            }
        }

        let (text, truncated) = fit_to_budget(blocks, self.max_chars);
        debug!(
            topics = ?topics,
            general,
            truncated,
            chars = text.chars().count(),
            "Context built"
        );

        ContextBlock {
            text,
            topics,
            general,
            missing,
            truncated,
        }
    }

    /// Related FAQ entries ranked by word overlap with the query.
    fn faq_block(&self, normalized_query: &str, topics: &[Topic]) -> Option<String> {
        if self.max_faqs == 0 {
            return None;
        }
        let query_tokens: BTreeSet<&str> = normalized_query.split(' ').collect();

        let mut ranked: Vec<(usize, &admit_knowledge::FaqEntry)> = self
            .kb
            .faqs()
            .iter()
            .filter(|faq| topics.contains(&faq.entry.topic))
            .map(|faq| {
                let overlap = faq
                    .question_tokens
                    .iter()
                    .filter(|t| query_tokens.contains(t.as_str()))
                    .count();
                (overlap, &faq.entry)
            })
            .filter(|(overlap, _)| *overlap > 0)
            .collect();
        // Stable sort keeps declaration order among equal overlaps
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        let lines: Vec<String> = ranked
            .into_iter()
            .take(self.max_faqs)
            .map(|(_, faq)| format!("Q: {}\nA: {}", faq.question, faq.answer))
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(format!("## Related FAQs\n{}", lines.join("\n")))
        }
    }
}

fn generic_note(topic: Topic) -> String {
    format!(
        "Detailed {} information is not available. Suggest contacting the admissions office.",
        topic.heading().to_lowercase()
    )
}

fn joined_len(blocks: &[String]) -> usize {
    let chars: usize = blocks.iter().map(|b| b.chars().count()).sum();
    chars + BLOCK_SEPARATOR.len() * blocks.len().saturating_sub(1)
}

/// Join blocks, trimming from the end until the result fits `max_chars`.
fn fit_to_budget(mut blocks: Vec<String>, max_chars: usize) -> (String, bool) {
    let mut truncated = false;
    loop {
        let total = joined_len(&blocks);
        if total <= max_chars {
            break;
        }
        truncated = true;
        let excess = total - max_chars;
        let Some(last) = blocks.last_mut() else {
            break;
        };
        let last_len = last.chars().count();
        if last_len > excess {
            *last = last.chars().take(last_len - excess).collect();
            break;
        }
        blocks.pop();
    }
    (blocks.join(BLOCK_SEPARATOR), truncated)
}
