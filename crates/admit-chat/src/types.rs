//! Types shared across the query pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use admit_core::{topic_label, ReplySource, Topic};

use crate::state_machine::ComposerState;

// =============================================================================
// Classification
// =============================================================================

/// Score accumulated by one topic for a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TopicScore {
    pub topic: Topic,
    /// Number of matched keyword occurrences.
    pub count: u32,
    /// Sum of the matched keywords' specificity weights.
    pub weight: f32,
}

/// Ranked topics for a query, best first. Empty means unrecognised.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassificationResult {
    /// Normalised query text the scores were computed from.
    pub normalized: String,
    pub scores: Vec<TopicScore>,
}

impl ClassificationResult {
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn top(&self) -> Option<&TopicScore> {
        self.scores.first()
    }

    pub fn top_topic(&self) -> Option<Topic> {
        self.top().map(|s| s.topic)
    }

    /// The first `k` topics in rank order.
    pub fn top_topics(&self, k: usize) -> Vec<Topic> {
        self.scores.iter().take(k).map(|s| s.topic).collect()
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// One answered query in a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub query: String,
    pub reply: String,
    pub timestamp: DateTime<Utc>,
    pub topic: Option<Topic>,
    pub source: ReplySource,
}

fn serialize_topic_label<S: Serializer>(topic: &Option<Topic>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(topic_label(*topic))
}

/// Final reply handed back to a front end.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub reply: String,
    /// Serialised as the topic name or `unclassified`.
    #[serde(serialize_with = "serialize_topic_label")]
    pub topic: Option<Topic>,
    pub confidence: f32,
    pub source: ReplySource,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    /// States the composer walked through for this reply.
    #[serde(skip)]
    pub path: Vec<ComposerState>,
}

impl ChatReply {
    pub fn topic_label(&self) -> &'static str {
        topic_label(self.topic)
    }
}

/// Cumulative counters over the composer's outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total_queries: u64,
    pub quick_ratio: f64,
    pub generated_ratio: f64,
    pub fallback_ratio: f64,
    /// Replies per topic label, `unclassified` included.
    pub topic_distribution: BTreeMap<String, u64>,
}

/// Shorten text for log lines.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
