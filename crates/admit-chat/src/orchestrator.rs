//! Response composer: central coordinator of the query pipeline.
//!
//! Classifies, tries a quick answer, falls back to generation, attaches
//! reply metadata, records the turn, and keeps cumulative statistics.
//! Every call yields a reply; internal failures become the fallback message.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use admit_core::config::{AdmitConfig, ChatConfig};
use admit_core::{topic_label, ReplySource, Topic};
use admit_knowledge::KnowledgeBase;

use crate::classifier::IntentClassifier;
use crate::context::ContextBuilder;
use crate::error::ChatError;
use crate::generation::{GenerationClient, GenerationOutcome, GenerationRequest, TextCompleter};
use crate::quick::QuickAnswerResolver;
use crate::session::SessionStore;
use crate::state_machine::{ComposerState, StateTrace};
use crate::types::{preview, ChatReply, ClassificationResult, ConversationTurn, Statistics};

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    quick: u64,
    generated: u64,
    fallback: u64,
    topics: BTreeMap<String, u64>,
}

impl Counters {
    fn record(&mut self, source: ReplySource, topic: Option<Topic>) {
        self.total += 1;
        match source {
            ReplySource::Quick => self.quick += 1,
            ReplySource::Generated => self.generated += 1,
            ReplySource::Fallback => self.fallback += 1,
        }
        *self
            .topics
            .entry(topic_label(topic).to_string())
            .or_insert(0) += 1;
    }

    fn snapshot(&self) -> Statistics {
        let ratio = |n: u64| {
            if self.total == 0 {
                0.0
            } else {
                n as f64 / self.total as f64
            }
        };
        Statistics {
            total_queries: self.total,
            quick_ratio: ratio(self.quick),
            generated_ratio: ratio(self.generated),
            fallback_ratio: ratio(self.fallback),
            topic_distribution: self.topics.clone(),
        }
    }
}

/// Reply content decided before the turn is recorded.
struct Payload {
    text: String,
    topic: Option<Topic>,
    confidence: f32,
    source: ReplySource,
}

// =============================================================================
// ResponseComposer
// =============================================================================

pub struct ResponseComposer {
    classifier: IntentClassifier,
    quick: QuickAnswerResolver,
    context: ContextBuilder,
    generator: GenerationClient,
    sessions: Arc<SessionStore>,
    chat: ChatConfig,
    history_turns: usize,
    counters: Mutex<Counters>,
}

impl ResponseComposer {
    /// Wire the pipeline from a loaded knowledge base and configuration.
    pub fn new(
        kb: Arc<KnowledgeBase>,
        config: &AdmitConfig,
        completer: Arc<dyn TextCompleter>,
    ) -> Self {
        let university = kb
            .university()
            .short_name
            .clone()
            .unwrap_or_else(|| kb.university().name.clone());
        Self {
            classifier: IntentClassifier::new(Arc::clone(&kb), &config.classifier),
            quick: QuickAnswerResolver::new(Arc::clone(&kb)),
            context: ContextBuilder::new(Arc::clone(&kb), &config.context),
            generator: GenerationClient::new(completer, &config.generation, &university),
            sessions: Arc::new(SessionStore::new(&config.session)),
            chat: config.chat.clone(),
            history_turns: config.generation.history_turns,
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Shared handle to the session store, for sweeping and inspection.
    pub fn sessions(&self) -> Arc<SessionStore> {
        Arc::clone(&self.sessions)
    }

    /// Answer a query.
    ///
    /// A missing or blank `session_id` starts a new session whose id is
    /// returned with the reply. Never fails: any internal error yields the
    /// fallback message with confidence 0.
    pub async fn respond(&self, query: &str, session_id: Option<&str>) -> ChatReply {
        let sid = session_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let classification = self.classifier.classify(query);
        let reply = match self.compose(query, &sid, &classification).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(session_id = %sid, error = %e, "Composer failed, returning fallback");
                self.fallback_reply(query, sid, classification.top_topic())
            }
        };

        if let Ok(mut counters) = self.counters.lock() {
            counters.record(reply.source, reply.topic);
        }
        info!(
            session_id = %reply.session_id,
            query = %preview(query, 100),
            topic = reply.topic_label(),
            source = %reply.source,
            confidence = reply.confidence,
            "Query answered"
        );
        reply
    }

    async fn compose(
        &self,
        query: &str,
        sid: &str,
        classification: &ClassificationResult,
    ) -> Result<ChatReply, ChatError> {
        let mut trace = StateTrace::new();
        self.sessions.get_or_create(sid)?;
        trace.advance(ComposerState::Classified)?;
        let top_topic = classification.top_topic();

        let payload = if let Some(hit) = self.quick.resolve(classification) {
            trace.advance(ComposerState::QuickHit)?;
            trace.advance(ComposerState::Replied)?;
            Payload {
                text: hit.text,
                topic: top_topic,
                confidence: self.chat.quick_confidence,
                source: ReplySource::Quick,
            }
        } else {
            trace.advance(ComposerState::Generating)?;
            let history = self.sessions.recent_turns(sid, self.history_turns)?;
            let context = self.context.build(classification);
            // No lock is held across the completion call
            let outcome = self
                .generator
                .generate(GenerationRequest {
                    query,
                    context: &context,
                    history: &history,
                    classification,
                })
                .await;
            match outcome {
                GenerationOutcome::Generated(generated) => {
                    trace.advance(ComposerState::Replied)?;
                    Payload {
                        text: generated.text,
                        topic: top_topic,
                        confidence: generated.confidence,
                        source: ReplySource::Generated,
                    }
                }
                GenerationOutcome::Failed(err) => {
                    trace.advance(ComposerState::Failed)?;
                    info!(session_id = %sid, error = %err, "Substituting fallback reply");
                    Payload {
                        text: self.chat.fallback_message.clone(),
                        topic: top_topic,
                        confidence: 0.0,
                        source: ReplySource::Fallback,
                    }
                }
            }
        };

        let timestamp = Utc::now();
        self.sessions.append(
            sid,
            ConversationTurn {
                query: query.to_string(),
                reply: payload.text.clone(),
                timestamp,
                topic: payload.topic,
                source: payload.source,
            },
        )?;
        trace.advance(ComposerState::Recorded)?;

        Ok(ChatReply {
            reply: payload.text,
            topic: payload.topic,
            confidence: payload.confidence,
            source: payload.source,
            session_id: sid.to_string(),
            timestamp,
            path: trace.into_path(),
        })
    }

    /// Fallback reply for a pipeline error.
    ///
    /// Keeps the classified topic and still tries to record the turn. The
    /// path ends at `Failed` when the turn could not be stored.
    fn fallback_reply(&self, query: &str, sid: String, topic: Option<Topic>) -> ChatReply {
        let text = self.chat.fallback_message.clone();
        let timestamp = Utc::now();
        let mut path = vec![
            ComposerState::Received,
            ComposerState::Classified,
            ComposerState::Generating,
            ComposerState::Failed,
        ];
        let turn = ConversationTurn {
            query: query.to_string(),
            reply: text.clone(),
            timestamp,
            topic,
            source: ReplySource::Fallback,
        };
        match self.sessions.append(&sid, turn) {
            Ok(()) => path.push(ComposerState::Recorded),
            Err(e) => warn!(session_id = %sid, error = %e, "Could not record fallback turn"),
        }
        ChatReply {
            reply: text,
            topic,
            confidence: 0.0,
            source: ReplySource::Fallback,
            session_id: sid,
            timestamp,
            path,
        }
    }

    /// Cumulative outcome statistics. Pure read.
    pub fn statistics(&self) -> Statistics {
        self.counters
            .lock()
            .map(|c| c.snapshot())
            .unwrap_or_default()
    }

    /// Ordered history of a live session.
    pub fn history(&self, session_id: &str) -> Result<Vec<ConversationTurn>, ChatError> {
        self.sessions
            .history(session_id)?
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))
    }

    /// Clear a session's history.
    pub fn reset_session(&self, session_id: &str) -> Result<(), ChatError> {
        if self.sessions.reset(session_id)? {
            Ok(())
        } else {
            Err(ChatError::SessionNotFound(session_id.to_string()))
        }
    }

    /// Number of sessions currently held.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
