//! Generation client over an external text-completion service.
//!
//! Builds the prompt from the persona, the context block, recent turns and
//! the query; bounds every attempt with a timeout; retries transient
//! failures with backoff; and scores the returned text with a confidence
//! heuristic. Failures come back as [`GenerationOutcome::Failed`], never as
//! an error.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use admit_core::config::{ConfidenceConfig, GenerationConfig};
use admit_core::{topic_label, Topic};

use crate::context::ContextBlock;
use crate::error::GenerationError;
use crate::types::{ClassificationResult, ConversationTurn};

// =============================================================================
// TextCompleter capability
// =============================================================================

/// Sampling and timeout options passed with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub timeout: Duration,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl From<&GenerationConfig> for CompletionOptions {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

/// Black-box text completion service.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    /// Complete `prompt`. Implementations should honour `options.timeout`;
    /// the caller enforces it regardless.
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, GenerationError>;

    /// Name used in log lines.
    fn name(&self) -> &str;
}

/// Completer used when generation is switched off in configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCompleter;

#[async_trait]
impl TextCompleter for DisabledCompleter {
    async fn complete(
        &self,
        _prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable(
            "generation provider is disabled".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

// =============================================================================
// MockCompleter
// =============================================================================

/// Deterministic test double.
///
/// Scripted results are returned first, in order; once exhausted every call
/// returns the default result.
pub struct MockCompleter {
    scripted: Mutex<VecDeque<Result<String, GenerationError>>>,
    default: Result<String, GenerationError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockCompleter {
    /// Always answer with `text`.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::with_default(Ok(text.into()))
    }

    /// Always fail with `err`.
    pub fn failing(err: GenerationError) -> Self {
        Self::with_default(Err(err))
    }

    fn with_default(default: Result<String, GenerationError>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            default,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a result ahead of the default.
    pub fn then(self, result: Result<String, GenerationError>) -> Self {
        if let Ok(mut q) = self.scripted.lock() {
            q.push_back(result);
        }
        self
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts().pop()
    }
}

#[async_trait]
impl TextCompleter for MockCompleter {
    async fn complete(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.scripted.lock().ok().and_then(|mut q| q.pop_front());
        scripted.unwrap_or_else(|| self.default.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// =============================================================================
// GenerationClient
// =============================================================================

/// Everything the client needs to answer one query.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub query: &'a str,
    pub context: &'a ContextBlock,
    pub history: &'a [ConversationTurn],
    pub classification: &'a ClassificationResult,
}

/// A machine-generated reply with its confidence estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReply {
    pub text: String,
    pub confidence: f32,
    /// Topic whose context seeded the prompt, `None` for the general overview.
    pub topic: Option<Topic>,
    pub machine_generated: bool,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Generated(GeneratedReply),
    Failed(GenerationError),
}

pub struct GenerationClient {
    completer: Arc<dyn TextCompleter>,
    options: CompletionOptions,
    max_retries: u32,
    retry_backoff: Duration,
    confidence: ConfidenceConfig,
    persona: String,
}

impl GenerationClient {
    pub fn new(
        completer: Arc<dyn TextCompleter>,
        config: &GenerationConfig,
        university: &str,
    ) -> Self {
        let confidence = ConfidenceConfig {
            uncertainty_markers: config
                .confidence
                .uncertainty_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            ..config.confidence.clone()
        };
        Self {
            completer,
            options: CompletionOptions::from(config),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            confidence,
            persona: persona(university),
        }
    }

    /// Prompt sent to the completion service.
    pub fn build_prompt(&self, request: &GenerationRequest<'_>) -> String {
        let mut prompt = String::with_capacity(
            self.persona.len() + request.context.text.len() + request.query.len() + 256,
        );
        prompt.push_str(&self.persona);
        prompt.push_str("\n\nKNOWLEDGE BASE:\n");
        prompt.push_str(&request.context.text);
        if !request.history.is_empty() {
            prompt.push_str("\n\nRECENT CONVERSATION:\n");
            for turn in request.history {
                prompt.push_str(&format!("Student: {}\nAssistant: {}\n", turn.query, turn.reply));
            }
        }
        prompt.push_str(&format!(
            "\n\nDETECTED TOPIC: {}",
            topic_label(request.classification.top_topic())
        ));
        prompt.push_str(&format!(
            "\n\nSTUDENT'S QUESTION: {}\n\nAnswer:",
            request.query.trim()
        ));
        prompt
    }

    /// Ask the completion service, retrying transient failures.
    pub async fn generate(&self, request: GenerationRequest<'_>) -> GenerationOutcome {
        let prompt = self.build_prompt(&request);
        let max_attempts = self.max_retries + 1;
        let mut backoff = self.retry_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let start = Instant::now();
            let result = match tokio::time::timeout(
                self.options.timeout,
                self.completer.complete(&prompt, &self.options),
            )
            .await
            {
                Ok(result) => result.and_then(non_empty),
                Err(_) => Err(GenerationError::Timeout(self.options.timeout.as_secs())),
            };
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(text) => {
                    let confidence = self.estimate_confidence(&text, request.classification);
                    info!(
                        completer = self.completer.name(),
                        attempt,
                        elapsed_ms,
                        confidence,
                        "Generation succeeded"
                    );
                    return GenerationOutcome::Generated(GeneratedReply {
                        text,
                        confidence,
                        topic: if request.context.general {
                            None
                        } else {
                            request.context.topics.first().copied()
                        },
                        machine_generated: true,
                        attempts: attempt,
                    });
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    warn!(
                        completer = self.completer.name(),
                        attempt,
                        elapsed_ms,
                        error = %err,
                        backoff_ms = backoff.as_millis() as u64,
                        "Generation attempt failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => {
                    warn!(
                        completer = self.completer.name(),
                        attempt,
                        elapsed_ms,
                        error = %err,
                        "Generation failed"
                    );
                    return GenerationOutcome::Failed(err);
                }
            }
        }
    }

    /// Confidence in [0, 1] for a generated reply.
    ///
    /// Starts at the baseline, gains the bonus when the top classification
    /// score reaches the threshold, and loses the penalties for an
    /// unclassified query, a short reply, or uncertainty phrasing.
    pub fn estimate_confidence(&self, text: &str, classification: &ClassificationResult) -> f32 {
        let c = &self.confidence;
        let mut score = c.baseline;

        match classification.top() {
            Some(top) if top.count >= c.high_score_threshold => score += c.high_score_bonus,
            Some(_) => {}
            None => score -= c.unclassified_penalty,
        }

        let trimmed = text.trim();
        if trimmed.chars().count() < c.min_reply_chars {
            score -= c.short_reply_penalty;
        }

        let lowered = trimmed.to_lowercase().replace('\u{2019}', "'");
        if c.uncertainty_markers.iter().any(|m| lowered.contains(m.as_str())) {
            debug!("Uncertainty marker found in generated reply");
            score -= c.uncertainty_penalty;
        }

        score.clamp(0.0, 1.0)
    }
}

fn non_empty(text: String) -> Result<String, GenerationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(GenerationError::Empty)
    } else {
        Ok(trimmed.to_string())
    }
}

fn persona(university: &str) -> String {
    format!(
        "You are the admissions assistant for {university}. Answer questions from prospective \
         students and their families about admissions. Use only the facts in the knowledge base \
         below and quote figures, dates and contact details exactly. If the knowledge base does \
         not cover the question, say so plainly and suggest contacting the admissions office. \
         Keep the answer short and friendly."
    )
}
