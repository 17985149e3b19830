//! Gemini `generateContent` REST completer.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use admit_core::config::GenerationConfig;

use crate::error::GenerationError;
use crate::generation::{CompletionOptions, TextCompleter};

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationParams,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

fn build_request<'a>(prompt: &'a str, options: &CompletionOptions) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![RequestPart { text: prompt }],
        }],
        generation_config: GenerationParams {
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            max_output_tokens: options.max_output_tokens,
        },
    }
}

/// Text of the first candidate, parts concatenated.
fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GenerationError::Empty)?;
    let content = candidate
        .content
        .ok_or_else(|| GenerationError::Malformed("candidate has no content".to_string()))?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() {
        Err(GenerationError::Empty)
    } else {
        Ok(text)
    }
}

fn status_error(status: StatusCode, body: String) -> GenerationError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        GenerationError::RateLimited
    } else {
        GenerationError::Rejected {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        }
    }
}

// =============================================================================
// GeminiCompleter
// =============================================================================

pub struct GeminiCompleter {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiCompleter {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self, GenerationError> {
        if api_key.trim().is_empty() {
            return Err(GenerationError::Unavailable("API key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Transport(format!("failed to build client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl TextCompleter for GeminiCompleter {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, GenerationError> {
        let request = build_request(prompt, options);
        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending generateContent request");

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .timeout(options.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(options.timeout.as_secs())
                } else {
                    GenerationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        extract_text(body)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn options() -> CompletionOptions {
        CompletionOptions::from(&GenerationConfig::default())
    }

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    // ---- Request ----

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(build_request("What is the fee?", &options())).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "What is the fee?");
        let gc = &body["generationConfig"];
        assert_eq!(gc["topK"], 40);
        assert_eq!(gc["maxOutputTokens"], 1000);
        assert!((gc["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!((gc["topP"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_url_and_construction() {
        let config = GenerationConfig {
            endpoint: "https://example.test/v1beta/".to_string(),
            model: "gemini-1.5-flash".to_string(),
            ..GenerationConfig::default()
        };
        let completer = GeminiCompleter::new(&config, "k".to_string()).unwrap();
        assert_eq!(
            completer.url(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(completer.name(), "gemini");
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let err = GeminiCompleter::new(&GenerationConfig::default(), "  ".to_string())
            .err()
            .unwrap();
        assert!(matches!(err, GenerationError::Unavailable(_)));
    }

    // ---- Response ----

    #[test]
    fn test_extract_text_joins_parts() {
        let response = parse(
            r#"{"candidates": [{"content": {"role": "model",
                "parts": [{"text": "The fee is "}, {"text": "INR 88000."}]}}]}"#,
        );
        assert_eq!(extract_text(response).unwrap(), "The fee is INR 88000.");
    }

    #[test]
    fn test_extract_text_no_candidates_is_empty() {
        let response = parse(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#);
        assert_eq!(extract_text(response).unwrap_err(), GenerationError::Empty);
    }

    #[test]
    fn test_extract_text_missing_content_is_malformed() {
        let response = parse(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#);
        assert!(matches!(
            extract_text(response).unwrap_err(),
            GenerationError::Malformed(_)
        ));
    }

    #[test]
    fn test_extract_text_blank_is_empty() {
        let response = parse(r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#);
        assert_eq!(extract_text(response).unwrap_err(), GenerationError::Empty);
    }

    // ---- Status mapping ----

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_error(StatusCode::TOO_MANY_REQUESTS, String::new()),
            GenerationError::RateLimited
        );
        let err = status_error(StatusCode::BAD_REQUEST, "API key not valid".to_string());
        assert_eq!(
            err,
            GenerationError::Rejected {
                status: 400,
                message: "API key not valid".to_string()
            }
        );
        assert!(!err.is_transient());
        assert!(status_error(StatusCode::SERVICE_UNAVAILABLE, String::new()).is_transient());
    }

    #[test]
    fn test_error_body_is_capped() {
        let err = status_error(StatusCode::BAD_REQUEST, "x".repeat(1000));
        match err {
            GenerationError::Rejected { message, .. } => assert_eq!(message.len(), 200),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_options_timeout_from_config() {
        assert_eq!(options().timeout, Duration::from_secs(20));
    }
}
