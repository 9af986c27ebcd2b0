//! Study assistant backed by the Gemini `generateContent` API.
//!
//! Each question is sent as a single-turn request: the fixed system prompt is
//! prepended to the question and the first candidate's text is returned.
//! Conversation history is kept by the caller (see `studyplan-storage`).

mod prompt;

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use studyplan_shared::{AssistantConfig, Result, StudyPlanError};
use tracing::{debug, info, instrument};
use url::Url;

pub use prompt::{FALLBACK_REPLY, GREETING, QUICK_QUESTIONS, SYSTEM_PROMPT, compose_prompt};

/// User-Agent string for assistant requests.
const USER_AGENT: &str = concat!("studyplan/", env!("CARGO_PKG_VERSION"));

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Request body for `question` under `config`.
pub fn build_request_body(question: &str, config: &AssistantConfig) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: Some(compose_prompt(question)),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        },
    }
}

/// Text of the first part of the first candidate, if it is non-blank.
pub fn extract_reply(body: &str) -> Result<Option<String>> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| StudyPlanError::Assistant(format!("unexpected response shape: {e}")))?;

    Ok(response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.trim().is_empty()))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the assistant endpoint.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    client: Client,
    url: Url,
    api_key: String,
    config: AssistantConfig,
}

impl AssistantClient {
    pub fn new(config: &AssistantConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(StudyPlanError::config("assistant API key is empty"));
        }

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: config.generate_url()?,
            api_key,
            config: config.clone(),
        })
    }

    /// Ask a single question and return the assistant's answer.
    ///
    /// A response without candidate text yields [`FALLBACK_REPLY`].
    #[instrument(skip_all, fields(model = %self.config.model, chars = question.len()))]
    pub async fn ask(&self, question: &str) -> Result<String> {
        if question.trim().is_empty() {
            return Err(StudyPlanError::validation("question must not be empty"));
        }

        let body = build_request_body(question, &self.config);
        debug!(url = %self.url, "sending generateContent request");

        let response = self
            .client
            .post(self.url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StudyPlanError::Network(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StudyPlanError::Network(format!(
                "{}: HTTP {status}",
                self.url
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| StudyPlanError::Network(format!("failed to read response: {e}")))?;

        match extract_reply(&text)? {
            Some(reply) => {
                info!(chars = reply.len(), "assistant replied");
                Ok(reply)
            }
            None => {
                debug!("response had no candidate text, using fallback");
                Ok(FALLBACK_REPLY.to_string())
            }
        }
    }
}

/// Build a reqwest client with appropriate settings.
fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| StudyPlanError::Network(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(endpoint: &str) -> AssistantConfig {
        AssistantConfig {
            endpoint: endpoint.into(),
            model: "test-model".into(),
            timeout_secs: 5,
            ..AssistantConfig::default()
        }
    }

    #[test]
    fn request_body_shape() {
        let body = build_request_body("  O que é sepse?  ", &AssistantConfig::default());
        let json = serde_json::to_value(&body).unwrap();

        let text = json["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with(SYSTEM_PROMPT));
        assert!(text.ends_with("Pergunta do usuário: O que é sepse?"));
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 800);
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn extract_reply_variants() {
        let ok = r#"{"candidates":[{"content":{"parts":[{"text":"Resposta"}]}}]}"#;
        assert_eq!(extract_reply(ok).unwrap().as_deref(), Some("Resposta"));

        assert_eq!(extract_reply(r#"{"candidates":[]}"#).unwrap(), None);
        assert_eq!(extract_reply("{}").unwrap(), None);
        assert_eq!(
            extract_reply(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#).unwrap(),
            None
        );
        assert_eq!(
            extract_reply(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap(),
            None
        );
        assert!(matches!(
            extract_reply("<html>"),
            Err(StudyPlanError::Assistant(_))
        ));
    }

    #[test]
    fn client_requires_key() {
        assert!(AssistantClient::new(&AssistantConfig::default(), "  ").is_err());
        assert!(AssistantClient::new(&AssistantConfig::default(), "k").is_ok());
    }

    #[test]
    fn quick_questions_are_not_blank() {
        assert!(!QUICK_QUESTIONS.is_empty());
        assert!(QUICK_QUESTIONS.iter().all(|q| !q.trim().is_empty()));
        assert!(!GREETING.is_empty());
    }

    #[tokio::test]
    async fn ask_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/models/test-model:generateContent"))
            .and(wiremock::matchers::header("x-goog-api-key", "secret"))
            .and(wiremock::matchers::body_partial_json(serde_json::json!({
                "generationConfig": { "maxOutputTokens": 800 }
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "Sepse é..." }] } }]
            })))
            .mount(&server)
            .await;

        let client = AssistantClient::new(&config_for(&server.uri()), "secret").unwrap();
        let reply = client.ask("O que é sepse?").await.unwrap();
        assert_eq!(reply, "Sepse é...");
    }

    #[tokio::test]
    async fn ask_uses_fallback_without_candidates() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({})),
            )
            .mount(&server)
            .await;

        let client = AssistantClient::new(&config_for(&server.uri()), "secret").unwrap();
        assert_eq!(client.ask("Oi").await.unwrap(), FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn ask_reports_http_status() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = AssistantClient::new(&config_for(&server.uri()), "secret").unwrap();
        let err = client.ask("Oi").await.unwrap_err();
        assert!(matches!(err, StudyPlanError::Network(_)));
        assert!(err.to_string().contains("429"));
        assert!(!err.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn blank_question_is_rejected_before_sending() {
        let client = AssistantClient::new(&config_for("http://127.0.0.1:9"), "secret").unwrap();
        assert!(matches!(
            client.ask("   ").await,
            Err(StudyPlanError::Validation { .. })
        ));
    }
}
