//! Article generation collaborator.
//!
//! Speaks the chat-completions wire format: model id, a fixed system
//! instruction, and a user prompt composed from the analysis facts. The first
//! candidate completion is used. The request carries an explicit timeout and
//! a bearer credential supplied through process configuration.

use crate::config::GenerationConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const COLLABORATOR: &str = "generation";

const SYSTEM_INSTRUCTION: &str = "You are a journalist writing about images.";

#[async_trait]
pub trait ArticleGenerator: Send + Sync {
    /// Generate article text from a prompt. Returns the raw completion text.
    async fn generate(&self, prompt: &str) -> Result<String, PipelineError>;
}

/// Compose the generation prompt from the analysis facts.
///
/// Pure function of its three inputs: labels (always present when called),
/// face count (mentioned only when > 0), recognized identities (only when
/// non-empty). No randomness, no hidden state, so a given analysis result
/// always produces the same prompt.
pub fn compose_prompt(labels: &[String], face_count: usize, celebrities: &[String]) -> String {
    let mut additional = Vec::new();
    if face_count > 0 {
        additional.push(format!("{} face(s) detected", face_count));
    }
    if !celebrities.is_empty() {
        additional.push(format!(
            "Recognized celebrity faces: {}",
            celebrities.join(", ")
        ));
    }

    let mut prompt = format!(
        "Write a news-style article based on these image labels: {}.",
        labels.join(", ")
    );
    if !additional.is_empty() {
        prompt.push(' ');
        prompt.push_str(&additional.join(". "));
        prompt.push('.');
    }
    prompt.push_str(" Start with an engaging title on the first line, then the body in paragraphs.");
    prompt
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Chat-completions client for the generation endpoint.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ArticleGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                PipelineError::upstream(COLLABORATOR, e.status().map(|s| s.as_u16()), e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::upstream(
                COLLABORATOR,
                Some(status.as_u16()),
                format!("generation endpoint returned {}", status),
            ));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            PipelineError::upstream(
                COLLABORATOR,
                Some(status.as_u16()),
                format!("malformed completion body: {}", e),
            )
        })?;

        match body.choices.into_iter().next() {
            Some(choice) => Ok(choice.message.content),
            None => Err(PipelineError::empty(COLLABORATOR, "no completion choices")),
        }
    }
}
