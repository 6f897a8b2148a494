// AI implementations: Anthropic for chat, OpenAI for embeddings
//
// These are the infrastructure implementations of BaseAI and
// BaseEmbeddingService. Business logic (what to prompt for) lives in
// domain layers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use super::{BaseAI, BaseEmbeddingService, ChatTurn, CLAUDE_SONNET, EMBEDDING_MODEL};

const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Anthropic implementation of chat completions
#[derive(Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    async fn send_once(
        &self,
        system: &str,
        messages: &[ChatTurn],
        max_tokens: u32,
    ) -> Result<String> {
        let body = json!({
            "model": CLAUDE_SONNET,
            "max_tokens": max_tokens,
            "system": system,
            "messages": messages
                .iter()
                .map(|m| json!({"role": m.role, "content": m.content}))
                .collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Anthropic")?
            .error_for_status()
            .context("Anthropic API returned an error status")?;

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        let text = parsed
            .content
            .first()
            .map(|block| block.text.clone())
            .unwrap_or_default();
        Ok(text)
    }
}

#[async_trait]
impl BaseAI for AnthropicClient {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatTurn],
        max_tokens: u32,
    ) -> Result<String> {
        tracing::debug!(
            message_count = messages.len(),
            system_length = system.len(),
            "Calling Anthropic API"
        );

        // One retry on failure. Chat turns must come back with an answer,
        // so a transient API hiccup gets a second chance before the
        // caller falls back to a canned reply.
        match self.send_once(system, messages, max_tokens).await {
            Ok(text) => Ok(text),
            Err(first_error) => {
                tracing::warn!(error = %first_error, "Anthropic call failed, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                self.send_once(system, messages, max_tokens)
                    .await
                    .map_err(|e| e.context("Anthropic call failed after retry"))
            }
        }
    }
}

// =============================================================================
// OpenAI embeddings
// =============================================================================

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    input: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI implementation of embedding generation
#[derive(Clone)]
pub struct OpenAIEmbeddingClient {
    client: reqwest::Client,
    api_key: String,
}

impl OpenAIEmbeddingClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    async fn create_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            input: text.to_string(),
            model: EMBEDDING_MODEL.to_string(),
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request to OpenAI")?
            .error_for_status()
            .context("OpenAI API returned an error status")?;

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        embedding_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow::anyhow!("No embedding returned"))
    }
}

#[async_trait]
impl BaseEmbeddingService for OpenAIEmbeddingClient {
    async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        match self.create_embedding(text).await {
            Ok(embedding) => Ok(embedding),
            Err(first_error) => {
                tracing::warn!(error = %first_error, "Embedding call failed, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                self.create_embedding(text)
                    .await
                    .map_err(|e| e.context("Embedding call failed after retry"))
            }
        }
    }
}
