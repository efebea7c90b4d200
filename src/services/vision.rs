//! Vision model client
//!
//! Badge detection is delegated to an external vision model behind the
//! `VisionClient` trait. The production implementation talks to a local
//! Ollama server; tests substitute a scripted client. The raw response
//! text crosses the boundary as-is, so parsing stays testable without a
//! model in the loop.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::VisionConfig;
use crate::error::{Error, Result};

/// Boundary to the external vision model.
///
/// Implementations must be safe to share across concurrent scan tasks.
#[async_trait::async_trait]
pub trait VisionClient: Send + Sync {
    /// Analyze one image and return the model's raw text response.
    ///
    /// `known_badges` are the canonical catalog names, given to the model as
    /// context so it prefers real badge names over free invention.
    async fn analyze_image(&self, image_path: &str, known_badges: &[String]) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Ollama-backed vision client with bounded retry
pub struct OllamaVisionClient {
    client: reqwest::Client,
    config: VisionConfig,
}

impl OllamaVisionClient {
    pub fn new(config: VisionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn build_prompt(known_badges: &[String]) -> String {
        let mut prompt = String::from(
            "You are looking at a photo of scouting badges. Identify every badge \
             visible and how many of each you see.\n\
             Reply with one badge per line in exactly this format:\n\
             badge name | count | confidence\n\
             where confidence is one of: high, medium, low.\n",
        );

        if !known_badges.is_empty() {
            prompt.push_str("\nKnown badge names (prefer these exact names):\n");
            for name in known_badges {
                prompt.push_str("- ");
                prompt.push_str(name);
                prompt.push('\n');
            }
        }

        prompt
    }

    async fn request_once(&self, prompt: &str, image_b64: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.config.endpoint.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
                images: vec![image_b64.to_string()],
            }],
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("Vision request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "Vision model returned HTTP {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("Invalid vision response: {}", e)))?;

        Ok(body.message.content)
    }
}

#[async_trait::async_trait]
impl VisionClient for OllamaVisionClient {
    async fn analyze_image(&self, image_path: &str, known_badges: &[String]) -> Result<String> {
        let bytes = tokio::fs::read(image_path).await?;
        let image_b64 = BASE64.encode(&bytes);
        let prompt = Self::build_prompt(known_badges);

        let mut last_error = Error::Internal("Vision analysis not attempted".to_string());

        for attempt in 0..self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: delay doubles per failed attempt
                let delay = self.config.retry_delay_ms * (1u64 << (attempt - 1));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.request_once(&prompt, &image_b64).await {
                Ok(response) => {
                    debug!(
                        image = %image_path,
                        attempt = attempt + 1,
                        response_len = response.len(),
                        "Vision analysis succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    warn!(
                        image = %image_path,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "Vision analysis attempt failed"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
