//! Gemini API transport for the agent loop
//!
//! Sends one prompt, validates the response envelope and retries with a
//! linear backoff. Uses a long-lived reqwest::Client for connection pooling.

use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sends a prompt to the model and returns its text reply
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn send(&self, prompt: &str) -> Result<String, TransportError>;

    /// Replace the credential used for subsequent requests
    fn set_credential(&self, _credential: &str) {}
}

/// Retry bound and linear backoff base
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Run `attempt` until it succeeds or the policy is spent
pub async fn retry_with_backoff<F, Fut>(
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<String, TransportError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<String, String>>,
{
    let mut last_error = String::from("no attempt made");

    for n in 1..=policy.max_attempts {
        match attempt(n).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                warn!(attempt = n, max_attempts = policy.max_attempts, error = %e, "LLM request failed");
                last_error = e;
            }
        }

        if n < policy.max_attempts {
            tokio::time::sleep(policy.delay_after(n)).await;
        }
    }

    Err(TransportError {
        attempts: policy.max_attempts,
        message: last_error,
    })
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: RwLock<String>,
    url: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: &str, model: &str) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key: RwLock::new(api_key),
            url: format!(
                "{}/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn current_key(&self) -> String {
        self.api_key
            .read()
            .map(|key| key.clone())
            .unwrap_or_default()
    }

    /// One request/response round trip, no retry
    async fn generate_once(&self, prompt: &str) -> Result<String, String> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 512,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", self.current_key())
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Gemini API request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Gemini API returned {}: {}", status, error_text));
        }

        let envelope: GeminiResponse = response
            .json()
            .await
            .map_err(|e| format!("Gemini parse error: {}", e))?;

        extract_text(&envelope)
    }
}

#[async_trait]
impl LlmTransport for GeminiClient {
    async fn send(&self, prompt: &str) -> Result<String, TransportError> {
        if self.current_key().is_empty() {
            return Err(TransportError {
                attempts: 0,
                message: "GEMINI_API_KEY not configured".to_string(),
            });
        }

        info!(prompt_chars = prompt.len(), "Calling Gemini API");

        let text = retry_with_backoff(&self.retry, |attempt| async move {
            debug!(attempt, "Gemini attempt");
            self.generate_once(prompt).await
        })
        .await?;

        debug!(response = %text, "Gemini response received");
        Ok(text)
    }

    fn set_credential(&self, credential: &str) {
        if let Ok(mut key) = self.api_key.write() {
            if *key != credential {
                *key = credential.to_string();
            }
        }
    }
}

/// Pull the first candidate's text out of an envelope
pub fn extract_text(envelope: &GeminiResponse) -> Result<String, String> {
    let candidate = envelope
        .candidates
        .first()
        .ok_or_else(|| "No candidates in Gemini response".to_string())?;

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err("Empty response from Gemini".to_string());
    }

    Ok(text.to_string())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}
