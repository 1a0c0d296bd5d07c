use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Failure taxonomy of the generative service. Every variant is retryable
/// from the variant generator's point of view.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Service error: {0}")]
    Service(String),
}

#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

impl GenerationParams {
    /// Sampling used for question-variant generation.
    pub fn variant() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 8192,
            top_p: None,
            top_k: None,
        }
    }

    /// Sampling used for study-guide generation: hotter and with a large
    /// output budget, since the whole guide comes back in one call.
    pub fn study_guide() -> Self {
        Self {
            temperature: 0.8,
            max_output_tokens: 16384,
            top_p: Some(0.95),
            top_k: Some(40),
        }
    }
}

/// Text-generation capability, injected everywhere as `Arc<dyn ...>` so the
/// pipeline can be exercised against a scripted fake.
#[async_trait]
pub trait GenerativeTextService: Send + Sync {
    async fn submit(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError>;
}

/// Gemini-backed implementation of [`GenerativeTextService`].
#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    api_key: String,
    model: String,
}

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "topP", skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(rename = "topK", skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

impl GeminiService {
    pub fn new(api_key: String, model: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl GenerativeTextService for GeminiService {
    async fn submit(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_output_tokens,
                top_p: params.top_p,
                top_k: params.top_k,
            },
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_ENDPOINT, self.model, self.api_key
        );

        let res = self
            .client
            .post(&url)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Service(e.to_string())
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(LlmError::QuotaExceeded(text));
            }
            return Err(LlmError::Service(format!("Gemini API error {}: {}", status, text)));
        }

        let body: JsonValue = res
            .json()
            .await
            .map_err(|e| LlmError::Service(e.to_string()))?;

        body.get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::Service("Invalid Gemini response format".to_string()))
    }
}
