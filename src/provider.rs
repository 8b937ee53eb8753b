//! Image Generation Provider
//!
//! The generative service is an opaque remote call: two images and a prompt in,
//! one image out. [`ImageGenerator`] is the seam the orchestrator depends on;
//! [`GeminiClient`] implements it against the Gemini `generateContent` API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::encoded_image::EncodedImage;
use crate::error::ReziError;

/// Message used when the service answers without any image part.
pub const NO_IMAGE_MESSAGE: &str = "The model did not return an image.";

/// Two photographs and the scene the user asked for. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub childhood_image: EncodedImage,
    pub current_image: EncodedImage,
    pub prompt: String,
}

/// Generation service client trait
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Produce one image from the request. Called at most once per attempt.
    async fn generate(&self, request: &GenerationRequest) -> Result<EncodedImage, ReziError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (falls back to GEMINI_API_KEY / API_KEY when unset)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the API, without the `/models/...` suffix
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-2.5-flash-image-preview".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(format!(
                "Endpoint must be an http(s) URL: {}",
                self.endpoint
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn build_provider_http_client(request_timeout: Duration) -> Result<Client, ReziError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(|e| ReziError::Config(format!("Failed to create HTTP client: {}", e)))
}

// Helper function to map transport errors to a service failure
fn map_http_error(error: reqwest::Error) -> ReziError {
    if error.is_timeout() {
        ReziError::service_failure(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ReziError::service_failure(format!("Connection error: {}", error))
    } else {
        ReziError::service_failure(error.to_string())
    }
}

/// Gemini provider client
pub struct GeminiClient {
    client: Client,
    model: String,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(
        model: String,
        api_key: String,
        endpoint: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, ReziError> {
        let client = build_provider_http_client(request_timeout)?;
        let endpoint = endpoint
            .unwrap_or_else(default_endpoint)
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            client,
            model,
            api_key,
            endpoint,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ReziError> {
        config.validate().map_err(ReziError::Config)?;
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ReziError::Config(
                    "No API key configured (set provider.api_key or GEMINI_API_KEY)".to_string(),
                )
            })?;
        Self::new(
            config.model.clone(),
            api_key,
            Some(config.endpoint.clone()),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<EncodedImage, ReziError> {
        let body = build_request_body(request);
        debug!(model = %self.model, "Dispatching generateContent request");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_http_error)?;

        if !status.is_success() {
            let message = extract_error_message(&text)
                .unwrap_or_else(|| format!("Request failed with status {}", status));
            return Err(ReziError::service_failure(message));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            ReziError::service_failure(format!("Failed to parse response: {}", e))
        })?;
        extract_image(parsed)
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Instruction sent with the two images. The user's scene is appended.
pub fn composition_instruction(prompt: &str) -> String {
    format!(
        "The first image is a childhood photo and the second image is a recent photo of the same person. \
         Create one photorealistic image in which the child and the adult appear together, \
         keeping both faces recognisable. Scene: {}",
        prompt.trim()
    )
}

pub fn build_request_body(request: &GenerationRequest) -> Value {
    json!({
        "contents": [{
            "parts": [
                inline_part(&request.childhood_image),
                inline_part(&request.current_image),
                { "text": composition_instruction(&request.prompt) },
            ]
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE", "TEXT"]
        }
    })
}

fn inline_part(image: &EncodedImage) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.media_type(),
            "data": image.payload(),
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// First inline image of the first candidate that carries one.
pub fn extract_image(response: GenerateContentResponse) -> Result<EncodedImage, ReziError> {
    let mut model_text = None;
    for part in response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
    {
        if let Some(inline) = part.inline_data {
            return Ok(EncodedImage::new(inline.data, inline.mime_type));
        }
        if model_text.is_none() {
            model_text = part.text;
        }
    }

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ReziError::service_failure(format!(
            "The request was blocked: {}",
            reason
        )));
    }
    match model_text {
        Some(text) if !text.trim().is_empty() => Err(ReziError::service_failure(format!(
            "{} {}",
            NO_IMAGE_MESSAGE,
            text.trim()
        ))),
        _ => Err(ReziError::service_failure(NO_IMAGE_MESSAGE)),
    }
}

/// `error.message` of a provider error body, if present.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
