use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use crate::{credentials::Credential, models::{ItemPhoto, ListingResult}};

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("Gemini API returned status {status}: {body}")] Status { status: u16, body: String },
    #[error("parse error: {0}")] Parse(String),
    #[error("no text in response{}", .0.as_deref().map(|r| format!(" (blocked: {r})")).unwrap_or_default())]
    Empty(Option<String>),
}

/// Anything that can turn a prompt and a photo into listing text.
#[async_trait]
pub trait ListingGenerator: Send + Sync {
    async fn generate(
        &self,
        credential: &Credential,
        prompt: &str,
        photo: &ItemPhoto,
    ) -> Result<ListingResult, GeminiError>;
}

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let serde_json::Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = serde_json::Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    async fn perform_api_call(&self, api_key: &str, prompt: &str, photo: &ItemPhoto) -> Result<String, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, api_key
        );

        info!("🔗 Making request to: {}", url.replace(api_key, "***"));

        let request_body = json!({
            "contents": [{
                "parts": [
                    {"text": prompt},
                    {"inlineData": {"mimeType": photo.mime_type, "data": photo.base64()}}
                ]
            }]
        });

        let mut logged = request_body.clone();
        truncate_base64_in_json(&mut logged);
        info!("📤 Request body: {}", serde_json::to_string_pretty(&logged).unwrap_or_default());

        let response = self.client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.without_url().to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await
            .map_err(|e| GeminiError::Http(e.without_url().to_string()))?;

        if !status.is_success() {
            error!("❌ API Error response: {}", response_text);
            return Err(GeminiError::Status { status: status.as_u16(), body: response_text });
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| GeminiError::Parse(e.to_string()))?;

        extract_text(&parsed).ok_or_else(|| {
            GeminiError::Empty(parsed.prompt_feedback.and_then(|f| f.block_reason))
        })
    }
}

#[async_trait]
impl ListingGenerator for GeminiClient {
    async fn generate(
        &self,
        credential: &Credential,
        prompt: &str,
        photo: &ItemPhoto,
    ) -> Result<ListingResult, GeminiError> {
        info!("🧐 Analyzing '{}' ({}x{}, {}) with {}", photo.file_name, photo.width, photo.height, photo.mime_type, self.model);
        match self.perform_api_call(credential.expose(), prompt, photo).await {
            Ok(text) => {
                info!("✅ Listing generated ({} chars)", text.len());
                Ok(ListingResult { text })
            }
            Err(e) => {
                error!("❌ Listing generation failed: {}", e);
                Err(e)
            }
        }
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other {},
}

/// All text parts of the first candidate, joined as-is.
fn extract_text(resp: &GeminiResponse) -> Option<String> {
    let candidate = resp.candidates.first()?;
    let text: String = candidate
        .content
        .parts
        .iter()
        .filter_map(|p| match p {
            Part::Text { text } => Some(text.as_str()),
            Part::Other {} => None,
        })
        .collect();
    (!text.is_empty()).then_some(text)
}
