//! Client for the Gemini `generateContent` REST endpoint.

#[cfg(test)]
pub(crate) mod test_server;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use std::path::Path;

use crate::{config::GeminiConfig, models::Note};

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,

    #[error("failed to reach Gemini API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gemini API returned {status}: {body}")]
    Upstream {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed Gemini response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn image(image: &InlineImage) -> Result<Self, GeminiError> {
        let mime_type = detect_image_mime_type(&image.file_name)
            .ok_or_else(|| GeminiError::UnsupportedImageFormat(image.file_name.clone()))?;

        Ok(Self {
            text: None,
            inline_data: Some(Blob {
                mime_type: mime_type.to_string(),
                data: STANDARD.encode(&image.data),
            }),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64 encoded bytes
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if there is one.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.text.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates_token_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<u32>,
}

/// An uploaded image sent inline with a request.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub file_name: String,
    pub data: Vec<u8>,
}

pub fn detect_image_mime_type(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// The image is referenced by its stored path only, its bytes are not sent.
pub fn build_note_prompt(note: &Note, request_text: &str) -> String {
    format!(
        "Analyze the content and image of the following note. Request: {request_text}\n\
         Title: {}\nContent: {}\nImage URL: {}",
        note.title, note.content, note.img
    )
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, GeminiError> {
        if config.api_key.trim().is_empty() {
            return Err(GeminiError::MissingApiKey);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn analyze_note(&self, note: &Note, request_text: &str) -> Result<String, GeminiError> {
        tracing::info!("Requesting Gemini analysis of note {}", note.id);
        self.generate(vec![Part::text(build_note_prompt(note, request_text))])
            .await
    }

    pub async fn compare_images(
        &self,
        request_text: &str,
        images: &[InlineImage; 2],
    ) -> Result<String, GeminiError> {
        let mut parts = vec![Part::text(request_text)];
        for image in images {
            parts.push(Part::image(image)?);
        }

        tracing::info!(
            "Requesting Gemini comparison of '{}' and '{}'",
            images[0].file_name,
            images[1].file_name
        );
        self.generate(parts).await
    }

    /// Sends one `generateContent` call and returns the response body unchanged once it parses.
    async fn generate(&self, parts: Vec<Part>) -> Result<String, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("Gemini API returned {}: {}", status, body);
            return Err(GeminiError::Upstream { status, body });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;
        match parsed.first_text() {
            Some(text) => tracing::debug!("Generated content: {}", text),
            None => tracing::debug!("No candidates found in Gemini response"),
        }

        Ok(body)
    }
}
