//! Gemini (Google) generation client.

use crate::client::{EditedImage, GenerationClient};
use crate::error::{parse_retry_after, sanitize_error_message, MultiGenError, Result};
use crate::image::EmbeddedImage;
use crate::prompts::normalize_lines;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Model used for prompt expansion.
const TEXT_MODEL: &str = "gemini-2.5-flash";

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiImageModel {
    /// Gemini 2.5 Flash Image (fast, economical).
    #[default]
    FlashImage,
    /// Gemini 3 Pro Image (highest quality).
    ProImage,
}

impl GeminiImageModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlashImage => "gemini-2.5-flash-image",
            Self::ProImage => "nano-banana-pro-preview",
        }
    }
}

/// Builder for [`GeminiClient`].
#[derive(Debug, Clone, Default)]
pub struct GeminiClientBuilder {
    api_key: Option<String>,
    image_model: GeminiImageModel,
}

impl GeminiClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the image model variant.
    pub fn image_model(mut self, model: GeminiImageModel) -> Self {
        self.image_model = model;
        self
    }

    /// Builds the client, resolving the API key.
    pub fn build(self) -> Result<GeminiClient> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .ok_or_else(|| {
                MultiGenError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        Ok(GeminiClient {
            client: reqwest::Client::new(),
            api_key,
            image_model: self.image_model,
        })
    }
}

/// Gemini generation client: image edits plus prompt expansion.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    image_model: GeminiImageModel,
}

impl GeminiClient {
    /// Creates a new [`GeminiClientBuilder`].
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    /// Returns the configured image model.
    pub fn image_model(&self) -> GeminiImageModel {
        self.image_model
    }

    async fn generate_content(&self, model: &str, body: &GeminiRequest) -> Result<GeminiResponse> {
        let url = format!("{API_BASE}/{model}:generateContent");

        tracing::debug!(model, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text, &headers));
        }

        Ok(response.json().await?)
    }

    fn parse_error(
        &self,
        status: u16,
        text: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> MultiGenError {
        let text = sanitize_error_message(text);
        if status == 404 {
            return MultiGenError::InvalidRequest(
                "Model not found. Verify the model name is correct.".into(),
            );
        }
        if status == 429 {
            let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
            return MultiGenError::RateLimited { retry_after };
        }
        if status == 401 || status == 403 {
            return MultiGenError::Auth(text);
        }
        let lower = text.to_lowercase();
        if lower.contains("safety")
            || lower.contains("blocked")
            || lower.contains("content_policy")
            || lower.contains("prohibited")
        {
            return MultiGenError::ContentBlocked(text);
        }
        MultiGenError::Api {
            status,
            message: text,
        }
    }

    /// Checks that the configured model is reachable and authenticated.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{API_BASE}/{}", self.image_model.as_str());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(MultiGenError::Auth("Invalid API key".into())),
            404 => Err(MultiGenError::InvalidRequest(
                "Model not found. Verify the model name is correct.".into(),
            )),
            s if !(200..300).contains(&s) => Err(MultiGenError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn edit_image(&self, reference: &EmbeddedImage, prompt: &str) -> Result<EditedImage> {
        let body = edit_request_body(reference, prompt);
        let response = self
            .generate_content(self.image_model.as_str(), &body)
            .await?;
        extract_edited_image(response)
    }

    async fn expand_prompts(&self, description: &str) -> Result<Vec<String>> {
        let body = expansion_request_body(description);
        let response = self.generate_content(TEXT_MODEL, &body).await?;
        Ok(normalize_lines(&extract_text(response)))
    }
}

/// The fixed instruction wrapped around the user's description.
fn expansion_instruction(description: &str) -> String {
    format!(
        "You are a creative assistant for an AI image generator. \
         The user wants a list of image prompts based on this description: \"{description}\". \
         Generate a list of specific, detailed, and creative image prompts. \
         Return ONLY the prompts, separated by new lines. \
         Do not include numbering (like 1. or -) at the start of lines."
    )
}

fn edit_request_body(reference: &EmbeddedImage, prompt: &str) -> GeminiRequest {
    // Inline image first, then the prompt; the payload is the bare base64
    // data with the media type carried separately.
    let parts = vec![
        GeminiRequestPart::InlineData {
            inline_data: GeminiInlineData {
                mime_type: reference.media_type().to_string(),
                data: reference.base64_data().to_string(),
            },
        },
        GeminiRequestPart::Text {
            text: prompt.to_string(),
        },
    ];

    GeminiRequest {
        contents: vec![GeminiContent { parts }],
        generation_config: Some(GeminiConfig {
            response_modalities: vec!["IMAGE".to_string()],
        }),
    }
}

fn expansion_request_body(description: &str) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            parts: vec![GeminiRequestPart::Text {
                text: expansion_instruction(description),
            }],
        }],
        generation_config: None,
    }
}

fn extract_edited_image(response: GeminiResponse) -> Result<EditedImage> {
    // Blocks are returned as HTTP 200 with prompt_feedback set
    if let Some(ref feedback) = response.prompt_feedback {
        if let Some(ref reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .clone()
                .unwrap_or_else(|| format!("Prompt blocked: {reason}"));
            return Err(MultiGenError::ContentBlocked(msg));
        }
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| MultiGenError::NoImage("no candidates in response".into()))?;

    if let Some(ref finish_reason) = candidate.finish_reason {
        match finish_reason.as_str() {
            "SAFETY"
            | "IMAGE_SAFETY"
            | "IMAGE_PROHIBITED_CONTENT"
            | "IMAGE_RECITATION"
            | "RECITATION"
            | "PROHIBITED_CONTENT"
            | "BLOCKLIST" => {
                return Err(MultiGenError::ContentBlocked(format!(
                    "Content blocked by safety filter: {finish_reason}"
                )));
            }
            "IMAGE_OTHER" | "NO_IMAGE" => {
                return Err(MultiGenError::NoImage(format!(
                    "generation finished without an image: {finish_reason}"
                )));
            }
            _ => {} // STOP, MAX_TOKENS, etc. are normal
        }
    }

    let content = candidate
        .content
        .ok_or_else(|| MultiGenError::NoImage("no content in candidate".into()))?;

    let inline = content
        .parts
        .into_iter()
        .find_map(|p| p.inline_data)
        .ok_or_else(|| MultiGenError::NoImage("no image data found in response".into()))?;

    let media_type = if inline.mime_type.is_empty() {
        "image/png".to_string()
    } else {
        inline.mime_type
    };

    Ok(EditedImage {
        data: inline.data,
        media_type,
    })
}

/// Collects the text parts of the first candidate; absent text is an empty
/// response, not an error.
fn extract_text(response: GeminiResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> EmbeddedImage {
        EmbeddedImage::with_media_type("image/jpeg", b"reference bytes")
    }

    #[test]
    fn test_image_model_as_str() {
        assert_eq!(GeminiImageModel::FlashImage.as_str(), "gemini-2.5-flash-image");
        assert_eq!(GeminiImageModel::ProImage.as_str(), "nano-banana-pro-preview");
    }

    #[test]
    fn test_image_model_default() {
        assert_eq!(GeminiImageModel::default(), GeminiImageModel::FlashImage);
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let client = GeminiClientBuilder::new()
            .api_key("test-key")
            .image_model(GeminiImageModel::ProImage)
            .build()
            .unwrap();
        assert_eq!(client.image_model(), GeminiImageModel::ProImage);
    }

    #[test]
    fn test_edit_request_has_image_then_prompt() {
        let body = edit_request_body(&reference(), "make it blue");

        assert_eq!(body.contents.len(), 1);
        let parts = &body.contents[0].parts;
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0], GeminiRequestPart::InlineData { .. }));
        assert!(matches!(parts[1], GeminiRequestPart::Text { .. }));
    }

    #[test]
    fn test_edit_request_strips_data_uri_prefix() {
        let body = edit_request_body(&reference(), "make it blue");
        let json = serde_json::to_value(&body).unwrap();

        let inline = &json["contents"][0]["parts"][0]["inline_data"];
        assert_eq!(inline["mimeType"], "image/jpeg");
        let data = inline["data"].as_str().unwrap();
        assert!(!data.starts_with("data:"));
        assert!(!data.contains("base64,"));
    }

    #[test]
    fn test_edit_request_serialization_uses_camel_case() {
        let body = edit_request_body(&reference(), "make it blue");
        let json = serde_json::to_value(&body).unwrap();

        assert!(json.get("generationConfig").is_some());
        assert!(json.get("generation_config").is_none());
        assert_eq!(json["generationConfig"]["responseModalities"][0], "IMAGE");
    }

    #[test]
    fn test_expansion_request_is_single_text_part() {
        let body = expansion_request_body("three fruit bowls");

        assert_eq!(body.contents[0].parts.len(), 1);
        match &body.contents[0].parts[0] {
            GeminiRequestPart::Text { text } => {
                assert!(text.contains("\"three fruit bowls\""));
                assert!(text.contains("Do not include numbering"));
            }
            other => panic!("unexpected part: {other:?}"),
        }

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_extract_edited_image() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": {
                            "mimeType": "image/png",
                            "data": "iVBORw0KGgo="
                        }
                    }]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let edited = extract_edited_image(resp).unwrap();
        assert_eq!(edited.media_type, "image/png");
        assert_eq!(edited.data, "iVBORw0KGgo=");
    }

    #[test]
    fn test_extract_defaults_missing_mime_type() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"inlineData": {"data": "iVBORw0KGgo="}}]
                }
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let edited = extract_edited_image(resp).unwrap();
        assert_eq!(edited.media_type, "image/png");
    }

    #[test]
    fn test_response_without_image_is_no_image_error() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"text": "I cannot edit this image."}]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = extract_edited_image(resp).unwrap_err();
        assert!(matches!(err, MultiGenError::NoImage(_)));
    }

    #[test]
    fn test_empty_candidates_is_no_image_error() {
        let resp: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        let err = extract_edited_image(resp).unwrap_err();
        assert!(matches!(err, MultiGenError::NoImage(_)));
    }

    #[test]
    fn test_prompt_feedback_block_is_content_blocked() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = extract_edited_image(resp).unwrap_err();
        match err {
            MultiGenError::ContentBlocked(msg) => {
                assert_eq!(msg, "Prompt was blocked due to safety");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_safety_finish_reason_is_content_blocked() {
        let json = r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = extract_edited_image(resp).unwrap_err();
        assert!(matches!(err, MultiGenError::ContentBlocked(_)));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"text": "1. apples\nbananas"}, {"text": "grapes"}]
                }
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_text(resp), "1. apples\nbananas\ngrapes");
    }

    #[test]
    fn test_extract_text_missing_is_empty() {
        let resp: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(extract_text(resp), "");
    }

    #[test]
    fn test_expansion_normalization_keeps_numbering() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "1. apples\nbananas\n\ngrapes"}]}
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let prompts = normalize_lines(&extract_text(resp));
        assert_eq!(prompts, ["1. apples", "bananas", "grapes"]);
    }
}
