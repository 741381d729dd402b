//! Gemini `generateContent` client
//!
//! Wire types for the REST endpoint plus the pieces built on them: the
//! [`GenerationBackend`] seam with its reqwest implementation, and the
//! [`ModelFallbackClient`] that walks a list of candidate models.

pub mod backend;
pub mod fallback;
pub mod prompts;

pub use backend::{GeminiBackend, GenerationBackend};
pub use fallback::{
    AttemptOutcome, Generation, GenerationAttempt, ModelCandidate, ModelFallbackClient,
    is_model_not_found_error,
};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;

/// Harm categories sent with every request
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Raw image attached to a generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// What to generate, independent of the model it is sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub image: Option<ImageInput>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
        }
    }

    pub fn with_image(prompt: impl Into<String>, image: ImageInput) -> Self {
        Self {
            prompt: prompt.into(),
            image: Some(image),
        }
    }
}

/// Sampling parameters sent as `generationConfig`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl From<&GeminiConfig> for GenerationSettings {
    fn from(config: &GeminiConfig) -> Self {
        Self {
            temperature: config.temperature(),
            top_k: config.top_k(),
            top_p: config.top_p(),
            max_output_tokens: config.max_output_tokens(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationSettings,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

impl GenerateContentRequest {
    /// Build the request body; image bytes are base64 encoded
    pub fn new(request: &GenerateRequest, settings: GenerationSettings) -> Self {
        let mut parts = vec![Part {
            text: Some(request.prompt.clone()),
            inline_data: None,
        }];
        if let Some(image) = &request.image {
            parts.push(Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: image.mime_type.clone(),
                    data: STANDARD.encode(&image.data),
                }),
            });
        }

        Self {
            contents: vec![Content { parts }],
            generation_config: settings,
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        }
    }
}

/// Successful response body; only the fields we read
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: String,
}

/// Endpoint for one model, without the API key
pub fn model_url(base_url: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    )
}

/// Flatten an error response into `"{http_status} {status}: {message}"`
///
/// Keeps the numeric code, the status string and the human text together so
/// the not-found check can match on any of them. Bodies that are not the
/// usual error envelope come back as `"{http_status}: {body}"`.
pub fn error_message(http_status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) => format!("{} {}: {}", http_status, status, envelope.error.message),
            None => format!("{}: {}", http_status, envelope.error.message),
        },
        Err(_) => format!("{}: {}", http_status, body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> GenerationSettings {
        GenerationSettings::from(&GeminiConfig::default())
    }

    #[test]
    fn test_text_request_body() {
        let body = GenerateContentRequest::new(&GenerateRequest::text("hello"), settings());
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["contents"][0]["parts"], json!([{"text": "hello"}]));
        assert_eq!(value["generationConfig"]["temperature"], 0.7);
        assert_eq!(value["generationConfig"]["topK"], 40);
        assert_eq!(value["generationConfig"]["topP"], 0.95);
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 1024);

        let safety = value["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert!(
            safety
                .iter()
                .all(|setting| setting["threshold"] == "BLOCK_MEDIUM_AND_ABOVE")
        );
    }

    #[test]
    fn test_image_request_body_is_base64() {
        let request = GenerateRequest::with_image(
            "describe",
            ImageInput {
                mime_type: "image/png".to_string(),
                data: b"png".to_vec(),
            },
        );
        let value = serde_json::to_value(GenerateContentRequest::new(&request, settings())).unwrap();

        let parts = value["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], "cG5n");
    }

    #[test]
    fn test_response_text_extraction() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "answer"}, {"text": "ignored"}]}}]
        }))
        .unwrap();
        assert_eq!(response.text(), Some("answer"));
    }

    #[test]
    fn test_response_without_text() {
        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.text(), None);

        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert_eq!(blocked.text(), None);
    }

    #[test]
    fn test_model_url() {
        assert_eq!(
            model_url("http://localhost:9000/v1beta/", "gemini-pro"),
            "http://localhost:9000/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error": {"code": 404, "status": "NOT_FOUND", "message": "models/x is not found"}}"#;
        assert_eq!(
            error_message(404, body),
            "404 NOT_FOUND: models/x is not found"
        );
    }

    #[test]
    fn test_error_message_from_plain_body() {
        assert_eq!(error_message(502, " Bad Gateway \n"), "502: Bad Gateway");
    }
}
