//! Transport for a single `generateContent` call

use async_trait::async_trait;
use std::time::Duration;

use super::{
    GenerateContentRequest, GenerateContentResponse, GenerateRequest, GenerationSettings,
    error_message, model_url,
};
use crate::config::GeminiConfig;
use crate::error::{AppError, AppResult, GenerationError};

/// Sends one request to one named model
///
/// Implementations report upstream error envelopes as
/// [`GenerationError::Api`] with the flattened message; deciding whether
/// that means "model not found" is left to the caller.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<String, GenerationError>;
}

/// Gemini REST backend over reqwest
///
/// Not `Debug`: holds the API key.
#[derive(Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    settings: GenerationSettings,
    timeout_seconds: u64,
}

impl GeminiBackend {
    pub fn new(config: &GeminiConfig, api_key: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            api_key: api_key.into(),
            settings: GenerationSettings::from(config),
            timeout_seconds: config.request_timeout_seconds(),
        })
    }

    async fn send(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<(reqwest::StatusCode, String), reqwest::Error> {
        let response = self
            .client
            .post(model_url(&self.base_url, model))
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateContentRequest::new(request, self.settings))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<String, GenerationError> {
        let deadline = Duration::from_secs(self.timeout_seconds);

        let (status, body) = match tokio::time::timeout(deadline, self.send(model, request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                // reqwest errors can embed the request URL, which carries the key
                return Err(GenerationError::Transport {
                    model: model.to_string(),
                    message: e.without_url().to_string(),
                });
            }
            Err(_) => {
                return Err(GenerationError::Timeout {
                    model: model.to_string(),
                    timeout_seconds: self.timeout_seconds,
                });
            }
        };

        if !status.is_success() {
            return Err(GenerationError::Api {
                model: model.to_string(),
                message: error_message(status.as_u16(), &body),
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| GenerationError::InvalidResponse {
                model: model.to_string(),
                reason: format!("malformed response body: {}", e),
            })?;

        parsed
            .text()
            .map(str::to_string)
            .ok_or_else(|| GenerationError::InvalidResponse {
                model: model.to_string(),
                reason: "response has no candidate text".to_string(),
            })
    }
}
