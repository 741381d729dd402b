//! Map analysis endpoint
//!
//! POST /analyze takes an uploaded map image and asks the generative model for
//! a structured groundwater analysis.

use crate::error::{AppError, AppResult};
use crate::gemini::{GenerateRequest, ImageInput, prompts};
use crate::handlers::AppState;
use crate::metrics::AnswerSource;
use crate::middleware::RequestId;
use crate::router::rules::MAP_ANALYSIS_TARGET;
use axum::{Extension, Json, extract::State};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

const SUPPORTED_MIME_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/webp", "image/gif"];

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    pub image_base64: String,
    pub mime_type: String,
}

impl AnalyzeRequest {
    /// Decode and check the image
    fn image(&self) -> AppResult<ImageInput> {
        let mime_type = self.mime_type.trim().to_ascii_lowercase();
        if !SUPPORTED_MIME_TYPES.contains(&mime_type.as_str()) {
            return Err(AppError::Validation(format!(
                "unsupported mime_type '{}', expected one of {}",
                self.mime_type,
                SUPPORTED_MIME_TYPES.join(", ")
            )));
        }

        let data = STANDARD
            .decode(self.image_base64.trim())
            .map_err(|e| AppError::Validation(format!("image_base64 is not valid base64: {}", e)))?;
        if data.is_empty() {
            return Err(AppError::Validation("image_base64 is empty".to_string()));
        }

        Ok(ImageInput { mime_type, data })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    source: AnswerSource,
    response_id: &'static str,
    text: String,
    model: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<AnalyzeRequest>,
) -> AppResult<Json<AnalyzeResponse>> {
    let image = request.image()?;
    tracing::debug!(
        request_id = %request_id,
        mime_type = %image.mime_type,
        image_bytes = image.data.len(),
        "Received map analysis request"
    );

    let generator = state.require_generator()?;
    let prompt = prompts::map_analysis_prompt(request.prompt.as_deref());
    let generation = generator
        .generate(&GenerateRequest::with_image(prompt, image))
        .await?;

    tracing::info!(
        request_id = %request_id,
        model = %generation.model,
        attempts = generation.attempts.len(),
        "Map analysis generated"
    );
    state.metrics().record_query(AnswerSource::Generated);

    Ok(Json(AnalyzeResponse {
        source: AnswerSource::Generated,
        response_id: MAP_ANALYSIS_TARGET,
        text: generation.text,
        model: generation.model,
    }))
}
