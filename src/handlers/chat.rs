//! Chat endpoint handler
//!
//! Handles POST /chat. A question is answered from static data (a state deep
//! dive, a canned catalog entry or a block report) when one applies,
//! otherwise by the generative model.

use crate::catalog::ResponseCatalogEntry;
use crate::detection::{DetectedState, detect_state};
use crate::error::{AppError, AppResult};
use crate::gemini::{GenerateRequest, prompts};
use crate::handlers::AppState;
use crate::metrics::AnswerSource;
use crate::middleware::RequestId;
use crate::router::rules::MAP_ANALYSIS_TARGET;
use crate::states::{BlockReport, StateGroundwaterProfile};
use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum allowed message length in characters (100K chars)
const MAX_MESSAGE_LENGTH: usize = 100_000;

/// `response_id` of deep-dive answers
pub const STATE_DEEP_DIVE_ID: &str = "stateDeepDive";

/// `response_id` of block report answers
pub const BLOCK_REPORT_ID: &str = "blockReport";

/// Chat request from client
///
/// Validation is enforced during deserialization - invalid instances cannot exist.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    message: String,
}

impl ChatRequest {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<'de> Deserialize<'de> for ChatRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawChatRequest {
            message: String,
        }

        let raw = RawChatRequest::deserialize(deserializer)?;

        if raw.message.trim().is_empty() {
            return Err(serde::de::Error::custom(
                "message cannot be empty or contain only whitespace",
            ));
        }

        // Count Unicode characters, not bytes
        let char_count = raw.message.chars().count();
        if char_count > MAX_MESSAGE_LENGTH {
            return Err(serde::de::Error::custom(format!(
                "message exceeds maximum length of {} characters (got {})",
                MAX_MESSAGE_LENGTH, char_count
            )));
        }

        Ok(ChatRequest {
            message: raw.message,
        })
    }
}

/// Chat response to client
///
/// Exactly one payload is set: `entry` for catalog answers, `profile` for
/// deep dives, `block` for block reports, `text` and `model` for generated
/// ones.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    source: AnswerSource,
    response_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<ResponseCatalogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<StateGroundwaterProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    block: Option<BlockReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    detected_state: DetectedState,
}

impl ChatResponse {
    fn empty(source: AnswerSource, detected_state: DetectedState) -> Self {
        Self {
            source,
            response_id: None,
            entry: None,
            profile: None,
            block: None,
            text: None,
            model: None,
            detected_state,
        }
    }

    fn catalog(entry: &ResponseCatalogEntry, detected_state: DetectedState) -> Self {
        Self {
            response_id: Some(entry.id().to_string()),
            entry: Some(entry.clone()),
            ..Self::empty(AnswerSource::Catalog, detected_state)
        }
    }

    fn state_profile(profile: &StateGroundwaterProfile, detected_state: DetectedState) -> Self {
        Self {
            response_id: Some(STATE_DEEP_DIVE_ID.to_string()),
            profile: Some(profile.clone()),
            ..Self::empty(AnswerSource::StateProfile, detected_state)
        }
    }

    fn block_report(block: &BlockReport, detected_state: DetectedState) -> Self {
        Self {
            response_id: Some(BLOCK_REPORT_ID.to_string()),
            block: Some(block.clone()),
            ..Self::empty(AnswerSource::BlockReport, detected_state)
        }
    }

    fn generated(
        response_id: Option<&str>,
        text: String,
        model: String,
        detected_state: DetectedState,
    ) -> Self {
        Self {
            response_id: response_id.map(str::to_string),
            text: Some(text),
            model: Some(model),
            ..Self::empty(AnswerSource::Generated, detected_state)
        }
    }

    pub fn source(&self) -> AnswerSource {
        self.source
    }

    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }
}

/// Which answer path a message takes
#[derive(Debug, Clone, Copy)]
enum Route<'a> {
    DeepDive(&'a StateGroundwaterProfile),
    MapAnalysis,
    Catalog(&'a str),
    Block(&'a BlockReport),
    Generative,
}

impl Route<'_> {
    fn label(&self) -> &'static str {
        match self {
            Route::DeepDive(_) => "deep_dive",
            Route::MapAnalysis => "map_analysis",
            Route::Catalog(_) => "catalog",
            Route::Block(_) => "block_report",
            Route::Generative => "generative",
        }
    }
}

fn route_message<'a>(state: &'a AppState, message: &str) -> Route<'a> {
    if let Some(profile) = state.atlas().deep_dive(message) {
        Route::DeepDive(profile)
    } else if state.map_router().route(message).is_some() {
        Route::MapAnalysis
    } else if let Some(id) = state.router().route(message) {
        Route::Catalog(id)
    } else if let Some(block) = state.atlas().find_block(message) {
        Route::Block(block)
    } else {
        Route::Generative
    }
}

/// Chat handler
///
/// 1. "deep dive <state>": that state's profile
/// 2. map analysis trigger: generative call with the map analysis prompt
/// 3. catalog rule: canned entry, no network call
/// 4. a known block named in the message: its assessment report
/// 5. otherwise: generative call with the assistant prompt
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let message = request.message();
    tracing::debug!(
        request_id = %request_id,
        message_length = message.len(),
        "Received chat request"
    );

    let routing_start = std::time::Instant::now();
    let route = route_message(&state, message);
    let routing_duration_ms = routing_start.elapsed().as_secs_f64() * 1000.0;

    // Observability should never break requests
    if let Err(e) = state
        .metrics()
        .record_routing_duration("chat", routing_duration_ms)
    {
        tracing::error!(request_id = %request_id, error = %e, "Metrics recording failed (non-fatal)");
    }

    tracing::info!(
        request_id = %request_id,
        route = route.label(),
        routing_duration_ms = %routing_duration_ms,
        "Routing decision made"
    );

    let detected_state = detect_state(message);

    let (response_id, prompt) = match route {
        Route::DeepDive(profile) => {
            state.metrics().record_query(AnswerSource::StateProfile);
            return Ok(Json(ChatResponse::state_profile(profile, detected_state)));
        }
        Route::Block(block) => {
            state.metrics().record_query(AnswerSource::BlockReport);
            return Ok(Json(ChatResponse::block_report(block, detected_state)));
        }
        Route::Catalog(id) => {
            let entry = state.catalog().get(id).ok_or_else(|| {
                // Targets are checked against the catalog at startup
                AppError::Internal(format!("routing target '{}' missing from catalog", id))
            })?;
            state.metrics().record_query(AnswerSource::Catalog);
            return Ok(Json(ChatResponse::catalog(entry, detected_state)));
        }
        Route::MapAnalysis => (
            Some(MAP_ANALYSIS_TARGET),
            prompts::map_analysis_prompt(Some(message)),
        ),
        Route::Generative => (None, prompts::assistant_prompt(message)),
    };

    let generator = state.require_generator()?;
    let generation = generator.generate(&GenerateRequest::text(prompt)).await?;

    tracing::info!(
        request_id = %request_id,
        model = %generation.model,
        attempts = generation.attempts.len(),
        "Generated answer"
    );
    state.metrics().record_query(AnswerSource::Generated);

    Ok(Json(ChatResponse::generated(
        response_id,
        generation.text,
        generation.model,
        detected_state,
    )))
}
