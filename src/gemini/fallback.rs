//! Model fallback for generative requests
//!
//! [`ModelFallbackClient`] sends a request to the primary model and, only when
//! upstream says that model does not exist, moves on to the next configured
//! fallback. Any other failure (bad key, quota, timeout, broken response)
//! stops the run at once: another model name would not fix it.
//!
//! Attempts are strictly sequential. Dropping the returned future abandons
//! the in-flight request and no further candidate is tried.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use super::GenerateRequest;
use super::backend::{GeminiBackend, GenerationBackend};
use crate::config::{AttemptedScope, GeminiConfig};
use crate::error::{AppResult, GenerationError};
use crate::metrics::{AttemptLabel, Metrics};

/// Whether an upstream error message means "this model does not exist"
///
/// Case-insensitive match on `NOT_FOUND`, `not found` or `404`. This is the
/// only place that knows the upstream wording.
pub fn is_model_not_found_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("not_found") || lower.contains("not found") || lower.contains("404")
}

/// Reclassify an upstream API error as `ModelNotFound` when it says so
fn classify(error: GenerationError) -> GenerationError {
    match error {
        GenerationError::Api { model, message } if is_model_not_found_error(&message) => {
            GenerationError::ModelNotFound { model, message }
        }
        other => other,
    }
}

/// One model name in the candidate list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCandidate {
    pub name: String,
    pub is_primary: bool,
}

/// Result of sending the request to one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    RetryableFailure(String),
    FatalFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationAttempt {
    pub model: String,
    pub outcome: AttemptOutcome,
}

/// Successful generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    pub text: String,
    /// Model that produced `text`
    pub model: String,
    /// Every attempt in order, ending with the successful one
    pub attempts: Vec<GenerationAttempt>,
}

impl Generation {
    pub fn attempted_models(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .map(|attempt| attempt.model.as_str())
            .collect()
    }
}

/// Generative client that falls back across model names
pub struct ModelFallbackClient {
    backend: Arc<dyn GenerationBackend>,
    candidates: Vec<ModelCandidate>,
    scope: AttemptedScope,
    /// Only used with [`AttemptedScope::Client`]. Never held across an await.
    attempted: Mutex<HashSet<String>>,
    metrics: Option<Arc<Metrics>>,
}

impl ModelFallbackClient {
    /// Candidates are `primary` followed by `fallbacks`, trimmed, keeping
    /// only the first occurrence of each non-blank name
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        primary: &str,
        fallbacks: &[String],
        scope: AttemptedScope,
    ) -> Self {
        let primary = primary.trim();
        let mut seen = HashSet::new();
        let candidates = std::iter::once(primary)
            .chain(fallbacks.iter().map(|name| name.trim()))
            .filter(|name| !name.is_empty() && seen.insert(*name))
            .map(|name| ModelCandidate {
                name: name.to_string(),
                is_primary: name == primary,
            })
            .collect();

        Self {
            backend,
            candidates,
            scope,
            attempted: Mutex::new(HashSet::new()),
            metrics: None,
        }
    }

    /// Client backed by the Gemini REST API
    pub fn from_config(config: &GeminiConfig, api_key: impl Into<String>) -> AppResult<Self> {
        let backend = GeminiBackend::new(config, api_key)?;
        Ok(Self::new(
            Arc::new(backend),
            config.primary_model(),
            config.fallback_models(),
            config.attempted_scope(),
        ))
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn candidates(&self) -> &[ModelCandidate] {
        &self.candidates
    }

    pub fn scope(&self) -> AttemptedScope {
        self.scope
    }

    /// Generate text, falling back on "model not found"
    ///
    /// # Errors
    ///
    /// - the first non-retryable error, unchanged
    /// - [`GenerationError::Exhausted`] carrying the last candidate's error when
    ///   every candidate reported "model not found"
    /// - [`GenerationError::NoCandidates`] when a client-scoped attempted set
    ///   already covers every candidate
    pub async fn generate(&self, request: &GenerateRequest) -> Result<Generation, GenerationError> {
        let mut attempts: Vec<GenerationAttempt> = Vec::new();
        let mut last_error: Option<GenerationError> = None;

        for candidate in &self.candidates {
            if !self.claim(&candidate.name) {
                tracing::debug!(model = %candidate.name, "Skipping previously attempted model");
                continue;
            }

            let attempt = attempts.len() + 1;
            tracing::debug!(
                model = %candidate.name,
                attempt,
                is_primary = candidate.is_primary,
                "Sending generation request"
            );

            match self
                .backend
                .generate(&candidate.name, request)
                .await
                .map_err(classify)
            {
                Ok(text) => {
                    self.record(AttemptLabel::Success);
                    attempts.push(GenerationAttempt {
                        model: candidate.name.clone(),
                        outcome: AttemptOutcome::Success,
                    });
                    if attempt > 1 {
                        tracing::info!(
                            model = %candidate.name,
                            attempt,
                            "Fallback model succeeded"
                        );
                    }
                    return Ok(Generation {
                        text,
                        model: candidate.name.clone(),
                        attempts,
                    });
                }
                Err(error) if error.is_retryable() => {
                    self.record(AttemptLabel::ModelNotFound);
                    tracing::warn!(
                        model = %candidate.name,
                        attempt,
                        error = %error,
                        "Model not found, trying next candidate"
                    );
                    attempts.push(GenerationAttempt {
                        model: candidate.name.clone(),
                        outcome: AttemptOutcome::RetryableFailure(error.to_string()),
                    });
                    last_error = Some(error);
                }
                Err(error) => {
                    self.record(AttemptLabel::Fatal);
                    tracing::error!(
                        model = %candidate.name,
                        attempt,
                        error = %error,
                        "Generation failed, not trying other models"
                    );
                    return Err(error);
                }
            }
        }

        match last_error {
            Some(last) => {
                tracing::error!(
                    attempts = attempts.len(),
                    last_model = ?last.model(),
                    "All candidate models unavailable"
                );
                Err(GenerationError::Exhausted {
                    attempts: attempts.len(),
                    last: Box::new(last),
                })
            }
            None => Err(GenerationError::NoCandidates),
        }
    }

    /// Mark `model` attempted; false when a client-scoped set already has it
    fn claim(&self, model: &str) -> bool {
        match self.scope {
            AttemptedScope::PerCall => true,
            AttemptedScope::Client => self
                .attempted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(model.to_string()),
        }
    }

    fn record(&self, label: AttemptLabel) {
        if let Some(metrics) = &self.metrics {
            metrics.record_generation_attempt(label);
        }
    }
}
