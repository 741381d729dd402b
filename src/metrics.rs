//! Prometheus metrics collection for groundsense
//!
//! Tracks:
//! - Answered queries by source
//! - Generation attempts by outcome
//! - Keyword routing latency
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use serde::Serialize;
use std::sync::Arc;

/// Where an answer came from
///
/// Closed set of label values so cardinality stays fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Catalog,
    StateProfile,
    BlockReport,
    Generated,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::Catalog => "catalog",
            AnswerSource::StateProfile => "state_profile",
            AnswerSource::BlockReport => "block_report",
            AnswerSource::Generated => "generated",
        }
    }
}

/// Outcome label for one generation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptLabel {
    Success,
    ModelNotFound,
    Fatal,
}

impl AttemptLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptLabel::Success => "success",
            AttemptLabel::ModelNotFound => "model_not_found",
            AttemptLabel::Fatal => "fatal",
        }
    }
}

/// Metrics collector for groundsense
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    queries_total: IntCounterVec,
    generation_attempts: IntCounterVec,
    routing_duration: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance registered with a fresh registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let queries_total = IntCounterVec::new(
            Opts::new(
                "groundsense_queries_total",
                "Total number of answered queries by answer source",
            ),
            &["source"],
        )?;

        // Cardinality: one series per candidate outcome, not per model
        let generation_attempts = IntCounterVec::new(
            Opts::new(
                "groundsense_generation_attempts_total",
                "Total number of generative model attempts by outcome",
            ),
            &["outcome"],
        )?;

        let routing_duration = HistogramVec::new(
            HistogramOpts::new(
                "groundsense_routing_duration_ms",
                "Keyword routing latency in milliseconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
            &["router"],
        )?;

        registry.register(Box::new(queries_total.clone()))?;
        registry.register(Box::new(generation_attempts.clone()))?;
        registry.register(Box::new(routing_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            queries_total,
            generation_attempts,
            routing_duration,
        })
    }

    pub fn record_query(&self, source: AnswerSource) {
        self.queries_total
            .with_label_values(&[source.as_str()])
            .inc();
    }

    pub fn record_generation_attempt(&self, outcome: AttemptLabel) {
        self.generation_attempts
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Record keyword routing latency for the named router
    ///
    /// # Errors
    ///
    /// NaN, infinite or negative durations are rejected; they would corrupt
    /// every percentile of the histogram.
    pub fn record_routing_duration(
        &self,
        router: &'static str,
        duration_ms: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "routing duration must be finite and non-negative, got: {}",
                duration_ms
            )));
        }

        self.routing_duration
            .get_metric_with_label_values(&[router])?
            .observe(duration_ms);
        Ok(())
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    metric_family_count = metric_families.len(),
                    "Prometheus text encoder failed"
                );
                e
            })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new_creates_registry() {
        let metrics = Metrics::new().expect("Failed to create metrics");

        metrics.record_query(AnswerSource::Catalog);
        metrics.record_generation_attempt(AttemptLabel::ModelNotFound);
        metrics
            .record_routing_duration("groundwater", 0.2)
            .expect("valid duration");

        let names: Vec<String> = metrics
            .registry
            .gather()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"groundsense_queries_total".to_string()));
        assert!(names.contains(&"groundsense_generation_attempts_total".to_string()));
        assert!(names.contains(&"groundsense_routing_duration_ms".to_string()));
    }

    #[test]
    fn test_gather_renders_labels() {
        let metrics = Metrics::new().unwrap();
        metrics.record_query(AnswerSource::Generated);
        metrics.record_query(AnswerSource::Generated);
        metrics.record_generation_attempt(AttemptLabel::Success);

        let output = metrics.gather().unwrap();
        assert!(output.contains(r#"groundsense_queries_total{source="generated"} 2"#));
        assert!(output.contains(r#"groundsense_generation_attempts_total{outcome="success"} 1"#));
    }

    #[test]
    fn test_routing_duration_rejects_invalid_values() {
        let metrics = Metrics::new().unwrap();
        assert!(metrics.record_routing_duration("groundwater", f64::NAN).is_err());
        assert!(
            metrics
                .record_routing_duration("groundwater", f64::INFINITY)
                .is_err()
        );
        assert!(metrics.record_routing_duration("groundwater", -1.0).is_err());
        assert!(metrics.record_routing_duration("groundwater", 0.0).is_ok());
    }

    #[test]
    fn test_answer_source_labels_match_serialized_names() {
        for source in [
            AnswerSource::Catalog,
            AnswerSource::StateProfile,
            AnswerSource::BlockReport,
            AnswerSource::Generated,
        ] {
            assert_eq!(
                serde_json::to_value(source).unwrap(),
                serde_json::Value::from(source.as_str())
            );
        }
    }
}
