//! HTTP request handlers for the groundsense API

use crate::catalog::ResponseCatalog;
use crate::config::Config;
use crate::detection::DETECTABLE_STATES;
use crate::error::{AppError, AppResult};
use crate::gemini::ModelFallbackClient;
use crate::metrics::Metrics;
use crate::router::QueryRouter;
use crate::states::StateAtlas;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;

pub mod analyze;
pub mod catalog;
pub mod chat;
pub mod health;
pub mod metrics;
pub mod states;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers. Everything
/// except the metrics registry is read-only after construction.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    router: Arc<QueryRouter>,
    map_router: Arc<QueryRouter>,
    catalog: Arc<ResponseCatalog>,
    atlas: Arc<StateAtlas>,
    generator: Option<Arc<ModelFallbackClient>>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState from configuration
    ///
    /// Loads the catalog and state tables, builds both keyword routers and
    /// checks that every routing target exists in the catalog and every
    /// detectable state has a profile. The generative client is only
    /// built when an API key resolves; without one, questions the catalog
    /// cannot answer get a 503.
    pub fn new(config: Config) -> AppResult<Self> {
        let catalog = match &config.catalog.path {
            Some(path) => ResponseCatalog::from_file(path)?,
            None => ResponseCatalog::builtin()?,
        };

        let router = QueryRouter::groundwater()?;
        catalog.ensure_targets_exist(&router)?;
        let map_router = QueryRouter::map_analysis()?;

        let atlas = StateAtlas::builtin()?;
        atlas.ensure_profiles_for(DETECTABLE_STATES)?;

        let metrics = Arc::new(
            Metrics::new().map_err(|e| AppError::Internal(format!("metrics setup: {}", e)))?,
        );

        let generator = match config.gemini.resolve_api_key() {
            Some(api_key) => Some(Arc::new(
                ModelFallbackClient::from_config(&config.gemini, api_key)?
                    .with_metrics(metrics.clone()),
            )),
            None => {
                tracing::warn!(
                    api_key_env = %config.gemini.api_key_env(),
                    "No Gemini API key configured; only catalog answers are available"
                );
                None
            }
        };

        tracing::info!(
            catalog_entries = catalog.len(),
            routing_rules = router.len(),
            state_profiles = atlas.profiles().len(),
            block_reports = atlas.blocks().len(),
            generation_enabled = generator.is_some(),
            "Application state ready"
        );

        Ok(Self {
            config: Arc::new(config),
            router: Arc::new(router),
            map_router: Arc::new(map_router),
            catalog: Arc::new(catalog),
            atlas: Arc::new(atlas),
            generator,
            metrics,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Router for canned catalog answers
    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    /// Router recognising map analysis requests
    pub fn map_router(&self) -> &QueryRouter {
        &self.map_router
    }

    pub fn catalog(&self) -> &ResponseCatalog {
        &self.catalog
    }

    /// State profiles and block reports
    pub fn atlas(&self) -> &StateAtlas {
        &self.atlas
    }

    /// Generative client, `None` when no API key is configured
    pub fn generator(&self) -> Option<&ModelFallbackClient> {
        self.generator.as_deref()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Generative client or a 503-mapped error naming the missing key
    pub fn require_generator(&self) -> AppResult<&ModelFallbackClient> {
        self.generator().ok_or_else(|| {
            AppError::GenerationUnavailable(format!(
                "no Gemini API key configured; set gemini.api_key or the {} environment variable",
                self.config.gemini.api_key_env()
            ))
        })
    }
}

/// Build the HTTP application with all routes and middleware
pub fn app(state: AppState) -> Router {
    let upload_limit = state.config().server.max_upload_bytes;

    Router::new()
        .route("/chat", post(chat::handler))
        .route(
            "/analyze",
            post(analyze::handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/catalog", get(catalog::list_handler))
        .route("/catalog/{id}", get(catalog::get_handler))
        .route("/states", get(states::list_handler))
        .route("/states/{key}", get(states::profile_handler))
        .route("/blocks/{key}", get(states::block_handler))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .layer(middleware::from_fn(
            crate::middleware::request_id::request_id_middleware,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
