//! Canned response catalog
//!
//! Pre-authored analytical answers keyed by id. The catalog is loaded once at
//! startup, either from the JSON file shipped with the crate or from a file
//! named in configuration, and is read-only afterwards.
//!
//! Content blocks (charts, tables, markdown, alerts) are opaque JSON values
//! passed through to clients unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::router::QueryRouter;

/// Catalog compiled into the binary
const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.json");

/// Errors raised while loading or validating the catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate catalog id '{0}'")]
    DuplicateId(String),

    #[error("catalog entry has an empty id")]
    EmptyId,

    #[error("routing rule targets unknown catalog id '{0}'")]
    UnknownTarget(String),
}

/// Layout tag consumed only by the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayHint {
    #[default]
    Default,
    Single,
    Grid,
    Tabs,
    Accordion,
    Comparison,
    Interactive,
    Dossier,
    StateSummary,
    List,
    Forecast,
    Correlation,
    Recommendation,
    AnomalyAlert,
}

/// One canned analytical answer
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResponseCatalogEntry {
    id: String,
    #[serde(default)]
    display_hint: DisplayHint,
    title: String,
    #[serde(default)]
    body: Vec<serde_json::Value>,
    #[serde(default)]
    summary_text: String,
}

impl ResponseCatalogEntry {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_hint(&self) -> DisplayHint {
        self.display_hint
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Ordered content blocks, never inspected by the service
    pub fn body(&self) -> &[serde_json::Value] {
        &self.body
    }

    pub fn summary_text(&self) -> &str {
        &self.summary_text
    }
}

/// Immutable id-indexed table of [`ResponseCatalogEntry`]
#[derive(Debug, Clone)]
pub struct ResponseCatalog {
    entries: Vec<ResponseCatalogEntry>,
    index: HashMap<String, usize>,
}

impl ResponseCatalog {
    /// Build a catalog, rejecting empty or duplicate ids
    pub fn new(entries: Vec<ResponseCatalogEntry>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if index.insert(entry.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateId(entry.id.clone()));
            }
        }
        Ok(Self { entries, index })
    }

    /// Parse a JSON array of entries
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<ResponseCatalogEntry> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    /// Load a JSON catalog file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| CatalogError::Read {
                path: path.as_ref().display().to_string(),
                source,
            })?;
        Self::from_json_str(&content)
    }

    /// The catalog shipped with the crate
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn get(&self, id: &str) -> Option<&ResponseCatalogEntry> {
        self.index.get(id).map(|&position| &self.entries[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Ids in file order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.id())
    }

    /// Entries in file order
    pub fn entries(&self) -> &[ResponseCatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that every target of `router` resolves to an entry
    pub fn ensure_targets_exist(&self, router: &QueryRouter) -> Result<(), CatalogError> {
        match router.target_ids().into_iter().find(|id| !self.contains(id)) {
            Some(missing) => Err(CatalogError::UnknownTarget(missing.to_string())),
            None => Ok(()),
        }
    }
}
