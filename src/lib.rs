//! groundsense - groundwater question answering service
//!
//! Answers questions about India's groundwater from a catalog of pre-authored
//! analyses selected by keyword rules, and falls back to a Gemini model for
//! everything else. The generative client walks a list of model names and
//! only moves on when upstream reports the model does not exist.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod detection;
pub mod error;
pub mod gemini;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod states;
pub mod telemetry;
