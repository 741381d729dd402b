//! Command-line interface for groundsense
//!
//! Provides argument parsing and subcommand handling for the groundsense binary.

use clap::{Parser, Subcommand};

/// Groundwater question answering service
#[derive(Parser)]
#[command(name = "groundsense")]
#[command(version)]
#[command(about = "Groundwater assistant: canned analyses with a generative fallback")]
#[command(
    long_about = "groundsense answers groundwater questions from a catalog of pre-authored \
    analyses when a keyword rule matches, and otherwise asks a Gemini model, falling back \
    across model names when one is unavailable."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show which answer path a question takes, without starting the server
    Route {
        /// Question text
        query: String,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# groundsense configuration
# =========================

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"
port = 3000

# Body limit for POST /analyze; base64 adds about a third to the image size
max_upload_bytes = 20971520

# ─────────────────────────────────────────────────────────────────────────────
# GENERATIVE MODEL
# ─────────────────────────────────────────────────────────────────────────────
#
# Questions no catalog rule matches are sent to Gemini. Without an API key the
# service still runs and answers catalog questions only.

[gemini]
# Inline key (prefer the environment variable below)
# api_key = "..."

# Environment variable read when api_key is not set
api_key_env = "GEMINI_API_KEY"

base_url = "https://generativelanguage.googleapis.com/v1beta"

# Tried first. On "model not found" the fallbacks are tried in order; any
# other error is returned immediately.
primary_model = "gemini-1.5-flash-latest"
fallback_models = ["gemini-1.5-flash", "gemini-1.5-pro-latest", "gemini-1.5-pro", "gemini-pro"]

# "per_call": every request starts with the full candidate list
# "client": a model attempted once is never sent again by this process
attempted_scope = "per_call"

# Per attempt, 1-300
request_timeout_seconds = 30

temperature = 0.7
top_k = 40
top_p = 0.95
max_output_tokens = 1024

# ─────────────────────────────────────────────────────────────────────────────
# RESPONSE CATALOG
# ─────────────────────────────────────────────────────────────────────────────

[catalog]
# JSON array of entries; the built-in catalog is used when unset
# path = "data/catalog.json"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# trace, debug, info, warn, error (RUST_LOG overrides)
log_level = "info"
"#
}
