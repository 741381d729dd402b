//! groundsense HTTP server
//!
//! Starts an Axum web server answering groundwater questions from static
//! reference data or a Gemini model.

use clap::Parser;
use groundsense::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    detection::detect_state,
    handlers::{self, AppState},
    router::QueryRouter,
    states::StateAtlas,
    telemetry,
};
use std::net::{IpAddr, SocketAddr};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Config { output }) => {
            let template = generate_config_template();
            match output {
                Some(path) => {
                    std::fs::write(&path, template)?;
                    eprintln!("Wrote configuration template to {}", path);
                }
                None => print!("{}", template),
            }
            Ok(())
        }
        Some(Command::Route { query }) => {
            let atlas = StateAtlas::builtin()?;
            if let Some(profile) = atlas.deep_dive(&query) {
                println!("deep dive: {}", profile.key());
            } else if QueryRouter::map_analysis()?.route(&query).is_some() {
                println!("map analysis (generative answer)");
            } else if let Some(id) = QueryRouter::groundwater()?.route(&query) {
                println!("catalog: {}", id);
            } else if let Some(block) = atlas.find_block(&query) {
                println!("block report: {}", block.key());
            } else {
                println!("no static answer (generative answer)");
            }
            if let Some(key) = detect_state(&query).key {
                println!("state: {}", key);
            }
            Ok(())
        }
        None => serve(&cli.config).await,
    }
}

async fn serve(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_file(config_path)?;

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        "Starting groundsense server on {}:{}",
        config.server.host,
        config.server.port
    );

    let host: IpAddr = config.server.host.parse().map_err(|e| {
        format!(
            "server.host '{}' is not a valid IP address: {}",
            config.server.host, e
        )
    })?;
    let addr = SocketAddr::from((host, config.server.port));

    let state = AppState::new(config)?;
    let app = handlers::app(state);

    tracing::info!("Listening on {}", addr);
    tracing::info!("Health check available at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
