//! Parley API server binary.
//!
//! Serves the chat relay over HTTP until interrupted.

use std::time::Duration;

use clap::Parser;
use parley_core::GenerationSettings;
use parley_core::provider::openai::DEFAULT_BASE_URL;
use parley_core::relay::{
    DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT,
};
use tracing::info;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "parley_api_server", about = "Parley chat relay server", version)]
struct Args {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on (0 = ephemeral).
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Provider API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,

    /// Base URL of the Responses API.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    openai_base_url: String,

    /// Model identifier sent with every request.
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature.
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Maximum number of output tokens per reply.
    #[arg(long, default_value_t = DEFAULT_MAX_OUTPUT_TOKENS)]
    max_output_tokens: u32,

    /// Deadline for a single provider call, in seconds.
    #[arg(long, env = "OPENAI_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,parley_api=debug,parley_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let config = parley_api::config::ApiConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        openai_api_key: Some(args.openai_api_key),
        openai_base_url: args.openai_base_url,
        generation: GenerationSettings {
            model: args.model,
            temperature: args.temperature,
            max_output_tokens: args.max_output_tokens,
            timeout: Duration::from_secs(args.timeout_secs),
        },
    };

    info!(
        version = parley_core::version(),
        model = %config.generation.model,
        base_url = %config.openai_base_url,
        timeout_secs = args.timeout_secs,
        "starting parley_api_server"
    );

    let state = parley_api::AppState::from_config(config.clone())?;
    let app = parley_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
