mod config;
mod error;
mod rate_limit;
mod server;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use deck_analysis::DeckAnalyzer;
use deck_analysis::provider::{AiBackend, ProviderConfig};

use config::Config;
use server::DeckServer;

/// Build the analyzer, or `None` (logged) when the provider is misconfigured.
/// Structural checks keep working either way.
fn build_analyzer() -> Option<DeckAnalyzer<AiBackend>> {
    let provider_config = match ProviderConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "AI provider configuration invalid, analyze_deck disabled");
            return None;
        }
    };
    info!(
        provider = %provider_config.kind,
        model = %provider_config.model,
        base_url = %provider_config.base_url,
        timeout_ms = provider_config.timeout.as_millis(),
        max_retries = provider_config.max_retries,
        "AI provider configured"
    );

    match AiBackend::from_config(&provider_config) {
        Ok(backend) => Some(DeckAnalyzer::new(backend).with_timeout(provider_config.timeout)),
        Err(e) => {
            warn!(error = %e, "AI provider unavailable, analyze_deck disabled");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting deck-mcp MCP server");

    let config = Config::from_env()?;
    info!(
        max_deck_bytes = config.max_deck_bytes,
        rate_limit_per_min = ?config.rate_limit_per_min,
        "configuration loaded"
    );

    let server = DeckServer::new(build_analyzer(), config.clone());

    if let Some(addr) = config.tcp_listen_addr.as_deref() {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
