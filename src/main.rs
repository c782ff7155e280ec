use anyhow::{Context, Result};
use clap::Parser;
use ragchat::{api, config, logging, orchestrator::ChatbotOrchestrator};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "ragchat",
    about = "Retrieval-augmented chatbot server backed by Qdrant"
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,
    /// Port to listen on (overrides SERVER_PORT).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // `.env` must be loaded before tracing so `RUST_LOG` and `RAGCHAT_LOG_FILE` apply.
    dotenvy::dotenv().ok();
    logging::init_tracing();
    let config = config::init_config()
        .inspect_err(|error| tracing::error!(error = %error, "Invalid configuration"))
        .context("failed to load configuration")?;

    let orchestrator = ChatbotOrchestrator::new(config)
        .await
        .inspect_err(|error| tracing::error!(error = %error, "Startup failed"))
        .context("failed to initialize chatbot")?;
    let app = api::create_router(Arc::new(orchestrator), config);

    let (listener, port) = bind_listener(cli.host, cli.port.or(config.server_port))
        .await
        .context("failed to bind listener")?;
    tracing::info!("Listening on http://{}:{}", cli.host, port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn bind_listener(host: IpAddr, port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    if let Some(port) = port {
        return TcpListener::bind((host, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 8000..=8099;
    for port in PORT_RANGE {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 8000-8099",
    ))
}
