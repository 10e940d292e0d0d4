use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};

use tldr_digest::ai::LlmClient;
use tldr_digest::api::{AppState, create_router};
use tldr_digest::core::config::AppConfig;
use tldr_digest::core::store::ConfigStore;
use tldr_digest::slack::{SlackClient, SlackPlatform};
use tldr_digest::worker::{DigestBuilder, DigestRunner, Scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tldr_digest::setup_logging();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Missing required configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        model = %config.model(),
        timezone = %config.timezone,
        config_path = %config.config_path.display(),
        "Starting TLDR Digest"
    );

    let store = Arc::new(ConfigStore::load(config.config_path.clone(), config.default_persisted()).await);
    let platform = Arc::new(SlackPlatform::new(SlackClient::new(
        config.slack_bot_token.clone(),
    )));
    let summarizer = Arc::new(LlmClient::new(
        config.openai_api_key.clone(),
        config.openai_org_id.clone(),
        config.model(),
    )?);

    let builder = DigestBuilder::new(
        platform.clone(),
        summarizer,
        store.clone(),
        config.timezone,
    );
    let runner = Arc::new(DigestRunner::new(builder, store.clone()));
    let scheduler = Scheduler::start(runner.clone());

    let state = AppState {
        store,
        runner,
        platform,
        signing_secret: Arc::from(config.slack_signing_secret.as_str()),
        http: reqwest::Client::new(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP server on {addr}"))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    scheduler.stop();
    scheduler.join().await;
    info!("TLDR Digest stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
