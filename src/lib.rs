/// TLDR Digest - a Slack bot that posts hourly AI summaries of monitored channels.
///
/// A single long-running process:
/// 1. An hourly scheduler runs the digest pipeline and posts one Block Kit
///    message to the summary channel
/// 2. An axum server answers `/tldr` slash commands (`now`, `help`, `config`)
///    and a liveness probe
///
/// # Architecture
///
/// - slack-morphism and the Slack Web API for channel history and posting
/// - `OpenAI` chat completions for per-channel summaries
/// - a JSON config file for the monitored channels and the last run time
/// - Tokio for the async runtime
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tldr_digest::ai::LlmClient;
/// use tldr_digest::core::config::AppConfig;
/// use tldr_digest::core::store::{ConfigStore, PersistedConfig};
/// use tldr_digest::slack::{SlackClient, SlackPlatform};
/// use tldr_digest::worker::{DigestBuilder, DigestRunner, Trigger};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     tldr_digest::setup_logging();
///     let config = AppConfig::from_env()?;
///
///     let store = Arc::new(ConfigStore::load(config.config_path.clone(), PersistedConfig::default()).await);
///     let platform = Arc::new(SlackPlatform::new(SlackClient::new(config.slack_bot_token.clone())));
///     let summarizer = Arc::new(LlmClient::new(
///         config.openai_api_key.clone(),
///         config.openai_org_id.clone(),
///         config.model(),
///     )?);
///
///     let builder = DigestBuilder::new(platform, summarizer, store.clone(), config.timezone);
///     let runner = DigestRunner::new(builder, store);
///     println!("{:?}", runner.run(Trigger::Manual).await?);
///     Ok(())
/// }
/// ```
// Module declarations
pub mod ai;
pub mod api;
pub mod core;
pub mod errors;
pub mod slack;
pub mod worker;

pub use errors::BotError;

/// Install the global tracing subscriber.
///
/// The filter comes from `LOG_LEVEL` (an `EnvFilter` directive, default
/// `info`). Output is JSON unless `LOG_FORMAT=pretty`. Calling this more than
/// once is harmless; later calls keep the first subscriber.
///
/// # Example
///
/// ```
/// tldr_digest::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let directive = std::env::var("LOG_LEVEL")
        .ok()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let pretty = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("pretty"));

    let result = if pretty {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
