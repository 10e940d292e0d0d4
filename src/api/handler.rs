//! HTTP router: liveness plus the Slack slash-command endpoint.
//!
//! Slack-signed routes are verified before any parsing happens.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tracing::{error, info};

use super::{helpers, signature, slash_handler};
use crate::core::platform::ChatPlatform;
use crate::core::store::ConfigStore;
use crate::worker::DigestRunner;

pub const LIVENESS_TEXT: &str = "TLDR Bot is running!";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub runner: Arc<DigestRunner>,
    pub platform: Arc<dyn ChatPlatform>,
    pub signing_secret: Arc<str>,
    /// Used for `response_url` replies.
    pub http: reqwest::Client,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/slack/commands", post(slack_commands))
        .with_state(state)
}

async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

#[tracing::instrument(level = "info", skip_all)]
async fn slack_commands(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    if let Err(response) = verify_signature(&body, &headers, &state.signing_secret) {
        return response;
    }
    info!("Slack signature verified successfully");

    match slash_handler::handle_slash_command(&state, &body).await {
        Ok(reply) => helpers::ok_ephemeral(&reply),
        Err(e) => {
            error!("Failed to parse Slack command: {}", e);
            helpers::err_response(StatusCode::BAD_REQUEST, &format!("Parse Error: {e}"))
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn verify_signature(body: &str, headers: &HeaderMap, signing_secret: &str) -> Result<(), Response> {
    let Some(sig) = header(headers, "x-slack-signature") else {
        error!("Missing X-Slack-Signature header");
        return Err(helpers::err_response(
            StatusCode::UNAUTHORIZED,
            "Missing X-Slack-Signature header",
        ));
    };

    let Some(timestamp) = header(headers, "x-slack-request-timestamp") else {
        error!("Missing X-Slack-Request-Timestamp header");
        return Err(helpers::err_response(
            StatusCode::UNAUTHORIZED,
            "Missing X-Slack-Request-Timestamp header",
        ));
    };

    if !signature::verify_slack_signature(body, timestamp, sig, signing_secret) {
        return Err(helpers::err_response(
            StatusCode::UNAUTHORIZED,
            "Invalid Slack signature",
        ));
    }

    Ok(())
}
