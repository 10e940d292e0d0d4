//! Response builders and outbound replies shared by the HTTP handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::errors::BotError;
use crate::slack::blocks::create_ephemeral_payload;

/// 200 with an ephemeral Slack message.
#[must_use]
pub fn ok_ephemeral(text: &str) -> Response {
    (StatusCode::OK, Json(create_ephemeral_payload(text))).into_response()
}

/// Error status with a JSON `{ "error": message }` body.
#[must_use]
pub fn err_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Deliver a delayed reply through a slash command's `response_url`.
///
/// # Errors
///
/// Returns an error if the request fails or Slack rejects it.
pub async fn post_to_response_url(
    http: &Client,
    response_url: &str,
    payload: &Value,
) -> Result<(), BotError> {
    let resp = http
        .post(response_url)
        .json(payload)
        .send()
        .await
        .map_err(|e| BotError::HttpError(format!("response_url request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(BotError::ApiError(format!(
            "response_url HTTP {}",
            resp.status()
        )));
    }
    Ok(())
}

/// Fire-and-forget variant that only logs failures.
pub async fn reply_later(http: &Client, response_url: &str, text: &str) {
    if response_url.is_empty() {
        warn!("No response_url on command, dropping reply: {}", text);
        return;
    }
    if let Err(e) = post_to_response_url(http, response_url, &create_ephemeral_payload(text)).await {
        error!("Failed to send delayed slash command reply: {}", e);
    }
}
