//! Slack API client module
//!
//! Wraps the handful of Slack Web API calls the bot needs, with retry logic
//! and error mapping into [`BotError`].

use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};
use slack_morphism::hyper_tokio::{
    SlackClientHyperConnector, SlackClientHyperHttpsConnector, SlackHyperClient,
};
use slack_morphism::prelude::{
    SlackApiConversationsHistoryRequest, SlackApiConversationsInfoRequest,
    SlackApiUsersInfoRequest,
};
use slack_morphism::{
    SlackApiToken, SlackApiTokenValue, SlackChannelId, SlackChannelInfo, SlackClientSession,
    SlackHistoryMessage, SlackTs, SlackUser, SlackUserId,
};
use tokio_retry::strategy::jitter;
use tokio_retry::{RetryIf, strategy::ExponentialBackoff};
use tracing::warn;

use crate::errors::BotError;

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Retries after the first attempt.
const RETRY_ATTEMPTS: usize = 4;
const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);

// Build the Slack client connector without panicking; call sites surface
// a BotError when it is missing.
static SLACK_CLIENT: std::sync::LazyLock<Option<SlackHyperClient>> =
    std::sync::LazyLock::new(|| match SlackClientHyperConnector::new() {
        Ok(connector) => Some(SlackHyperClient::new(connector)),
        Err(e) => {
            warn!("Failed to create Slack HTTP connector: {}", e);
            None
        }
    });

static HTTP_CLIENT: std::sync::LazyLock<Client> = std::sync::LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// Delays between attempts before jitter: 100ms, 200ms, 400ms, 800ms.
fn backoff_delays() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2)
        .factor(50)
        .max_delay(RETRY_MAX_DELAY)
        .take(RETRY_ATTEMPTS)
}

/// Fields of `conversations.info` the bot cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationInfo {
    pub id: String,
    pub name: String,
    pub is_archived: bool,
}

/// Fields of `users.info` the bot cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub is_admin: bool,
    pub is_owner: bool,
}

impl UserInfo {
    #[must_use]
    pub fn can_configure(&self) -> bool {
        self.is_admin || self.is_owner
    }
}

/// Slack API client with retry logic and error handling
pub struct SlackClient {
    token: SlackApiToken,
    api_base: String,
}

impl SlackClient {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token: SlackApiToken::new(SlackApiTokenValue::new(token)),
            api_base: SLACK_API_BASE.to_string(),
        }
    }

    /// Send raw Web API calls to another host.
    #[cfg(test)]
    fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Run `operation`, retrying only transient failures with a short
    /// bounded backoff. Slack `ok: false` replies come back immediately.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T, BotError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, BotError>> + Send,
        T: Send,
    {
        let strategy = backoff_delays().map(jitter);

        RetryIf::spawn(strategy, operation, |e: &BotError| {
            let retry = e.is_transient();
            if retry {
                warn!("Retrying Slack call after transient error: {}", e);
            }
            retry
        })
        .await
    }

    fn session(&self) -> Result<SlackClientSession<'_, SlackClientHyperHttpsConnector>, BotError> {
        Ok(SLACK_CLIENT
            .as_ref()
            .ok_or_else(|| {
                BotError::GeneralError("Slack HTTP connector not initialized".to_string())
            })?
            .open_session(&self.token))
    }

    /// POST a JSON payload to a Web API method and return the body once
    /// Slack reports `ok: true`.
    async fn call_api(&self, method: &str, payload: &Value) -> Result<Value, BotError> {
        let resp = HTTP_CLIENT
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.token.token_value.0)
            .json(payload)
            .send()
            .await
            .map_err(|e| BotError::HttpError(format!("{method} request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(BotError::ApiError(format!("{method} HTTP {}", resp.status())));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| BotError::ParseError(format!("{method} JSON parse error: {e}")))?;

        ensure_ok(method, body)
    }

    /// # Errors
    ///
    /// Returns an error if the channel does not exist or the request fails.
    pub async fn get_conversation_info(
        &self,
        channel_id: &str,
    ) -> Result<ConversationInfo, BotError> {
        let request = SlackApiConversationsInfoRequest::new(SlackChannelId(channel_id.to_string()));
        self.with_retry(|| async {
            let result = self.session()?.conversations_info(&request).await?;
            Ok(conversation_info_from(&result.channel))
        })
        .await
    }

    /// One page of history, newest first, strictly older than `latest` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the Slack API call fails.
    pub async fn get_history_page(
        &self,
        channel_id: &str,
        latest: Option<&str>,
        limit: u16,
    ) -> Result<Vec<SlackHistoryMessage>, BotError> {
        self.with_retry(|| async {
            let session = self.session()?;

            let mut request = SlackApiConversationsHistoryRequest::new()
                .with_channel(SlackChannelId(channel_id.to_string()))
                .with_limit(limit);
            if let Some(ts) = latest {
                request = request.with_latest(SlackTs(ts.to_string()));
            }

            let result = session.conversations_history(&request).await?;
            Ok(result.messages)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the user lookup fails.
    pub async fn get_user_info(&self, user_id: &str) -> Result<UserInfo, BotError> {
        let request = SlackApiUsersInfoRequest::new(SlackUserId(user_id.to_string()));
        self.with_retry(|| async {
            let result = self.session()?.users_info(&request).await?;
            Ok(user_info_from(&result.user))
        })
        .await
    }

    /// Best display name for a user, falling back to the raw ID.
    pub async fn get_user_name(&self, user_id: &str) -> String {
        match self.get_user_info(user_id).await {
            Ok(info) => info.name,
            Err(e) => {
                warn!("Failed to fetch user info for {}: {}", user_id, e);
                user_id.to_string()
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the Slack API request fails.
    pub async fn post_message_with_blocks(
        &self,
        channel_id: &str,
        text_fallback: &str,
        blocks: &Value,
    ) -> Result<(), BotError> {
        let payload = json!({
            "channel": channel_id,
            "text": text_fallback,
            "blocks": blocks,
        });

        // Not retried: a lost response after Slack accepted the post would
        // publish the digest twice.
        self.call_api("chat.postMessage", &payload).await?;
        Ok(())
    }
}

fn ensure_ok(method: &str, body: Value) -> Result<Value, BotError> {
    if body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        Ok(body)
    } else {
        Err(BotError::ApiError(format!(
            "{method} error: {}",
            body.get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
        )))
    }
}

fn conversation_info_from(channel: &SlackChannelInfo) -> ConversationInfo {
    ConversationInfo {
        id: channel.id.0.clone(),
        name: channel.name.clone().unwrap_or_else(|| channel.id.0.clone()),
        is_archived: channel.flags.is_archived.unwrap_or(false),
    }
}

fn user_info_from(user: &SlackUser) -> UserInfo {
    let non_empty = |v: Option<&String>| v.filter(|s| !s.is_empty()).cloned();

    let profile = user.profile.as_ref();
    let name = non_empty(profile.and_then(|p| p.display_name.as_ref()))
        .or_else(|| non_empty(user.real_name.as_ref()))
        .or_else(|| non_empty(profile.and_then(|p| p.real_name.as_ref())))
        .or_else(|| non_empty(user.name.as_ref()))
        .unwrap_or_else(|| user.id.0.clone());

    UserInfo {
        id: user.id.0.clone(),
        name,
        is_admin: user.flags.is_admin.unwrap_or(false),
        is_owner: user.flags.is_owner.unwrap_or(false),
    }
}
