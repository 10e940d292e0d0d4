//! [`ChatPlatform`] implementation backed by the Slack Web API.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use slack_morphism::SlackHistoryMessage;
use slack_morphism::events::SlackMessageEventType;
use tracing::{debug, warn};

use super::blocks::render_digest;
use super::client::SlackClient;
use crate::core::models::{ChannelHandle, Digest, HistoryPage, Message};
use crate::core::platform::ChatPlatform;
use crate::errors::BotError;

pub struct SlackPlatform {
    client: SlackClient,
}

impl SlackPlatform {
    #[must_use]
    pub fn new(client: SlackClient) -> Self {
        Self { client }
    }

    /// Look up display names for every human author on the page, once each.
    async fn resolve_author_names(&self, raw: &[SlackHistoryMessage]) -> HashMap<String, String> {
        let mut user_ids: Vec<String> = raw
            .iter()
            .filter(|m| !is_automated(m))
            .filter_map(|m| m.sender.user.as_ref().map(|u| u.0.clone()))
            .collect();
        user_ids.sort();
        user_ids.dedup();

        let names = join_all(user_ids.iter().map(|id| self.client.get_user_name(id))).await;
        user_ids.into_iter().zip(names).collect()
    }
}

#[async_trait]
impl ChatPlatform for SlackPlatform {
    async fn resolve_channel(&self, channel_id: &str) -> Result<ChannelHandle, BotError> {
        let info = self.client.get_conversation_info(channel_id).await?;
        Ok(ChannelHandle {
            id: info.id,
            name: info.name,
            is_text: !info.is_archived,
        })
    }

    async fn fetch_history_page(
        &self,
        channel: &ChannelHandle,
        before: Option<&str>,
        limit: u16,
    ) -> Result<HistoryPage, BotError> {
        let raw = self
            .client
            .get_history_page(&channel.id, before, limit)
            .await?;
        let names = self.resolve_author_names(&raw).await;
        let page = to_history_page(raw, &names);

        debug!(
            channel_id = %channel.id,
            messages = page.messages.len(),
            "Fetched history page"
        );
        Ok(page)
    }

    async fn post_digest(&self, channel: &ChannelHandle, digest: &Digest) -> Result<(), BotError> {
        let blocks = render_digest(digest);
        self.client
            .post_message_with_blocks(&channel.id, &digest.header, &blocks)
            .await
    }

    async fn is_admin(&self, user_id: &str) -> Result<bool, BotError> {
        Ok(self.client.get_user_info(user_id).await?.can_configure())
    }
}

/// Convert a Slack `ts` such as `1717243200.000100` to a UTC timestamp.
#[must_use]
pub fn slack_ts_to_datetime(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, "0"));
    let secs: i64 = secs.parse().ok()?;
    let micros: String = frac.chars().chain(std::iter::repeat('0')).take(6).collect();
    let micros: u32 = micros.parse().ok()?;
    DateTime::from_timestamp(secs, micros * 1000)
}

fn is_system_message(msg: &SlackHistoryMessage) -> bool {
    matches!(
        msg.subtype,
        Some(SlackMessageEventType::ChannelJoin | SlackMessageEventType::ChannelLeave)
    )
}

fn is_automated(msg: &SlackHistoryMessage) -> bool {
    msg.sender.bot_id.is_some()
        || msg.sender.user.is_none()
        || matches!(msg.subtype, Some(SlackMessageEventType::BotMessage))
        || is_system_message(msg)
}

/// Map a raw newest-first Slack page into the platform-neutral page.
/// Messages with an unreadable `ts` are dropped.
fn to_history_page(raw: Vec<SlackHistoryMessage>, names: &HashMap<String, String>) -> HistoryPage {
    let next_cursor = raw.last().map(|m| m.origin.ts.0.clone());

    let messages = raw
        .into_iter()
        .filter_map(|msg| {
            let Some(authored_at) = slack_ts_to_datetime(&msg.origin.ts.0) else {
                warn!(ts = %msg.origin.ts.0, "Skipping message with unparseable timestamp");
                return None;
            };
            let automated = is_automated(&msg);
            let author_name = msg
                .sender
                .user
                .as_ref()
                .map_or_else(
                    || "unknown".to_string(),
                    |u| names.get(&u.0).cloned().unwrap_or_else(|| u.0.clone()),
                );

            Some(Message {
                authored_at,
                author_name,
                author_is_automated: automated,
                body: msg.content.text.unwrap_or_default(),
            })
        })
        .collect();

    HistoryPage {
        messages,
        next_cursor,
    }
}
