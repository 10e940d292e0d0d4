//! Seams between the digest pipeline and the outside world.

use async_trait::async_trait;

use super::models::{ChannelHandle, Digest, HistoryPage};
use crate::errors::BotError;

/// Chat platform operations the pipeline and command layer depend on.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the channel does not exist or cannot be looked up.
    async fn resolve_channel(&self, channel_id: &str) -> Result<ChannelHandle, BotError>;

    /// Fetch up to `limit` messages older than `before` (or the newest when `None`),
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the history request fails.
    async fn fetch_history_page(
        &self,
        channel: &ChannelHandle,
        before: Option<&str>,
        limit: u16,
    ) -> Result<HistoryPage, BotError>;

    /// # Errors
    ///
    /// Returns an error if the message could not be posted.
    async fn post_digest(&self, channel: &ChannelHandle, digest: &Digest) -> Result<(), BotError>;

    /// # Errors
    ///
    /// Returns an error if the user lookup fails.
    async fn is_admin(&self, user_id: &str) -> Result<bool, BotError>;
}

/// Single "summarize text" capability of the text-generation provider.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// # Errors
    ///
    /// Returns an error on any transport or provider failure.
    async fn summarize(&self, transcript: &str, context_label: &str) -> Result<String, BotError>;
}
