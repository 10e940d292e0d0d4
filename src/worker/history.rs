//! Backward pagination over a channel's history.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::models::{ChannelHandle, Message};
use crate::core::platform::ChatPlatform;
use crate::errors::BotError;

/// Platform-imposed maximum page size.
pub const PAGE_LIMIT: u16 = 100;

/// Collect every human-authored message in `channel` posted strictly after
/// `start_time`, oldest first.
///
/// Paging stops on an empty page, on a short page, once a page reaches back
/// past `start_time`, or when the platform reports no older cursor.
///
/// # Errors
///
/// Returns the first platform error encountered while paging.
pub async fn fetch_history(
    platform: &dyn ChatPlatform,
    channel: &ChannelHandle,
    start_time: DateTime<Utc>,
) -> Result<Vec<Message>, BotError> {
    if !channel.is_text {
        return Ok(Vec::new());
    }

    let mut collected: Vec<Message> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = platform
            .fetch_history_page(channel, cursor.as_deref(), PAGE_LIMIT)
            .await?;
        pages += 1;

        if page.messages.is_empty() {
            break;
        }

        let page_len = page.messages.len();
        let reached_window_start = page
            .messages
            .iter()
            .map(|m| m.authored_at)
            .min()
            .is_some_and(|oldest| oldest < start_time);

        collected.extend(
            page.messages
                .into_iter()
                .filter(|m| m.authored_at > start_time && !m.author_is_automated),
        );

        if reached_window_start || page_len < usize::from(PAGE_LIMIT) {
            break;
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    collected.sort_by_key(|m| m.authored_at);

    debug!(
        channel_id = %channel.id,
        pages,
        kept = collected.len(),
        "Fetched channel history"
    );

    Ok(collected)
}
