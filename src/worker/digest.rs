//! One digest run: read config, gather history, summarize, post.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{error, info, warn};

use super::history::fetch_history;
use crate::ai::prompt_builder::format_transcript;
use crate::core::models::{
    ChannelDigestInput, ChannelSummary, Digest, DigestBlock, DigestOutcome, NotConfigured,
};
use crate::core::platform::{ChatPlatform, Summarizer};
use crate::core::store::{ConfigStore, PersistedConfig};
use crate::errors::BotError;

/// Window length used when no digest has ever succeeded.
pub const DEFAULT_WINDOW_HOURS: i64 = 1;

pub struct DigestBuilder {
    platform: Arc<dyn ChatPlatform>,
    summarizer: Arc<dyn Summarizer>,
    store: Arc<ConfigStore>,
    timezone: Tz,
}

impl DigestBuilder {
    #[must_use]
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        summarizer: Arc<dyn Summarizer>,
        store: Arc<ConfigStore>,
        timezone: Tz,
    ) -> Self {
        Self {
            platform,
            summarizer,
            store,
            timezone,
        }
    }

    /// Execute one run. Never writes config; the trigger records success.
    ///
    /// # Errors
    ///
    /// Returns an error when the destination channel cannot be resolved, the
    /// digest cannot be posted, or every summarization call failed.
    pub async fn run(&self) -> Result<DigestOutcome, BotError> {
        let config = self.store.get().await;
        let (summary_channel_id, monitored) = match check_preconditions(&config) {
            Ok(parts) => parts,
            Err(reason) => {
                warn!("{} Skipping summary.", reason.user_message());
                return Ok(DigestOutcome::NotConfigured(reason));
            }
        };

        let destination = self
            .platform
            .resolve_channel(summary_channel_id)
            .await
            .map_err(|e| {
                error!(channel_id = %summary_channel_id, "Summary channel not found: {}", e);
                e
            })?;

        let now = Utc::now();
        let start_time = window_start(config.last_summary_time, now);
        info!(%start_time, channels = monitored.len(), "Collecting messages for summary");

        let (inputs, total_messages) = self.collect(monitored, start_time).await;

        if total_messages == 0 {
            info!("No new messages found in monitored channels. Skipping summary.");
            return Ok(DigestOutcome::Quiet { window_end: now });
        }

        let summaries = self.summarize_all(&inputs).await;
        if summaries.is_empty() {
            warn!("No summaries were generated");
            return Err(BotError::GeneralError(
                "no summaries were generated".to_string(),
            ));
        }

        let digest = compose_digest(&summaries, Utc::now(), self.timezone);
        self.platform.post_digest(&destination, &digest).await?;

        info!(
            channel_id = %destination.id,
            channels = summaries.len(),
            total_messages,
            "Summary posted to summary channel"
        );

        Ok(DigestOutcome::Posted {
            channels: summaries.len(),
            total_messages,
            window_end: now,
        })
    }

    async fn collect(
        &self,
        monitored: &[String],
        start_time: DateTime<Utc>,
    ) -> (Vec<ChannelDigestInput>, usize) {
        let mut inputs = Vec::new();
        let mut total = 0usize;

        for channel_id in monitored {
            let channel = match self.platform.resolve_channel(channel_id).await {
                Ok(channel) if channel.is_text => channel,
                Ok(_) => {
                    warn!(%channel_id, "Monitored channel is not a text channel, skipping");
                    continue;
                }
                Err(e) => {
                    error!(%channel_id, "Error resolving monitored channel: {}", e);
                    continue;
                }
            };

            match fetch_history(self.platform.as_ref(), &channel, start_time).await {
                Ok(messages) if !messages.is_empty() => {
                    total += messages.len();
                    inputs.push(ChannelDigestInput {
                        channel_id: channel.id,
                        channel_name: channel.name,
                        messages,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    error!(%channel_id, "Error fetching messages from channel: {}", e);
                }
            }
        }

        (inputs, total)
    }

    async fn summarize_all(&self, inputs: &[ChannelDigestInput]) -> Vec<ChannelSummary> {
        let mut summaries = Vec::with_capacity(inputs.len());
        for input in inputs {
            let transcript = format_transcript(&input.messages, self.timezone);
            match self
                .summarizer
                .summarize(&transcript, &input.channel_name)
                .await
            {
                Ok(summary) => summaries.push(ChannelSummary {
                    channel_name: input.channel_name.clone(),
                    summary,
                    message_count: input.messages.len(),
                }),
                Err(e) => {
                    warn!(
                        channel_id = %input.channel_id,
                        "Omitting channel from digest, summarization failed: {}", e
                    );
                }
            }
        }
        summaries
    }
}

/// Destination and monitored list, or the reason the run cannot start.
///
/// # Errors
///
/// Returns which precondition is unmet.
pub fn check_preconditions(
    config: &PersistedConfig,
) -> Result<(&str, &[String]), NotConfigured> {
    let Some(summary_channel_id) = config.summary_channel_id.as_deref() else {
        return Err(NotConfigured::NoSummaryChannel);
    };
    if config.monitored_channel_ids.is_empty() {
        return Err(NotConfigured::NoMonitoredChannels);
    }
    Ok((summary_channel_id, &config.monitored_channel_ids))
}

/// Start of the window: the last successful digest, else one hour ago.
#[must_use]
pub fn window_start(last_summary_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    last_summary_time.unwrap_or_else(|| now - Duration::hours(DEFAULT_WINDOW_HOURS))
}

#[must_use]
pub fn format_timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z").to_string()
}

#[must_use]
pub fn compose_digest(summaries: &[ChannelSummary], generated_at: DateTime<Utc>, tz: Tz) -> Digest {
    let stamp = format_timestamp(generated_at, tz);
    Digest {
        header: format!("TLDR Summary {stamp}"),
        blocks: summaries
            .iter()
            .map(|s| DigestBlock {
                title: format!("Summary for #{}", s.channel_name),
                body: s.summary.clone(),
                footer: format!("{} messages summarized • {}", s.message_count, stamp),
            })
            .collect(),
        generated_at,
    }
}
