use chrono::{DateTime, Utc};

/// A single chat message as seen by the digest pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub authored_at: DateTime<Utc>,
    pub author_name: String,
    pub author_is_automated: bool,
    pub body: String,
}

/// One page of channel history, newest message first.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub messages: Vec<Message>,
    /// Cursor for the next (older) page; `None` when the platform reports nothing older.
    pub next_cursor: Option<String>,
}

/// A resolved channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub id: String,
    pub name: String,
    /// Whether the channel can carry text messages we are able to read and post.
    pub is_text: bool,
}

#[derive(Debug, Clone)]
pub struct ChannelDigestInput {
    pub channel_id: String,
    pub channel_name: String,
    /// Oldest first.
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub channel_name: String,
    pub summary: String,
    pub message_count: usize,
}

/// Platform-neutral presentation block; the posting adapter renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestBlock {
    pub title: String,
    pub body: String,
    pub footer: String,
}

/// The single outbound message produced by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub header: String,
    pub blocks: Vec<DigestBlock>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotConfigured {
    NoSummaryChannel,
    NoMonitoredChannels,
}

impl NotConfigured {
    /// Operator-facing explanation, shared by the scheduler log and the `now` reply.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            NotConfigured::NoSummaryChannel => {
                "No summary channel configured. Use `/tldr config set #channel` to set one."
            }
            NotConfigured::NoMonitoredChannels => {
                "No channels are being monitored. Use `/tldr config add #channel` to add channels."
            }
        }
    }
}

/// Result of one digest run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    Posted {
        channels: usize,
        total_messages: usize,
        /// Upper bound of the collected window.
        window_end: DateTime<Utc>,
    },
    /// No eligible messages in the window; nothing was posted.
    Quiet { window_end: DateTime<Utc> },
    NotConfigured(NotConfigured),
    /// Another run held the run guard.
    Busy,
}

impl DigestOutcome {
    /// The instant `lastSummaryTime` should advance to, for runs that count
    /// as a success. Messages after it belong to the next window.
    #[must_use]
    pub fn window_end(&self) -> Option<DateTime<Utc>> {
        match self {
            DigestOutcome::Posted { window_end, .. } | DigestOutcome::Quiet { window_end } => {
                Some(*window_end)
            }
            DigestOutcome::NotConfigured(_) | DigestOutcome::Busy => None,
        }
    }
}
