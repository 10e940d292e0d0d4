//! In-memory fakes for the platform and summarizer seams.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tokio::sync::Notify;

use tldr_digest::core::models::{ChannelHandle, Digest, HistoryPage, Message};
use tldr_digest::core::platform::{ChatPlatform, Summarizer};
use tldr_digest::core::store::{ConfigStore, PersistedConfig};
use tldr_digest::errors::BotError;
use tldr_digest::worker::{DigestBuilder, DigestRunner};

#[derive(Default)]
pub struct FakePlatform {
    channels: HashMap<String, ChannelHandle>,
    /// Newest first.
    histories: HashMap<String, Vec<Message>>,
    failing_history: HashSet<String>,
    admins: HashSet<String>,
    pub fail_post: bool,
    pub posted: Mutex<Vec<(String, Digest)>>,
    calls: AtomicUsize,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, id: &str, name: &str, messages: Vec<Message>) -> Self {
        self.channels.insert(
            id.to_string(),
            ChannelHandle {
                id: id.to_string(),
                name: name.to_string(),
                is_text: true,
            },
        );
        let mut messages = messages;
        messages.sort_by_key(|m| std::cmp::Reverse(m.authored_at));
        self.histories.insert(id.to_string(), messages);
        self
    }

    pub fn with_non_text_channel(mut self, id: &str, name: &str) -> Self {
        self.channels.insert(
            id.to_string(),
            ChannelHandle {
                id: id.to_string(),
                name: name.to_string(),
                is_text: false,
            },
        );
        self
    }

    pub fn with_failing_history(mut self, id: &str, name: &str) -> Self {
        self = self.with_channel(id, name, Vec::new());
        self.failing_history.insert(id.to_string());
        self
    }

    pub fn with_admin(mut self, user_id: &str) -> Self {
        self.admins.insert(user_id.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn posted(&self) -> Vec<(String, Digest)> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn resolve_channel(&self, channel_id: &str) -> Result<ChannelHandle, BotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| BotError::ApiError(format!("conversations.info error: channel_not_found ({channel_id})")))
    }

    async fn fetch_history_page(
        &self,
        channel: &ChannelHandle,
        before: Option<&str>,
        limit: u16,
    ) -> Result<HistoryPage, BotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_history.contains(&channel.id) {
            return Err(BotError::ApiError("conversations.history error: ratelimited".to_string()));
        }
        let history = self.histories.get(&channel.id).cloned().unwrap_or_default();
        let start = before.map_or(0, |c| c.parse::<usize>().unwrap());
        let end = (start + usize::from(limit)).min(history.len());
        Ok(HistoryPage {
            messages: history[start.min(end)..end].to_vec(),
            next_cursor: (end < history.len()).then(|| end.to_string()),
        })
    }

    async fn post_digest(&self, channel: &ChannelHandle, digest: &Digest) -> Result<(), BotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_post {
            return Err(BotError::ApiError("chat.postMessage error: not_in_channel".to_string()));
        }
        self.posted
            .lock()
            .unwrap()
            .push((channel.id.clone(), digest.clone()));
        Ok(())
    }

    async fn is_admin(&self, user_id: &str) -> Result<bool, BotError> {
        Ok(self.admins.contains(user_id))
    }
}

/// Echoes a canned summary per label; labels in `failing` return an error.
#[derive(Default)]
pub struct FakeSummarizer {
    failing: HashSet<String>,
    pub calls: Mutex<Vec<(String, String)>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl FakeSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, label: &str) -> Self {
        self.failing.insert(label.to_string());
        self
    }

    /// Block every call until `release` is notified; `entered` fires on entry.
    pub fn gated(mut self, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.gate = Some((entered, release));
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, transcript: &str, context_label: &str) -> Result<String, BotError> {
        self.calls
            .lock()
            .unwrap()
            .push((transcript.to_string(), context_label.to_string()));
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if self.failing.contains(context_label) {
            return Err(BotError::OpenAIError("OpenAI API error (status 500)".to_string()));
        }
        Ok(format!("summary of {context_label}"))
    }
}

pub fn human(minutes_ago: i64, body: &str) -> Message {
    message_at(Utc::now() - Duration::minutes(minutes_ago), "jane", false, body)
}

pub fn bot(minutes_ago: i64, body: &str) -> Message {
    message_at(Utc::now() - Duration::minutes(minutes_ago), "helperbot", true, body)
}

pub fn message_at(at: DateTime<Utc>, author: &str, automated: bool, body: &str) -> Message {
    Message {
        authored_at: at,
        author_name: author.to_string(),
        author_is_automated: automated,
        body: body.to_string(),
    }
}

pub fn config_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("config.json")
}

pub async fn store_with(dir: &tempfile::TempDir, config: PersistedConfig) -> Arc<ConfigStore> {
    Arc::new(ConfigStore::load(config_path(dir), config).await)
}

pub fn runner(
    platform: Arc<FakePlatform>,
    summarizer: Arc<FakeSummarizer>,
    store: Arc<ConfigStore>,
) -> DigestRunner {
    let builder = DigestBuilder::new(platform, summarizer, store.clone(), Tz::UTC);
    DigestRunner::new(builder, store)
}

pub fn configured(summary: &str, monitored: &[&str]) -> PersistedConfig {
    PersistedConfig {
        summary_channel_id: Some(summary.to_string()),
        monitored_channel_ids: monitored.iter().map(ToString::to_string).collect(),
        last_summary_time: None,
    }
}
