//! Persisted bot configuration.
//!
//! A single JSON document holds the destination channel, the monitored
//! channels and the time of the last successful digest. Mutations are written
//! to disk before they are committed in memory, so a `false` return means
//! neither side changed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::errors::BotError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedConfig {
    pub summary_channel_id: Option<String>,
    pub monitored_channel_ids: Vec<String>,
    pub last_summary_time: Option<DateTime<Utc>>,
}

impl PersistedConfig {
    #[must_use]
    pub fn is_monitored(&self, channel_id: &str) -> bool {
        self.monitored_channel_ids.iter().any(|id| id == channel_id)
    }
}

/// File layout where every key is optional so partial files merge over defaults.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialConfig {
    #[serde(default, deserialize_with = "present")]
    summary_channel_id: Option<Option<String>>,
    #[serde(default)]
    monitored_channel_ids: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present")]
    last_summary_time: Option<Option<DateTime<Utc>>>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent key (`None`).
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl PartialConfig {
    fn merge_over(self, defaults: &PersistedConfig) -> PersistedConfig {
        let mut monitored: Vec<String> = Vec::new();
        for id in self
            .monitored_channel_ids
            .unwrap_or_else(|| defaults.monitored_channel_ids.clone())
        {
            if !monitored.contains(&id) {
                monitored.push(id);
            }
        }

        PersistedConfig {
            summary_channel_id: self
                .summary_channel_id
                .unwrap_or_else(|| defaults.summary_channel_id.clone()),
            monitored_channel_ids: monitored,
            last_summary_time: self
                .last_summary_time
                .unwrap_or(defaults.last_summary_time),
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
    defaults: PersistedConfig,
    state: Mutex<PersistedConfig>,
}

impl ConfigStore {
    /// Load the config file, falling back to `defaults` when it is missing,
    /// unreadable or corrupt. The fallback is persisted immediately. Never fails.
    pub async fn load(path: impl Into<PathBuf>, defaults: PersistedConfig) -> Self {
        let path = path.into();
        let loaded = match read_config(&path, &defaults).await {
            Ok(Some(config)) => {
                info!(path = %path.display(), "Configuration loaded successfully");
                Some(config)
            }
            Ok(None) => {
                info!(path = %path.display(), "No configuration file found, using defaults");
                None
            }
            Err(e) => {
                error!(path = %path.display(), "Error loading configuration: {}", e);
                None
            }
        };

        let store = Self {
            path,
            state: Mutex::new(loaded.clone().unwrap_or_else(|| defaults.clone())),
            defaults,
        };

        if loaded.is_none() {
            let snapshot = store.get().await;
            if let Err(e) = write_config(&store.path, &snapshot).await {
                error!("Error saving default configuration: {}", e);
            }
        }

        store
    }

    /// Owned snapshot of the current configuration.
    pub async fn get(&self) -> PersistedConfig {
        self.state.lock().await.clone()
    }

    /// Re-read the backing file, replacing the in-memory state on success.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be parsed; the
    /// in-memory state is left untouched in that case.
    pub async fn reload(&self) -> Result<PersistedConfig, BotError> {
        let loaded = read_config(&self.path, &self.defaults)
            .await?
            .ok_or_else(|| {
                BotError::PersistenceError(format!("{} does not exist", self.path.display()))
            })?;
        let mut state = self.state.lock().await;
        *state = loaded.clone();
        Ok(loaded)
    }

    /// Idempotent: an already-monitored channel reports success without a write.
    pub async fn add_monitored(&self, channel_id: &str) -> bool {
        self.mutate(|config| {
            if config.is_monitored(channel_id) {
                return false;
            }
            config.monitored_channel_ids.push(channel_id.to_string());
            true
        })
        .await
    }

    /// Removing a channel that is not monitored is a successful no-op.
    pub async fn remove_monitored(&self, channel_id: &str) -> bool {
        self.mutate(|config| {
            config.monitored_channel_ids.retain(|id| id != channel_id);
            true
        })
        .await
    }

    pub async fn set_summary_channel(&self, channel_id: &str) -> bool {
        self.mutate(|config| {
            config.summary_channel_id = Some(channel_id.to_string());
            true
        })
        .await
    }

    pub async fn update_last_summary_time(&self, time: DateTime<Utc>) -> bool {
        self.mutate(|config| {
            config.last_summary_time = Some(time);
            true
        })
        .await
    }

    /// Apply `change` to a copy, persist it, then commit. `change` returns
    /// whether anything needs writing.
    async fn mutate<F>(&self, change: F) -> bool
    where
        F: FnOnce(&mut PersistedConfig) -> bool,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        if !change(&mut next) {
            return true;
        }

        match write_config(&self.path, &next).await {
            Ok(()) => {
                *state = next;
                info!("Configuration saved successfully");
                true
            }
            Err(e) => {
                error!("Error saving configuration: {}", e);
                false
            }
        }
    }
}

async fn read_config(
    path: &Path,
    defaults: &PersistedConfig,
) -> Result<Option<PersistedConfig>, BotError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let partial: PartialConfig = serde_json::from_str(&raw)?;
    Ok(Some(partial.merge_over(defaults)))
}

async fn write_config(path: &Path, config: &PersistedConfig) -> Result<(), BotError> {
    let body = serde_json::to_string_pretty(config)
        .map_err(|e| BotError::PersistenceError(format!("serialize: {e}")))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, body).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        warn!(path = %tmp.display(), "Rename failed, removing temp file");
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
