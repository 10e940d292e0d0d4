use std::env;
use std::path::PathBuf;

use chrono_tz::Tz;

use super::store::PersistedConfig;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Process settings read once from the environment at startup.
///
/// The credentials are required; everything else falls back to a default.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub slack_bot_token: String,
    pub slack_signing_secret: String,
    pub openai_api_key: String,
    pub openai_org_id: Option<String>,
    pub openai_model: Option<String>,
    /// Seed for the destination channel when no config file exists yet.
    pub default_summary_channel_id: Option<String>,
    /// Seed for the monitored channels when no config file exists yet.
    pub default_monitored_channel_ids: Vec<String>,
    pub config_path: PathBuf,
    pub port: u16,
    pub timezone: Tz,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns the name of the first missing required variable, or a message
    /// describing a malformed optional one.
    pub fn from_env() -> Result<Self, String> {
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| format!("PORT: {}", e))?,
            Err(_) => DEFAULT_PORT,
        };

        let timezone = match env::var("DIGEST_TIMEZONE") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse::<Tz>()
                .map_err(|e| format!("DIGEST_TIMEZONE: {}", e))?,
            _ => Tz::UTC,
        };

        Ok(Self {
            slack_bot_token: required("SLACK_BOT_TOKEN")?,
            slack_signing_secret: required("SLACK_SIGNING_SECRET")?,
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_org_id: optional("OPENAI_ORG_ID"),
            openai_model: optional("OPENAI_MODEL"),
            default_summary_channel_id: optional("SUMMARY_CHANNEL_ID"),
            default_monitored_channel_ids: env::var("MONITORED_CHANNEL_IDS")
                .map(|raw| parse_channel_list(&raw))
                .unwrap_or_default(),
            config_path: optional("CONFIG_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from),
            port,
            timezone,
        })
    }

    /// Seed config used when the config file is missing or unreadable.
    #[must_use]
    pub fn default_persisted(&self) -> PersistedConfig {
        PersistedConfig {
            summary_channel_id: self.default_summary_channel_id.clone(),
            monitored_channel_ids: self.default_monitored_channel_ids.clone(),
            last_summary_time: None,
        }
    }

    #[must_use]
    pub fn model(&self) -> String {
        self.openai_model
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string())
    }
}

fn required(name: &str) -> Result<String, String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        Ok(_) => Err(format!("{}: value is empty", name)),
        Err(e) => Err(format!("{}: {}", name, e)),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Split a comma-separated channel list, dropping blanks and repeats.
#[must_use]
pub fn parse_channel_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !out.iter().any(|existing| existing == id) {
            out.push(id.to_string());
        }
    }
    out
}
