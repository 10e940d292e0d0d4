//! Slash command form parsing and `/tldr` subcommand grammar.

use std::collections::HashMap;
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::BotError;

/// The fields Slack sends with a slash command that the bot reads.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct SlackCommandEvent {
    pub team_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: String,
    pub trigger_id: String,
}

/// Decode one `application/x-www-form-urlencoded` component.
///
/// ```
/// use tldr_digest::slack::command_parser::decode_url_component;
///
/// assert_eq!(decode_url_component("hello+world%21").unwrap(), "hello world!");
/// ```
///
/// # Errors
///
/// Returns an error if the decoded bytes are not UTF-8.
pub fn decode_url_component(input: &str) -> Result<String, String> {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.to_string())
        .map_err(|e| format!("Failed to decode URL component: {}", e))
}

/// Parse the raw body of a slash command request.
///
/// # Errors
///
/// Returns a [`BotError::ParseError`] if a key or value cannot be decoded.
pub fn parse_form_data(form_data: &str) -> Result<SlackCommandEvent, BotError> {
    let mut map: HashMap<String, String> = HashMap::new();

    for pair in form_data.split('&') {
        if let Some((raw_key, raw_value)) = pair.split_once('=') {
            let key = decode_url_component(raw_key)
                .map_err(|e| BotError::ParseError(format!("Failed to decode key: {}", e)))?;
            let value = decode_url_component(raw_value)
                .map_err(|e| BotError::ParseError(format!("Failed to decode value: {}", e)))?;
            map.insert(key, value);
        }
    }

    let mut take = |key: &str| map.remove(key).unwrap_or_default();

    Ok(SlackCommandEvent {
        team_id: take("team_id"),
        channel_id: take("channel_id"),
        channel_name: take("channel_name"),
        user_id: take("user_id"),
        user_name: take("user_name"),
        command: take("command"),
        text: take("text"),
        response_url: take("response_url"),
        trigger_id: take("trigger_id"),
    })
}

static CHANNEL_MENTION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^<#([A-Z0-9]+)(?:\|[^>]*)?>$").ok());
static CHANNEL_ID_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[CG][A-Z0-9]{2,}$").ok());

/// Extract a channel ID from `<#C123|name>`, `<#C123>` or a bare `C123`.
#[must_use]
pub fn parse_channel_arg(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if let Some(caps) = CHANNEL_MENTION_RE.as_ref().and_then(|re| re.captures(raw)) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }

    CHANNEL_ID_RE
        .as_ref()
        .filter(|re| re.is_match(raw))
        .map(|_| raw.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    List,
    Add,
    Remove,
    Set,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TldrCommand {
    Now,
    Help,
    Config {
        action: ConfigAction,
        /// Parsed channel ID, if the argument was present and recognisable.
        channel: Option<String>,
    },
    Unknown(String),
}

impl TldrCommand {
    /// Parse the text after `/tldr`. Empty text means help.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split_whitespace();
        let Some(head) = parts.next() else {
            return TldrCommand::Help;
        };

        match head.to_lowercase().as_str() {
            "now" => TldrCommand::Now,
            "help" => TldrCommand::Help,
            "config" => {
                let action = match parts.next().map(str::to_lowercase).as_deref() {
                    Some("list") => ConfigAction::List,
                    Some("add") => ConfigAction::Add,
                    Some("remove") => ConfigAction::Remove,
                    Some("set") => ConfigAction::Set,
                    Some(other) => ConfigAction::Unknown(other.to_string()),
                    None => ConfigAction::Unknown(String::new()),
                };
                let channel = parts.next().and_then(parse_channel_arg);
                TldrCommand::Config { action, channel }
            }
            other => TldrCommand::Unknown(other.to_string()),
        }
    }
}
