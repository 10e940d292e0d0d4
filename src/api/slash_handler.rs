//! Handler for the `/tldr` slash command.

use tracing::{error, info, warn};

use super::handler::AppState;
use super::helpers::reply_later;
use crate::core::models::DigestOutcome;
use crate::errors::BotError;
use crate::slack::command_parser::{ConfigAction, SlackCommandEvent, TldrCommand, parse_form_data};
use crate::worker::digest::check_preconditions;
use crate::worker::{CANONICAL_FAILURE_MESSAGE, Trigger};

pub const HELP_TEXT: &str = "*TLDR Bot Help*\n\
TLDR Bot posts hourly summaries of your monitored channels.\n\n\
• `/tldr now` Generate a summary of new messages immediately.\n\
• `/tldr config list` Show the summary channel and monitored channels.\n\
• `/tldr config add #channel` Add a channel to be monitored for summaries.\n\
• `/tldr config remove #channel` Stop monitoring a channel.\n\
• `/tldr config set #channel` Set the channel where summaries are posted.\n\
• `/tldr help` Show this help message.";

pub const BUSY_MESSAGE: &str =
    "A summary is already being generated. Please wait for it to finish.";
pub const NOT_ADMIN_MESSAGE: &str = "You need administrator permissions to configure TLDR Bot.";
pub const STARTED_MESSAGE: &str =
    "✨ Generating a summary now. I'll let you know when it has been posted.";

/// Handle a slash command and return the text of the immediate ephemeral reply.
///
/// # Errors
///
/// Returns an error if the body cannot be parsed.
pub async fn handle_slash_command(state: &AppState, body: &str) -> Result<String, BotError> {
    let event = parse_form_data(body)?;
    info!(user_id = %event.user_id, channel_id = %event.channel_id, text = %event.text, "Slash command received");

    let reply = match TldrCommand::parse(&event.text) {
        TldrCommand::Now => handle_now(state, &event).await,
        TldrCommand::Help => HELP_TEXT.to_string(),
        TldrCommand::Config { action, channel } => {
            handle_config(state, &event, action, channel.as_deref()).await
        }
        TldrCommand::Unknown(other) => {
            warn!(subcommand = %other, "Unknown /tldr subcommand");
            format!("Unknown subcommand.\n\n{HELP_TEXT}")
        }
    };
    Ok(reply)
}

async fn handle_now(state: &AppState, event: &SlackCommandEvent) -> String {
    let config = state.store.get().await;
    if let Err(reason) = check_preconditions(&config) {
        return reason.user_message().to_string();
    }
    if state.runner.is_running() {
        return BUSY_MESSAGE.to_string();
    }

    let runner = state.runner.clone();
    let http = state.http.clone();
    let response_url = event.response_url.clone();
    tokio::spawn(async move {
        let reply = match runner.run(Trigger::Manual).await {
            Ok(outcome) => outcome_message(&outcome),
            Err(e) => {
                error!("Manual summary failed: {}", e);
                CANONICAL_FAILURE_MESSAGE.to_string()
            }
        };
        reply_later(&http, &response_url, &reply).await;
    });

    STARTED_MESSAGE.to_string()
}

/// User-facing text for a finished manual run.
#[must_use]
pub fn outcome_message(outcome: &DigestOutcome) -> String {
    match outcome {
        DigestOutcome::Posted { .. } => {
            "Summary generated and posted to the summary channel.".to_string()
        }
        DigestOutcome::Quiet { .. } => {
            "No new messages since the last summary, so nothing was posted.".to_string()
        }
        DigestOutcome::NotConfigured(reason) => reason.user_message().to_string(),
        DigestOutcome::Busy => BUSY_MESSAGE.to_string(),
    }
}

async fn handle_config(
    state: &AppState,
    event: &SlackCommandEvent,
    action: ConfigAction,
    channel: Option<&str>,
) -> String {
    match state.platform.is_admin(&event.user_id).await {
        Ok(true) => {}
        Ok(false) => return NOT_ADMIN_MESSAGE.to_string(),
        Err(e) => {
            error!(user_id = %event.user_id, "Failed to check admin permissions: {}", e);
            return "Could not verify your permissions. Please try again later.".to_string();
        }
    }

    match action {
        ConfigAction::List => config_list(state).await,
        ConfigAction::Add => config_add(state, channel).await,
        ConfigAction::Remove => config_remove(state, channel).await,
        ConfigAction::Set => config_set(state, channel).await,
        ConfigAction::Unknown(_) => {
            "Unknown configuration action. Use `list`, `add`, `remove` or `set`.".to_string()
        }
    }
}

fn mention(channel_id: &str) -> String {
    format!("<#{channel_id}>")
}

async fn config_list(state: &AppState) -> String {
    let config = state.store.get().await;

    let summary_channel = config
        .summary_channel_id
        .as_deref()
        .map_or_else(|| "Not configured".to_string(), mention);

    let monitored = if config.monitored_channel_ids.is_empty() {
        "No channels are being monitored".to_string()
    } else {
        config
            .monitored_channel_ids
            .iter()
            .map(|id| mention(id))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "*TLDR Bot Configuration*\n*Summary Channel:* {summary_channel}\n*Monitored Channels:*\n{monitored}"
    )
}

/// Resolve a channel argument to a text channel, or the reply explaining why not.
async fn require_text_channel(state: &AppState, channel_id: &str, rejection: &str) -> Result<(), String> {
    match state.platform.resolve_channel(channel_id).await {
        Ok(channel) if channel.is_text => Ok(()),
        Ok(_) => Err(rejection.to_string()),
        Err(e) => {
            warn!(%channel_id, "Failed to resolve channel: {}", e);
            Err(format!("Could not find channel {}.", mention(channel_id)))
        }
    }
}

async fn config_add(state: &AppState, channel: Option<&str>) -> String {
    let Some(channel_id) = channel else {
        return "You need to specify a channel to add.".to_string();
    };
    if let Err(reply) =
        require_text_channel(state, channel_id, "Only text channels can be monitored.").await
    {
        return reply;
    }
    if state.store.get().await.is_monitored(channel_id) {
        return format!("{} is already being monitored.", mention(channel_id));
    }

    if state.store.add_monitored(channel_id).await {
        info!(%channel_id, "Channel added to monitored channels");
        format!("{} has been added to monitored channels.", mention(channel_id))
    } else {
        format!("Failed to add {} to monitored channels.", mention(channel_id))
    }
}

async fn config_remove(state: &AppState, channel: Option<&str>) -> String {
    let Some(channel_id) = channel else {
        return "You need to specify a channel to remove.".to_string();
    };
    if !state.store.get().await.is_monitored(channel_id) {
        return format!("{} is not being monitored.", mention(channel_id));
    }

    if state.store.remove_monitored(channel_id).await {
        info!(%channel_id, "Channel removed from monitored channels");
        format!("{} has been removed from monitored channels.", mention(channel_id))
    } else {
        format!("Failed to remove {} from monitored channels.", mention(channel_id))
    }
}

async fn config_set(state: &AppState, channel: Option<&str>) -> String {
    let Some(channel_id) = channel else {
        return "You need to specify a channel to set as the summary channel.".to_string();
    };
    if let Err(reply) = require_text_channel(
        state,
        channel_id,
        "Only text channels can be set as the summary channel.",
    )
    .await
    {
        return reply;
    }

    if state.store.set_summary_channel(channel_id).await {
        info!(%channel_id, "Summary channel set");
        format!("{} has been set as the summary channel.", mention(channel_id))
    } else {
        format!("Failed to set {} as the summary channel.", mention(channel_id))
    }
}
