//! Transcript formatting and prompt assembly for channel summaries.

use chrono_tz::Tz;
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};

use crate::core::models::Message;

/// System instruction fixing the assistant's role.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that summarizes Slack conversations accurately and concisely.";

/// Upper bound on generated tokens per channel summary.
pub const MAX_SUMMARY_TOKENS: u32 = 500;

/// Sampling temperature for summaries.
pub const SUMMARY_TEMPERATURE: f64 = 0.7;

/// Render one message as `[HH:MM:SS] author: body` in the digest timezone.
#[must_use]
pub fn format_message_line(message: &Message, tz: Tz) -> String {
    let local = message.authored_at.with_timezone(&tz);
    format!(
        "[{}] {}: {}",
        local.format("%H:%M:%S"),
        message.author_name,
        message.body
    )
}

/// Join formatted messages with newlines, preserving input order.
#[must_use]
pub fn format_transcript(messages: &[Message], tz: Tz) -> String {
    messages
        .iter()
        .map(|m| format_message_line(m, tz))
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn build_user_prompt(transcript: &str, channel_name: &str) -> String {
    format!(
        "Summarize the following Slack chat from the #{channel_name} channel. \
         Focus on the main topics, key points, and any decisions or action items. \
         Keep the summary concise but informative:\n\n{transcript}\n\nSummary:"
    )
}

/// Build the two-message chat prompt sent to the model.
#[must_use]
pub fn build_prompt(transcript: &str, channel_name: &str) -> Vec<ChatCompletionMessage> {
    vec![
        ChatCompletionMessage {
            role: MessageRole::system,
            content: Content::Text(SYSTEM_PROMPT.to_string()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        },
        ChatCompletionMessage {
            role: MessageRole::user,
            content: Content::Text(build_user_prompt(transcript, channel_name)),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn msg(h: u32, m: u32, author: &str, body: &str) -> Message {
        Message {
            authored_at: Utc.with_ymd_and_hms(2024, 3, 1, h, m, 5).unwrap(),
            author_name: author.to_string(),
            author_is_automated: false,
            body: body.to_string(),
        }
    }

    #[test]
    fn line_uses_bracketed_local_time() {
        let line = format_message_line(&msg(14, 30, "alice", "ship it"), Tz::UTC);
        assert_eq!(line, "[14:30:05] alice: ship it");
    }

    #[test]
    fn line_respects_timezone() {
        let line = format_message_line(&msg(14, 30, "alice", "hi"), chrono_tz::Europe::Berlin);
        assert_eq!(line, "[15:30:05] alice: hi");
    }

    #[test]
    fn transcript_is_newline_joined_in_order() {
        let transcript =
            format_transcript(&[msg(9, 0, "a", "first"), msg(9, 1, "b", "second")], Tz::UTC);
        assert_eq!(transcript, "[09:00:05] a: first\n[09:01:05] b: second");
    }

    #[test]
    fn prompt_embeds_channel_and_transcript() {
        let prompt = build_prompt("[09:00:05] a: hello", "general");
        assert_eq!(prompt.len(), 2);
        assert!(matches!(prompt[0].role, MessageRole::system));
        match &prompt[1].content {
            Content::Text(text) => {
                assert!(text.contains("#general channel"));
                assert!(text.contains("[09:00:05] a: hello"));
                assert!(text.ends_with("Summary:"));
            }
            Content::ImageUrl(_) => panic!("expected text content"),
        }
    }
}
