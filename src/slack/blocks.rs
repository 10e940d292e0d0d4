//! Block Kit rendering for digests and slash-command replies.

use serde_json::{Value, json};

use crate::core::models::Digest;

/// Slack rejects section text longer than this.
pub const SECTION_TEXT_LIMIT: usize = 3000;
/// Slack rejects header text longer than this.
pub const HEADER_TEXT_LIMIT: usize = 150;

/// Cut `text` to at most `limit` characters, marking the cut with an ellipsis.
#[must_use]
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Render a digest as a `blocks` array: header, then per channel a section
/// and a context footer, with dividers between channels.
#[must_use]
pub fn render_digest(digest: &Digest) -> Value {
    let mut blocks = Vec::with_capacity(1 + digest.blocks.len() * 3);

    blocks.push(json!({
        "type": "header",
        "text": {
            "type": "plain_text",
            "text": truncate_chars(&digest.header, HEADER_TEXT_LIMIT),
            "emoji": true
        }
    }));

    for (i, block) in digest.blocks.iter().enumerate() {
        if i > 0 {
            blocks.push(json!({ "type": "divider" }));
        }
        let text = format!("*{}*\n\n{}", block.title, block.body);
        blocks.push(json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": truncate_chars(&text, SECTION_TEXT_LIMIT)
            }
        }));
        blocks.push(json!({
            "type": "context",
            "elements": [ { "type": "mrkdwn", "text": block.footer } ]
        }));
    }

    Value::Array(blocks)
}

/// Payload for a reply only the invoking user can see.
#[must_use]
pub fn create_ephemeral_payload(text: &str) -> Value {
    json!({
        "text": text,
        "response_type": "ephemeral"
    })
}
