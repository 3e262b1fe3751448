//! Reply extraction from a fetched message page

use assistant_relay_providers::{MessageContent, Role, ThreadMessage};

/// Returned when the session holds no assistant text
pub const NO_REPLY_TEXT: &str = "(no reply)";

/// Pick the newest assistant message and join its text parts.
///
/// `messages` must be ordered newest first, as returned by
/// `AssistantBackend::list_messages`. Empty text parts are skipped and the
/// remaining ones are joined with a blank line.
pub fn extract_reply(messages: &[ThreadMessage]) -> String {
    messages
        .iter()
        .find(|message| message.role == Role::Assistant)
        .map(|message| {
            message
                .content
                .iter()
                .filter_map(|part| match part {
                    MessageContent::Text { text } if !text.value.is_empty() => {
                        Some(text.value.as_str())
                    }
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n\n")
                .trim()
                .to_string()
        })
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NO_REPLY_TEXT.to_string())
}
