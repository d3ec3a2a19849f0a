use crate::retention::types::MAIN_THREAD;
use crate::transport::messaging::{InboundEvent, InboundKind};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Turn one `getUpdates` entry into an [`InboundEvent`].
/// Updates that carry no message (callbacks, member changes, ...) yield `None`.
pub fn parse_update(update: &Value) -> Option<InboundEvent> {
    if let Some(message) = update.get("message") {
        return parse_message(message, InboundKind::NewMessage);
    }
    if let Some(message) = update.get("edited_message") {
        return parse_message(message, InboundKind::EditedMessage);
    }
    None
}

fn parse_message(message: &Value, kind: InboundKind) -> Option<InboundEvent> {
    let chat = message.get("chat")?;
    let chat_id = chat.get("id").and_then(Value::as_i64)?;
    let message_id = message.get("message_id").and_then(Value::as_i64)?;

    // Replies in plain groups carry a message_thread_id too; only forum topic
    // messages are scoped to a thread.
    let is_topic_message = message
        .get("is_topic_message")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let thread_id = if is_topic_message {
        message
            .get("message_thread_id")
            .and_then(Value::as_i64)
            .unwrap_or(MAIN_THREAD)
    } else {
        MAIN_THREAD
    };

    let timestamp = message
        .get("date")
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);

    let sender_id = message
        .get("from")
        .and_then(|from| from.get("id"))
        .and_then(Value::as_i64);

    let text = message
        .get("text")
        .or_else(|| message.get("caption"))
        .and_then(Value::as_str)
        .map(ToString::to_string);

    let is_forwarded = message.get("forward_origin").is_some()
        || message.get("forward_date").is_some()
        || message
            .get("is_automatic_forward")
            .and_then(Value::as_bool)
            .unwrap_or(false);

    let pinned_message_id = message
        .get("pinned_message")
        .and_then(|pinned| pinned.get("message_id"))
        .and_then(Value::as_i64);
    let kind = if pinned_message_id.is_some() && kind == InboundKind::NewMessage {
        InboundKind::PinnedNotice
    } else {
        kind
    };

    // Only present when the update embeds a full chat object; rarely the case.
    let pinned_at_post = chat
        .get("pinned_message")
        .and_then(|pinned| pinned.get("message_id"))
        .and_then(Value::as_i64)
        == Some(message_id);

    Some(InboundEvent {
        kind,
        chat_id,
        message_id,
        thread_id,
        timestamp,
        sender_id,
        text,
        is_forwarded,
        pinned_message_id,
        pinned_at_post,
    })
}
