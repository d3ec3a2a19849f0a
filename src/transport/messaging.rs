use crate::error::GatewayError;
use crate::retention::types::{MessageRef, TopicKey};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Result of one delete attempt. Every variant concludes the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Forbidden,
    Failed(String),
}

/// Role of a chat member as reported by the messaging service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    Owner,
    Administrator,
    Member,
    Other,
}

impl ChatRole {
    pub fn can_manage_retention(self) -> bool {
        matches!(self, Self::Owner | Self::Administrator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    NewMessage,
    EditedMessage,
    /// Service message announcing that another message was pinned.
    PinnedNotice,
}

/// One message-bearing update from the messaging service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub kind: InboundKind,
    pub chat_id: i64,
    pub message_id: i64,
    /// Forum thread, `0` for the chat's main stream.
    pub thread_id: i64,
    pub timestamp: DateTime<Utc>,
    pub sender_id: Option<i64>,
    pub text: Option<String>,
    pub is_forwarded: bool,
    /// For pinned notices: the message that got pinned.
    pub pinned_message_id: Option<i64>,
    /// Best-effort flag: the message was already pinned when it arrived.
    pub pinned_at_post: bool,
}

impl InboundEvent {
    pub fn message(&self) -> MessageRef {
        MessageRef::new(self.chat_id, self.message_id, self.thread_id)
    }

    pub fn topic(&self) -> TopicKey {
        TopicKey::new(self.chat_id, self.thread_id)
    }

    pub fn pinned_message(&self) -> Option<MessageRef> {
        self.pinned_message_id
            .map(|message_id| MessageRef::new(self.chat_id, message_id, self.thread_id))
    }
}

/// What the retention core needs from the chat service.
pub trait MessagingGateway: Send + Sync {
    fn name(&self) -> &str;

    fn delete_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Pin<Box<dyn Future<Output = DeleteOutcome> + Send + '_>>;

    fn chat_member_role(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<ChatRole, GatewayError>> + Send + '_>>;

    fn send_reply<'a>(
        &'a self,
        chat_id: i64,
        thread_id: i64,
        reply_to: Option<i64>,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>>;
}
