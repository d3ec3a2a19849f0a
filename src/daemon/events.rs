use crate::commands::{handle_command, parse_command};
use crate::config::ForwardedPolicy;
use crate::retention::RetentionEngine;
use crate::transport::messaging::{InboundEvent, InboundKind};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// What the router did with one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Ignored(&'static str),
    Command,
    Tracked,
    Pinned,
    Edited,
}

/// Routes inbound chat events to the retention engine.
pub struct EventRouter {
    engine: Arc<RetentionEngine>,
    allowed_chats: Vec<i64>,
    forwarded: ForwardedPolicy,
}

impl EventRouter {
    pub fn new(
        engine: Arc<RetentionEngine>,
        allowed_chats: Vec<i64>,
        forwarded: ForwardedPolicy,
    ) -> Self {
        Self {
            engine,
            allowed_chats,
            forwarded,
        }
    }

    pub async fn handle(&self, event: InboundEvent) -> Result<EventDisposition> {
        if !self.allowed_chats.contains(&event.chat_id) {
            tracing::debug!(
                chat_id = event.chat_id,
                "ignoring event from chat outside allow-list"
            );
            return Ok(EventDisposition::Ignored("chat not allowed"));
        }

        match event.kind {
            // An edit is not a new arrival; timers and windows stay as they are.
            InboundKind::EditedMessage => Ok(EventDisposition::Edited),
            InboundKind::PinnedNotice => {
                if let Some(pinned) = event.pinned_message() {
                    self.engine.on_message_pinned(pinned).await;
                }
                // The announcement itself is an ordinary message in the topic.
                self.track(&event).await;
                Ok(EventDisposition::Pinned)
            }
            InboundKind::NewMessage => {
                if let Some(command) = event.text.as_deref().and_then(parse_command) {
                    let result = handle_command(&self.engine, &event, &command).await;
                    self.engine
                        .gateway()
                        .send_reply(
                            event.chat_id,
                            event.thread_id,
                            Some(event.message_id),
                            &result.text,
                        )
                        .await
                        .with_context(|| {
                            format!("failed to reply to command in chat {}", event.chat_id)
                        })?;
                    return Ok(EventDisposition::Command);
                }

                if event.is_forwarded && self.forwarded == ForwardedPolicy::Ignore {
                    return Ok(EventDisposition::Ignored("forwarded message"));
                }

                if event.pinned_at_post {
                    return Ok(EventDisposition::Ignored("already pinned"));
                }

                self.track(&event).await;
                Ok(EventDisposition::Tracked)
            }
        }
    }

    async fn track(&self, event: &InboundEvent) {
        self.engine
            .on_message_arrived(event.message(), event.timestamp)
            .await;
    }
}

/// Consume inbound events until shutdown or until the producer hangs up.
/// A failure while handling one event is logged and never stops the loop.
pub async fn run_event_consumer(
    router: Arc<EventRouter>,
    mut rx: mpsc::Receiver<InboundEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else { break };
                let (chat_id, message_id) = (event.chat_id, event.message_id);
                if let Err(error) = router.handle(event).await {
                    tracing::warn!(chat_id, message_id, "event handling failed: {error:#}");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() { break; }
            }
        }
    }

    tracing::info!("event consumer stopped");
}
