#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use topic_janitor::error::GatewayError;
use topic_janitor::retention::{RetentionEngine, RetentionState, SnapshotStore};
use topic_janitor::transport::{
    ChatRole, DeleteOutcome, InboundEvent, InboundKind, MessagingGateway,
};

pub const CHAT: i64 = -100_123;
pub const THREAD: i64 = 7;
pub const ADMIN: i64 = 1;
pub const MEMBER: i64 = 2;

/// In-memory gateway that records every call.
#[derive(Default)]
pub struct RecordingGateway {
    deleted: Mutex<Vec<(i64, i64)>>,
    replies: Mutex<Vec<(i64, i64, String)>>,
    roles: Mutex<HashMap<i64, ChatRole>>,
    outcomes: Mutex<HashMap<i64, DeleteOutcome>>,
}

impl RecordingGateway {
    pub fn new() -> Arc<Self> {
        let gateway = Self::default();
        gateway.set_role(ADMIN, ChatRole::Administrator);
        gateway.set_role(MEMBER, ChatRole::Member);
        Arc::new(gateway)
    }

    pub fn set_role(&self, user_id: i64, role: ChatRole) {
        self.roles.lock().unwrap().insert(user_id, role);
    }

    pub fn fail_delete(&self, message_id: i64, outcome: DeleteOutcome) {
        self.outcomes.lock().unwrap().insert(message_id, outcome);
    }

    pub fn deleted_ids(&self) -> Vec<i64> {
        self.deleted.lock().unwrap().iter().map(|(_, id)| *id).collect()
    }

    pub fn replies(&self) -> Vec<String> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, text)| text.clone())
            .collect()
    }
}

impl MessagingGateway for RecordingGateway {
    fn name(&self) -> &str {
        "recording"
    }

    fn delete_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Pin<Box<dyn Future<Output = DeleteOutcome> + Send + '_>> {
        self.deleted.lock().unwrap().push((chat_id, message_id));
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get(&message_id)
            .cloned()
            .unwrap_or(DeleteOutcome::Deleted);
        Box::pin(async move { outcome })
    }

    fn chat_member_role(
        &self,
        _chat_id: i64,
        user_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<ChatRole, GatewayError>> + Send + '_>> {
        let role = self.roles.lock().unwrap().get(&user_id).copied();
        Box::pin(async move {
            role.ok_or_else(|| GatewayError::Rejected {
                method: "getChatMember".into(),
                status: 400,
                description: "Bad Request: user not found".into(),
            })
        })
    }

    fn send_reply<'a>(
        &'a self,
        chat_id: i64,
        thread_id: i64,
        _reply_to: Option<i64>,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        self.replies
            .lock()
            .unwrap()
            .push((chat_id, thread_id, text.to_string()));
        Box::pin(async { Ok(()) })
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn snapshot_store(tmp: &TempDir) -> SnapshotStore {
    SnapshotStore::new(tmp.path().join("retention_state.json"))
}

pub fn engine_with(tmp: &TempDir, gateway: &Arc<RecordingGateway>) -> Arc<RetentionEngine> {
    let state = snapshot_store(tmp).load().unwrap_or_else(|_| RetentionState::new());
    let gateway: Arc<dyn MessagingGateway> = gateway.clone();
    Arc::new(RetentionEngine::new(state, snapshot_store(tmp), gateway))
}

pub fn message_event(message_id: i64, sender: i64, text: &str) -> InboundEvent {
    InboundEvent {
        kind: InboundKind::NewMessage,
        chat_id: CHAT,
        message_id,
        thread_id: THREAD,
        timestamp: t0(),
        sender_id: Some(sender),
        text: Some(text.to_string()),
        is_forwarded: false,
        pinned_message_id: None,
        pinned_at_post: false,
    }
}
