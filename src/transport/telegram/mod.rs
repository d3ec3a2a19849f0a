pub mod updates;

use crate::config::TelegramConfig;
use crate::error::GatewayError;
use crate::transport::messaging::{ChatRole, DeleteOutcome, InboundEvent, MessagingGateway};
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, watch};


const REQUEST_TIMEOUT_SECS: u64 = 15;
const POLL_RETRY_SECS: u64 = 5;

/// Telegram Bot API client: long-polls for updates and performs deletions.
pub struct TelegramGateway {
    bot_token: String,
    api_base: String,
    poll_timeout_secs: u64,
    client: reqwest::Client,
}

impl TelegramGateway {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            bot_token: config.bot_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            poll_timeout_secs: config.poll_timeout_secs,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    /// POST a Bot API method and unwrap its `result`.
    async fn call(
        &self,
        method: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, GatewayError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Request {
                method: method.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        let data: Value = resp.json().await.map_err(|e| GatewayError::Payload {
            method: method.to_string(),
            message: e.to_string(),
        })?;

        if data.get("ok").and_then(Value::as_bool) == Some(true) {
            return Ok(data.get("result").cloned().unwrap_or(Value::Null));
        }

        let code = data
            .get("error_code")
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
            .unwrap_or_else(|| status.as_u16());
        let description = data
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("no description")
            .to_string();
        Err(GatewayError::Rejected {
            method: method.to_string(),
            status: code,
            description,
        })
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Value>, GatewayError> {
        let body = json!({
            "offset": offset,
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message", "edited_message"]
        });
        let timeout = Duration::from_secs(self.poll_timeout_secs + REQUEST_TIMEOUT_SECS);
        let result = self.call("getUpdates", &body, timeout).await?;
        match result {
            Value::Array(updates) => Ok(updates),
            other => Err(GatewayError::Payload {
                method: "getUpdates".into(),
                message: format!("expected an array, got {other}"),
            }),
        }
    }

    /// Long-poll until the shutdown flag flips or the receiver goes away.
    pub async fn listen(
        &self,
        tx: mpsc::Sender<InboundEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let mut offset: i64 = 0;

        tracing::info!("Telegram gateway listening for updates...");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let polled = tokio::select! {
                polled = self.get_updates(offset) => polled,
                changed = shutdown.changed() => {
                    if changed.is_err() { break; }
                    continue;
                }
            };

            let batch = match polled {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!("Telegram poll error: {e}");
                    tokio::select! {
                        () = tokio::time::sleep(Duration::from_secs(POLL_RETRY_SECS)) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() { break; }
                        }
                    }
                    continue;
                }
            };

            for update in batch {
                // Advance offset past this update
                if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                    offset = uid + 1;
                }

                let Some(event) = updates::parse_update(&update) else {
                    continue;
                };

                if tx.send(event).await.is_err() {
                    return Ok(());
                }
            }
        }

        tracing::info!("Telegram gateway stopped listening");
        Ok(())
    }
}

/// Map a rejected `deleteMessage` call onto a [`DeleteOutcome`].
pub fn classify_delete_failure(status: u16, description: &str) -> DeleteOutcome {
    let lowered = description.to_ascii_lowercase();
    if lowered.contains("not found") {
        DeleteOutcome::NotFound
    } else if status == 403
        || lowered.contains("can't be deleted")
        || lowered.contains("not enough rights")
    {
        DeleteOutcome::Forbidden
    } else {
        DeleteOutcome::Failed(format!("{status}: {description}"))
    }
}

/// Map a `getChatMember` status string onto a [`ChatRole`].
pub fn role_from_status(status: &str) -> ChatRole {
    match status {
        "creator" => ChatRole::Owner,
        "administrator" => ChatRole::Administrator,
        "member" => ChatRole::Member,
        _ => ChatRole::Other,
    }
}

impl MessagingGateway for TelegramGateway {
    fn name(&self) -> &str {
        "telegram"
    }

    fn delete_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Pin<Box<dyn Future<Output = DeleteOutcome> + Send + '_>> {
        Box::pin(async move {
            let body = json!({ "chat_id": chat_id, "message_id": message_id });
            match self
                .call("deleteMessage", &body, Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .await
            {
                Ok(_) => DeleteOutcome::Deleted,
                Err(GatewayError::Rejected {
                    status,
                    description,
                    ..
                }) => classify_delete_failure(status, &description),
                Err(e) => DeleteOutcome::Failed(e.to_string()),
            }
        })
    }

    fn chat_member_role(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<ChatRole, GatewayError>> + Send + '_>> {
        Box::pin(async move {
            let body = json!({ "chat_id": chat_id, "user_id": user_id });
            let member = self
                .call("getChatMember", &body, Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .await?;
            let status = member
                .get("status")
                .and_then(Value::as_str)
                .ok_or_else(|| GatewayError::Payload {
                    method: "getChatMember".into(),
                    message: "missing status".into(),
                })?;
            Ok(role_from_status(status))
        })
    }

    fn send_reply<'a>(
        &'a self,
        chat_id: i64,
        thread_id: i64,
        reply_to: Option<i64>,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + 'a>> {
        Box::pin(async move {
            let mut body = json!({ "chat_id": chat_id, "text": text });
            if thread_id != 0 {
                body["message_thread_id"] = json!(thread_id);
            }
            if let Some(message_id) = reply_to {
                body["reply_parameters"] = json!({
                    "message_id": message_id,
                    "allow_sending_without_reply": true
                });
            }
            self.call("sendMessage", &body, Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .await
                .map(|_| ())
        })
    }
}
