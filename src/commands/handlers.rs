use super::types::{Command, CommandResult};
use crate::retention::{PolicyChange, RetentionEngine, RetentionPolicy};
use crate::transport::messaging::InboundEvent;

const REJECTION: &str = "Only chat owners and administrators can change retention settings.";
const ROLE_CHECK_FAILED: &str = "Could not verify your permissions right now. Please try again.";

/// Run `command` for the topic `event` was posted in and build the reply.
pub async fn handle_command(
    engine: &RetentionEngine,
    event: &InboundEvent,
    command: &Command,
) -> CommandResult {
    if command.requires_admin()
        && let Err(rejection) = authorize(engine, event).await
    {
        return rejection;
    }

    match *command {
        Command::Malformed { usage } => CommandResult::reply(usage),
        Command::ShowPolicy => {
            let policy = engine.policy(event.topic()).await;
            CommandResult::reply(render_policy(policy))
        }
        Command::SetMinutes { minutes } => {
            let change = engine
                .apply_policy_command(event.topic(), Some(minutes), None)
                .await;
            CommandResult::reply(render_change(&change))
        }
        Command::SetMaxMessages { max_messages } => {
            let change = engine
                .apply_policy_command(event.topic(), None, Some(max_messages))
                .await;
            CommandResult::reply(render_change(&change))
        }
    }
}

async fn authorize(engine: &RetentionEngine, event: &InboundEvent) -> Result<(), CommandResult> {
    let Some(user_id) = event.sender_id else {
        return Err(CommandResult::reply(REJECTION));
    };

    match engine
        .gateway()
        .chat_member_role(event.chat_id, user_id)
        .await
    {
        Ok(role) if role.can_manage_retention() => Ok(()),
        Ok(role) => {
            tracing::warn!(
                chat_id = event.chat_id,
                user_id,
                ?role,
                "rejected retention command from non-administrator"
            );
            Err(CommandResult::reply(REJECTION))
        }
        Err(error) => {
            tracing::warn!(chat_id = event.chat_id, user_id, %error, "role lookup failed");
            Err(CommandResult::reply(ROLE_CHECK_FAILED))
        }
    }
}

/// Human-readable summary of a topic policy.
pub fn render_policy(policy: RetentionPolicy) -> String {
    if policy.is_disabled() {
        return "Retention is off in this topic.".to_string();
    }

    let mut rules = Vec::with_capacity(2);
    if policy.has_time_limit() {
        rules.push(format!(
            "messages are deleted {} after they are posted",
            format_minutes(policy.minutes)
        ));
    }
    if policy.has_count_limit() {
        rules.push(match policy.max_messages {
            1 => "only the last message is kept".to_string(),
            n => format!("only the last {n} messages are kept"),
        });
    }
    format!("Retention in this topic: {}.", rules.join("; "))
}

fn render_change(change: &PolicyChange) -> String {
    let mut text = render_policy(change.policy);
    if !change.evictions.is_empty() {
        text.push_str(&format!(
            " Removed {} older message{} to fit the new limit.",
            change.evictions.len(),
            if change.evictions.len() == 1 { "" } else { "s" }
        ));
    }
    text
}

fn format_minutes(minutes: u32) -> String {
    match minutes {
        1 => "1 minute".to_string(),
        m if m % 1440 == 0 => {
            let days = m / 1440;
            format!("{days} day{}", if days == 1 { "" } else { "s" })
        }
        m if m % 60 == 0 => {
            let hours = m / 60;
            format!("{hours} hour{}", if hours == 1 { "" } else { "s" })
        }
        m => format!("{m} minutes"),
    }
}
