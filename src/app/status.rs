use crate::config::Config;
use crate::retention::RetentionState;
use chrono::{DateTime, Utc};
use std::path::Path;

pub fn render_status(config: &Config, state_path: &Path, state: &RetentionState) -> String {
    let mut lines = vec![
        "◆ topic-janitor status".to_string(),
        String::new(),
        format!("Version     {}", env!("CARGO_PKG_VERSION")),
        format!("Config      {}", config.config_path.display()),
        format!("Snapshot    {}", state_path.display()),
        format!(
            "Chats       {}",
            if config.telegram.allowed_chats.is_empty() {
                "(none; bot is inert)".to_string()
            } else {
                config
                    .telegram
                    .allowed_chats
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        ),
        format!(
            "Sweep       every {}s, up to {} per tick",
            config.retention.sweep_interval_secs, config.retention.sweep_batch_limit
        ),
        format!("Forwarded   {:?}", config.retention.forwarded),
        String::new(),
        format!("Policies    {}", state.policies.len()),
    ];

    for (topic, policy) in state.policies.iter() {
        let tracked = state.windows.window(topic).len();
        lines.push(format!(
            "  {:<24} minutes={:<6} max_messages={:<6} tracked={tracked}",
            topic.to_string(),
            policy.minutes,
            policy.max_messages
        ));
    }

    lines.push(String::new());
    lines.push(format!("Pending     {}", state.schedule.len()));
    lines.push(format!("Windowed    {}", state.windows.tracked_count()));
    lines.push(format!(
        "Next due    {}",
        state
            .schedule
            .next_due()
            .map_or_else(|| "-".to_string(), |due| format_due(due, Utc::now()))
    ));

    lines.join("\n")
}

fn format_due(due: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = due - now;
    if delta.num_seconds() <= 0 {
        format!("{} (overdue)", due.to_rfc3339())
    } else {
        format!("{} (in {}s)", due.to_rfc3339(), delta.num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::{MessageRef, TopicKey};
    use chrono::{Duration, TimeZone};
    use std::path::PathBuf;

    #[test]
    fn status_lists_policies_and_counts() {
        let config = Config {
            config_path: PathBuf::from("/etc/janitor/config.toml"),
            ..Config::default()
        };
        let mut state = RetentionState::new();
        let topic = TopicKey::new(-100, 4);
        state.policies.set(topic, Some(30), Some(2));
        state
            .windows
            .track(topic, MessageRef::new(-100, 1, 4), 2);

        let text = render_status(&config, Path::new("/var/state.json"), &state);
        assert!(text.contains("Policies    1"));
        assert!(text.contains("-100/4"));
        assert!(text.contains("tracked=1"));
        assert!(text.contains("bot is inert"));
        assert!(text.contains("Next due    -"));
    }

    #[test]
    fn overdue_entries_are_flagged() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert!(format_due(now - Duration::minutes(1), now).ends_with("(overdue)"));
        assert!(format_due(now + Duration::seconds(30), now).ends_with("(in 30s)"));
    }
}
