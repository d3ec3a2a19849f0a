/// A retention command issued inside a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Delete messages this many minutes after they arrive; 0 disables.
    SetMinutes { minutes: u32 },
    /// Keep only the last N messages; 0 disables.
    SetMaxMessages { max_messages: u32 },
    /// Show the topic's current policy.
    ShowPolicy,
    /// A known command with unusable arguments.
    Malformed { usage: &'static str },
}

impl Command {
    pub fn requires_admin(&self) -> bool {
        matches!(self, Self::SetMinutes { .. } | Self::SetMaxMessages { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub text: String,
}

impl CommandResult {
    pub fn reply(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
