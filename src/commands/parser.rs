use super::types::Command;

pub const MINUTES_USAGE: &str = "Usage: /autodelete <minutes> (0 turns it off)";
pub const MAX_MESSAGES_USAGE: &str = "Usage: /maxmessages <count> (0 turns it off)";

/// Parse a retention command. Returns `None` for text that is not one of
/// ours, so ordinary messages and other bots' commands fall through.
pub fn parse_command(input: &str) -> Option<Command> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let head = parts.next()?.to_lowercase();
    // "/autodelete@JanitorBot" addresses the bot explicitly in groups.
    let cmd = head.split('@').next().unwrap_or_default();
    let args = parts.next().unwrap_or("").trim();

    match cmd {
        "/autodelete" | "/ttl" => Some(match parse_count(args) {
            Some(minutes) => Command::SetMinutes { minutes },
            None => Command::Malformed {
                usage: MINUTES_USAGE,
            },
        }),
        "/maxmessages" | "/keeplast" => Some(match parse_count(args) {
            Some(max_messages) => Command::SetMaxMessages { max_messages },
            None => Command::Malformed {
                usage: MAX_MESSAGES_USAGE,
            },
        }),
        "/retention" => Some(Command::ShowPolicy),
        _ => None,
    }
}

/// Exactly one non-negative integer argument.
fn parse_count(args: &str) -> Option<u32> {
    let mut tokens = args.split_whitespace();
    let value = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    value.parse::<u32>().ok()
}
