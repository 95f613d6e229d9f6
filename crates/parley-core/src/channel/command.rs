//! Bot commands and their canned replies.

use parley_types::conversation::{Turn, TurnRole};

pub const GREETING: &str = "\
Hi! I'm your English tutor bot.
Send me any English sentence and I'll fix the grammar and wording, or ask me \
for some news to get a short article to practise with.

Commands:
/clear - forget our conversation and start over
/history - show what I currently remember
/help - show this message";

pub const CLEARED_REPLY: &str = "Conversation history cleared! Let's start from the top.";

pub const EMPTY_HISTORY_REPLY: &str = "There is no conversation history yet.";

const HISTORY_HEADER: &str = "What I remember (most recent part):";

/// A slash command addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Clear,
    History,
    /// Any other `/word`. Carries the lowercased name without the slash.
    Unknown(String),
}

impl BotCommand {
    /// Parse the leading command of a message.
    ///
    /// Returns `None` when the text is not a command at all. Accepts the
    /// `/cmd@botname` form used in group chats and ignores trailing
    /// arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let head = text.trim_start().split_whitespace().next()?;
        let name = head.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or_default().to_lowercase();

        Some(match name.as_str() {
            "start" => BotCommand::Start,
            "help" => BotCommand::Help,
            "clear" => BotCommand::Clear,
            "history" => BotCommand::History,
            _ => BotCommand::Unknown(name),
        })
    }
}

/// Render `/history` output: the last `max_turns` turns, numbered from 1,
/// each cut to `max_chars` characters.
pub fn render_history(turns: &[Turn], max_turns: usize, max_chars: usize) -> String {
    if turns.is_empty() {
        return EMPTY_HISTORY_REPLY.to_string();
    }

    let start = turns.len().saturating_sub(max_turns);
    let mut out = format!("{HISTORY_HEADER}\n\n");
    for (i, turn) in turns[start..].iter().enumerate() {
        let prefix = match turn.role {
            TurnRole::User => "You:",
            TurnRole::Assistant => "Me:",
        };
        out.push_str(&format!(
            "{}. {} {}\n",
            i + 1,
            prefix,
            preview(&turn.content, max_chars)
        ));
    }
    out
}

fn preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}
