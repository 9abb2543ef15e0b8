use crate::domain::dispatch::UserId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Analyze {
        symbol: Option<String>,
        strategy: Option<String>,
    },
    Strategy(String),
    Status,
    Help,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub user_id: UserId,
    pub command: BotCommand,
}

pub const HELP_TEXT: &str = "Commands:\n  \
    /analyze [SYMBOL] [short|mid|long]  run an analysis\n  \
    /strategy NAME                      change your default strategy\n  \
    /status                             show whether you have an analysis running\n  \
    /help                               this message\n\
    Prefix a command with @ID to act as another user, e.g. `@42 /analyze ETH mid`.";

/// Parses one input line. Blank lines yield `None`. A leading `@ID` token
/// selects the user; otherwise `default_user` is used.
pub fn parse_line(line: &str, default_user: UserId) -> Option<CommandLine> {
    let mut tokens = line.split_whitespace().peekable();
    let first = *tokens.peek()?;

    let mut user_id = default_user;
    if let Some(raw) = first.strip_prefix('@') {
        let Ok(id) = raw.parse::<i64>() else {
            return Some(CommandLine {
                user_id,
                command: BotCommand::Unknown(line.trim().to_string()),
            });
        };
        user_id = UserId(id);
        tokens.next();
    }

    let Some(head) = tokens.next() else {
        return Some(CommandLine {
            user_id,
            command: BotCommand::Help,
        });
    };
    let args: Vec<&str> = tokens.collect();

    let command = match head.to_lowercase().as_str() {
        "/analyze" | "/a" => BotCommand::Analyze {
            symbol: args.first().map(|s| s.to_string()),
            strategy: args.get(1).map(|s| s.to_string()),
        },
        "/strategy" => match args.first() {
            Some(name) => BotCommand::Strategy(name.to_string()),
            None => BotCommand::Unknown(line.trim().to_string()),
        },
        "/status" => BotCommand::Status,
        "/help" | "/start" => BotCommand::Help,
        _ => BotCommand::Unknown(line.trim().to_string()),
    };

    Some(CommandLine { user_id, command })
}
