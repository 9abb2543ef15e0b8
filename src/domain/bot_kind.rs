use std::fmt;
use std::str::FromStr;

/// Which bot variant the binary runs, selected by `BOT_MODE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotKind {
    /// Analyze the watch list and deliver each report directly
    Direct,
    /// Serve line commands through the dispatcher and relay
    Dispatch,
}

impl FromStr for BotKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" | "watch" => Ok(BotKind::Direct),
            "dispatch" | "serve" => Ok(BotKind::Dispatch),
            _ => anyhow::bail!("Invalid BOT_MODE: {}. Must be 'direct' or 'dispatch'", s),
        }
    }
}

impl fmt::Display for BotKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BotKind::Direct => write!(f, "direct"),
            BotKind::Dispatch => write!(f, "dispatch"),
        }
    }
}
