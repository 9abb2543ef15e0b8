//! Dispatcher, relay and bot configuration parsing from environment variables.

use crate::domain::bot_kind::BotKind;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Dispatch environment configuration
#[derive(Debug, Clone)]
pub struct DispatchEnvConfig {
    pub worker_pool_size: usize,
    pub relay_poll_interval_ms: u64,
    pub bot_mode: BotKind,
    /// User id attributed to console commands without an `@user` prefix
    pub console_user_id: i64,
    /// Symbols analysed by the direct bot
    pub watchlist: Vec<String>,
}

impl Default for DispatchEnvConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 4,
            relay_poll_interval_ms: 100,
            bot_mode: BotKind::Dispatch,
            console_user_id: 1,
            watchlist: vec!["BTC".to_string(), "ETH".to_string()],
        }
    }
}

impl DispatchEnvConfig {
    pub fn from_env() -> Result<Self> {
        let mode_str = env::var("BOT_MODE").unwrap_or_else(|_| "dispatch".to_string());
        let bot_mode = BotKind::from_str(&mode_str).context("Failed to parse BOT_MODE")?;

        Ok(Self {
            worker_pool_size: env::var("WORKER_POOL_SIZE")
                .unwrap_or_else(|_| "4".to_string())
                .parse::<usize>()
                .unwrap_or(4)
                .max(1),
            relay_poll_interval_ms: env::var("RELAY_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "100".to_string())
                .parse::<u64>()
                .unwrap_or(100)
                .max(1),
            bot_mode,
            console_user_id: env::var("CONSOLE_USER_ID")
                .unwrap_or_else(|_| "1".to_string())
                .parse::<i64>()
                .unwrap_or(1),
            watchlist: parse_list(&env::var("WATCHLIST").unwrap_or_else(|_| "BTC,ETH".to_string())),
        })
    }

    pub fn relay_poll_interval(&self) -> Duration {
        Duration::from_millis(self.relay_poll_interval_ms)
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
