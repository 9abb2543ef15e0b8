//! Market data provider configuration parsing from environment variables.

use std::env;

/// Binance REST endpoints and HTTP behaviour
#[derive(Debug, Clone)]
pub struct ProviderEnvConfig {
    pub binance_spot_url: String,
    pub binance_futures_url: String,
    pub http_max_retries: u32,
    pub http_timeout_secs: u64,
}

impl Default for ProviderEnvConfig {
    fn default() -> Self {
        Self {
            binance_spot_url: "https://api.binance.com".to_string(),
            binance_futures_url: "https://fapi.binance.com".to_string(),
            http_max_retries: 3,
            http_timeout_secs: 30,
        }
    }
}

impl ProviderEnvConfig {
    pub fn from_env() -> Self {
        Self {
            binance_spot_url: env::var("BINANCE_SPOT_URL")
                .unwrap_or_else(|_| "https://api.binance.com".to_string()),
            binance_futures_url: env::var("BINANCE_FUTURES_URL")
                .unwrap_or_else(|_| "https://fapi.binance.com".to_string()),
            http_max_retries: env::var("HTTP_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse::<u32>()
                .unwrap_or(3),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .unwrap_or(30),
        }
    }
}
