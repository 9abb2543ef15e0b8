//! Analysis configuration parsing from environment variables.

use crate::domain::market::strategy_tier::StrategyTier;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Analysis environment configuration
#[derive(Debug, Clone)]
pub struct AnalysisEnvConfig {
    /// Candles requested per timeframe
    pub candle_count: usize,
    /// Symbol used when the requested one cannot be normalized
    pub default_symbol: String,
    pub default_strategy: StrategyTier,
    pub quote_asset: String,
}

impl Default for AnalysisEnvConfig {
    fn default() -> Self {
        Self {
            candle_count: 100,
            default_symbol: "BTC".to_string(),
            default_strategy: StrategyTier::Short,
            quote_asset: "USDT".to_string(),
        }
    }
}

impl AnalysisEnvConfig {
    pub fn from_env() -> Result<Self> {
        let strategy_str = env::var("DEFAULT_STRATEGY").unwrap_or_else(|_| "short".to_string());
        let default_strategy = StrategyTier::from_str(&strategy_str)
            .context("Failed to parse DEFAULT_STRATEGY")?;

        Ok(Self {
            candle_count: env::var("CANDLE_COUNT")
                .unwrap_or_else(|_| "100".to_string())
                .parse::<usize>()
                .unwrap_or(100)
                .max(2),
            default_symbol: env::var("DEFAULT_SYMBOL").unwrap_or_else(|_| "BTC".to_string()),
            default_strategy,
            quote_asset: env::var("QUOTE_ASSET")
                .unwrap_or_else(|_| "USDT".to_string())
                .to_uppercase(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_config_defaults() {
        let config = AnalysisEnvConfig::default();
        assert_eq!(config.candle_count, 100);
        assert_eq!(config.default_symbol, "BTC");
        assert_eq!(config.default_strategy, StrategyTier::Short);
        assert_eq!(config.quote_asset, "USDT");
    }

    #[test]
    fn test_analysis_config_from_env_loads() {
        let config = AnalysisEnvConfig::from_env().unwrap();
        assert!(config.candle_count >= 2);
        assert!(!config.quote_asset.is_empty());
    }
}
