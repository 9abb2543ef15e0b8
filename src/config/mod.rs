//! Configuration module for Coinsight.
//!
//! Loads structured configuration from environment variables, organized by
//! area: Analysis, Dispatch, Provider, and Observability.

mod analysis_config;
mod dispatch_config;
mod observability_config;
mod provider_config;

pub use analysis_config::AnalysisEnvConfig;
pub use dispatch_config::DispatchEnvConfig;
pub use observability_config::{LogFormat, ObservabilityEnvConfig, OutputFormat};
pub use provider_config::ProviderEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Where candles and auxiliary metrics come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    Mock,
    Binance,
}

impl FromStr for ProviderMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(ProviderMode::Mock),
            "binance" => Ok(ProviderMode::Binance),
            _ => anyhow::bail!("Invalid DATA_PROVIDER: {}. Must be 'mock' or 'binance'", s),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider_mode: ProviderMode,
    pub analysis: AnalysisEnvConfig,
    pub dispatch: DispatchEnvConfig,
    pub provider: ProviderEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_mode: ProviderMode::Mock,
            analysis: AnalysisEnvConfig::default(),
            dispatch: DispatchEnvConfig::default(),
            provider: ProviderEnvConfig::default(),
            observability: ObservabilityEnvConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        let mode_str = env::var("DATA_PROVIDER").unwrap_or_else(|_| "mock".to_string());
        let provider_mode = ProviderMode::from_str(&mode_str)?;

        Ok(Self {
            provider_mode,
            analysis: AnalysisEnvConfig::from_env().context("Failed to load analysis config")?,
            dispatch: DispatchEnvConfig::from_env().context("Failed to load dispatch config")?,
            provider: ProviderEnvConfig::from_env(),
            observability: ObservabilityEnvConfig::from_env()
                .context("Failed to load observability config")?,
        })
    }
}
