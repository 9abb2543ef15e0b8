//! Bot capability set.
//!
//! A bot is anything that can be initialized, run until stopped, analyze a
//! symbol on demand and change its default strategy. Variants are chosen by
//! configuration through [`BotFactory`], not by inheritance.

pub mod commands;
pub mod direct;
pub mod dispatching;
pub mod factory;

pub use direct::DirectBot;
pub use dispatching::DispatchingBot;
pub use crate::domain::bot_kind::BotKind;
pub use factory::{BotDeps, BotFactory};

use crate::application::analysis::orchestrator::AnalysisOrchestrator;
use crate::domain::analysis::{AnalysisFailure, AnalysisOutcome};
use crate::domain::errors::AnalysisError;
use crate::domain::market::strategy_tier::StrategyTier;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;

#[async_trait]
pub trait TradingBot: Send + Sync {
    fn kind(&self) -> BotKind;

    async fn initialize(&mut self) -> Result<()>;

    /// Runs until the input is exhausted or `stop` is called
    async fn run(&mut self) -> Result<()>;

    fn stop(&self);

    async fn analyze(&self, symbol: &str, strategy: &str) -> AnalysisOutcome;

    /// Unlike a per-request strategy, an unknown name here is an error and
    /// the current default is kept.
    fn change_strategy(&mut self, strategy: &str) -> Result<StrategyTier, AnalysisError>;

    fn strategy(&self) -> StrategyTier;

    fn stop_signal(&self) -> StopSignal;
}

/// Shared stop flag. Cloning hands out another trigger for the same bot.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for StopSignal {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

pub(crate) fn parse_strategy(strategy: &str) -> Result<StrategyTier, AnalysisError> {
    strategy
        .parse::<StrategyTier>()
        .map_err(|e| AnalysisError::InvalidInput {
            field: "strategy".to_string(),
            value: strategy.to_string(),
            reason: e.to_string(),
        })
}

/// Runs one analysis on the I/O runtime so the calling scheduler stays free
/// for delivery work.
pub(crate) async fn analyze_on(
    runtime: &Handle,
    orchestrator: &Arc<AnalysisOrchestrator>,
    symbol: &str,
    strategy: &str,
) -> AnalysisOutcome {
    let orchestrator = Arc::clone(orchestrator);
    let (owned_symbol, owned_strategy) = (symbol.to_string(), strategy.to_string());
    let task = runtime.spawn(async move { orchestrator.analyze(&owned_symbol, &owned_strategy).await });

    match task.await {
        Ok(outcome) => outcome,
        Err(e) => AnalysisOutcome::Failed(AnalysisFailure {
            symbol: symbol.to_string(),
            strategy: strategy.to_string(),
            reason: format!("analysis task failed: {}", e),
            notices: Vec::new(),
        }),
    }
}
