use crate::application::analysis::orchestrator::AnalysisOrchestrator;
use crate::application::bot::{BotKind, StopSignal, TradingBot, analyze_on, parse_strategy};
use crate::domain::analysis::AnalysisOutcome;
use crate::domain::dispatch::{DeliveryPayload, Destination};
use crate::domain::errors::AnalysisError;
use crate::domain::market::strategy_tier::StrategyTier;
use crate::domain::ports::DeliverySink;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Analyzes a fixed watch list and hands each outcome straight to the sink.
/// No admission control: there is a single caller.
pub struct DirectBot {
    orchestrator: Arc<AnalysisOrchestrator>,
    sink: Arc<dyn DeliverySink>,
    runtime: Handle,
    watchlist: Vec<String>,
    strategy: StrategyTier,
    destination: Destination,
    stop: StopSignal,
    initialized: bool,
}

impl DirectBot {
    pub fn new(
        orchestrator: Arc<AnalysisOrchestrator>,
        sink: Arc<dyn DeliverySink>,
        runtime: Handle,
        watchlist: Vec<String>,
        destination: Destination,
    ) -> Self {
        let strategy = orchestrator.config().default_strategy;
        Self {
            orchestrator,
            sink,
            runtime,
            watchlist,
            strategy,
            destination,
            stop: StopSignal::new(),
            initialized: false,
        }
    }

    pub fn watchlist(&self) -> &[String] {
        &self.watchlist
    }
}

#[async_trait]
impl TradingBot for DirectBot {
    fn kind(&self) -> BotKind {
        BotKind::Direct
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.watchlist.is_empty() {
            let fallback = self.orchestrator.config().default_symbol.clone();
            warn!("DirectBot: Empty watch list, using {}", fallback);
            self.watchlist.push(fallback);
        }
        info!(
            "DirectBot: Ready ({} symbols, strategy {}) -> {}",
            self.watchlist.len(),
            self.strategy,
            self.destination
        );
        self.initialized = true;
        Ok(())
    }

    async fn run(&mut self) -> Result<()> {
        if !self.initialized {
            self.initialize().await?;
        }

        let strategy = self.strategy.to_string();
        let mut failed = 0usize;
        for symbol in &self.watchlist {
            if self.stop.is_triggered() {
                info!("DirectBot: Stop requested, skipping remaining symbols");
                break;
            }

            let outcome = self.analyze(symbol, &strategy).await;
            if let Err(e) = self
                .sink
                .deliver(&self.destination, &DeliveryPayload::Outcome(outcome))
                .await
            {
                failed += 1;
                warn!("DirectBot [{}]: Delivery failed: {}", symbol, e);
            }
        }

        info!(
            "DirectBot: Finished {} symbols ({} delivery failures)",
            self.watchlist.len(),
            failed
        );
        Ok(())
    }

    fn stop(&self) {
        self.stop.trigger();
    }

    async fn analyze(&self, symbol: &str, strategy: &str) -> AnalysisOutcome {
        analyze_on(&self.runtime, &self.orchestrator, symbol, strategy).await
    }

    fn change_strategy(&mut self, strategy: &str) -> Result<StrategyTier, AnalysisError> {
        let tier = parse_strategy(strategy)?;
        info!("DirectBot: Strategy {} -> {}", self.strategy, tier);
        self.strategy = tier;
        Ok(tier)
    }

    fn strategy(&self) -> StrategyTier {
        self.strategy
    }

    fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }
}
