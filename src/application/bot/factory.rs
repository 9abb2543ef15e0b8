use crate::application::analysis::orchestrator::AnalysisOrchestrator;
use crate::application::bot::{BotKind, DirectBot, DispatchingBot, TradingBot};
use crate::application::dispatch::dispatcher::AnalysisDispatcher;
use crate::application::dispatch::relay::ResultRelay;
use crate::config::DispatchEnvConfig;
use crate::domain::dispatch::{Destination, UserId};
use crate::domain::ports::DeliverySink;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

/// Everything a bot variant may need
pub struct BotDeps {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub sink: Arc<dyn DeliverySink>,
    /// Multi-threaded runtime for provider I/O, separate from the scheduler
    /// the bot itself runs on
    pub runtime: Handle,
    pub dispatch: DispatchEnvConfig,
}

pub struct BotFactory;

impl BotFactory {
    pub fn create(kind: BotKind, deps: BotDeps) -> Result<Box<dyn TradingBot>> {
        info!("BotFactory: Building {} bot", kind);
        let user = UserId(deps.dispatch.console_user_id);

        match kind {
            BotKind::Direct => Ok(Box::new(DirectBot::new(
                deps.orchestrator,
                deps.sink,
                deps.runtime,
                deps.dispatch.watchlist.clone(),
                Destination::User(user),
            ))),
            BotKind::Dispatch => Ok(Box::new(Self::dispatching(deps)?)),
        }
    }

    /// The dispatching variant, concrete so callers can attach an input
    pub fn dispatching(deps: BotDeps) -> Result<DispatchingBot> {
        let (relay_tx, relay_rx) = ResultRelay::channel(deps.dispatch.relay_poll_interval());
        let dispatcher = AnalysisDispatcher::new(
            Arc::clone(&deps.orchestrator),
            relay_tx.clone(),
            Arc::clone(&deps.sink),
            deps.dispatch.worker_pool_size,
            deps.runtime.clone(),
        )
        .context("Failed to build analysis dispatcher")?;

        Ok(DispatchingBot::new(
            Arc::new(dispatcher),
            deps.orchestrator,
            deps.runtime,
            relay_tx,
            relay_rx,
            deps.sink,
            UserId(deps.dispatch.console_user_id),
        ))
    }
}
