use crate::application::analysis::orchestrator::AnalysisOrchestrator;
use crate::application::bot::commands::{BotCommand, CommandLine, HELP_TEXT, parse_line};
use crate::application::bot::{BotKind, StopSignal, TradingBot, analyze_on, parse_strategy};
use crate::application::dispatch::dispatcher::{AnalysisDispatcher, delivery_action};
use crate::application::dispatch::relay::{RelayConsumer, RelaySender};
use crate::domain::analysis::AnalysisOutcome;
use crate::domain::dispatch::{Admission, DeliveryPayload, Destination, UserId};
use crate::domain::errors::AnalysisError;
use crate::domain::market::strategy_tier::StrategyTier;
use crate::domain::ports::DeliverySink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub type CommandInput = Box<dyn AsyncBufRead + Send + Unpin>;

/// Line-command front end over the dispatcher.
///
/// Commands are submitted to the worker pool; every reply, including busy
/// rejections and help text, goes through the relay so that all outward I/O
/// happens on the scheduler running [`TradingBot::run`].
pub struct DispatchingBot {
    dispatcher: Arc<AnalysisDispatcher>,
    orchestrator: Arc<AnalysisOrchestrator>,
    runtime: Handle,
    relay: RelaySender,
    consumer: Option<RelayConsumer>,
    sink: Arc<dyn DeliverySink>,
    input: Mutex<Option<CommandInput>>,
    default_user: UserId,
    default_symbol: String,
    default_strategy: StrategyTier,
    /// Per-user choice made with /strategy; users without an entry get the
    /// configured default
    strategies: HashMap<UserId, StrategyTier>,
    stop: StopSignal,
}

impl DispatchingBot {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dispatcher: Arc<AnalysisDispatcher>,
        orchestrator: Arc<AnalysisOrchestrator>,
        runtime: Handle,
        relay: RelaySender,
        consumer: RelayConsumer,
        sink: Arc<dyn DeliverySink>,
        default_user: UserId,
    ) -> Self {
        let config = orchestrator.config();
        let default_symbol = config.default_symbol.clone();
        let default_strategy = config.default_strategy;
        Self {
            dispatcher,
            orchestrator,
            runtime,
            relay,
            consumer: Some(consumer),
            sink,
            input: Mutex::new(None),
            default_user,
            default_symbol,
            default_strategy,
            strategies: HashMap::new(),
            stop: StopSignal::new(),
        }
    }

    /// Reads commands from `input` instead of stdin
    pub fn with_input(self, input: CommandInput) -> Self {
        if let Ok(mut slot) = self.input.lock() {
            *slot = Some(input);
        }
        self
    }

    pub fn dispatcher(&self) -> &Arc<AnalysisDispatcher> {
        &self.dispatcher
    }

    pub fn strategy_for(&self, user_id: UserId) -> StrategyTier {
        self.strategies
            .get(&user_id)
            .copied()
            .unwrap_or(self.default_strategy)
    }

    fn set_strategy(&mut self, user_id: UserId, strategy: &str) -> Result<StrategyTier, AnalysisError> {
        let tier = parse_strategy(strategy)?;
        info!(
            "DispatchingBot: Strategy for user {} {} -> {}",
            user_id,
            self.strategy_for(user_id),
            tier
        );
        self.strategies.insert(user_id, tier);
        Ok(tier)
    }

    /// Handles one command line. Replies are queued on the relay.
    pub fn handle_line(&mut self, line: &str) {
        let Some(CommandLine { user_id, command }) = parse_line(line, self.default_user) else {
            return;
        };
        let reply_to = Destination::User(user_id);

        match command {
            BotCommand::Analyze { symbol, strategy } => {
                let symbol = symbol.unwrap_or_else(|| self.default_symbol.clone());
                let strategy = strategy.unwrap_or_else(|| self.strategy_for(user_id).to_string());
                match self.dispatcher.submit_analysis(user_id, &symbol, &strategy) {
                    Admission::Admitted { job_id } => {
                        debug!("DispatchingBot: Job {} queued for user {}", job_id, user_id);
                        self.reply(
                            reply_to,
                            format!("Analyzing {} ({}), results will follow.", symbol, strategy),
                        );
                    }
                    Admission::RejectedBusy => {
                        self.reply(
                            reply_to,
                            "You already have an analysis running. Please wait for it to finish."
                                .to_string(),
                        );
                    }
                }
            }
            BotCommand::Strategy(name) => {
                let text = match self.set_strategy(user_id, &name) {
                    Ok(tier) => {
                        let timeframes: Vec<String> =
                            tier.timeframes().iter().map(|tf| tf.to_string()).collect();
                        format!("Your strategy is now {} ({}).", tier, timeframes.join("/"))
                    }
                    Err(e) => format!("{}. Choose short, mid or long.", e),
                };
                self.reply(reply_to, text);
            }
            BotCommand::Status => {
                let state = if self.dispatcher.is_busy(user_id) {
                    "running"
                } else {
                    "idle"
                };
                let text = format!(
                    "User {}: {}. Strategy {}. Jobs in flight: {}.",
                    user_id,
                    state,
                    self.strategy_for(user_id),
                    self.dispatcher.in_flight()
                );
                self.reply(reply_to, text);
            }
            BotCommand::Help => self.reply(reply_to, HELP_TEXT.to_string()),
            BotCommand::Unknown(raw) => {
                self.reply(reply_to, format!("Unknown command: {}\n{}", raw, HELP_TEXT));
            }
        }
    }

    fn reply(&self, destination: Destination, text: String) {
        let label = format!("reply -> {}", destination);
        let action = delivery_action(
            Arc::clone(&self.sink),
            destination,
            DeliveryPayload::Text(text),
            label,
        );
        if let Err(action) = self.relay.enqueue(action) {
            warn!("DispatchingBot: Relay closed, dropped {}", action.label());
        }
    }

    async fn read_commands(&mut self, input: CommandInput) -> Result<()> {
        let mut lines = input.lines();
        let mut stop_rx = self.stop.subscribe();

        loop {
            if *stop_rx.borrow() {
                break;
            }
            tokio::select! {
                line = lines.next_line() => {
                    match line.context("Failed to read command input")? {
                        Some(line) => self.handle_line(&line),
                        None => {
                            info!("DispatchingBot: Input closed");
                            break;
                        }
                    }
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Admitted jobs are never cancelled; wait for them so their results
    /// still reach the relay before it shuts down.
    async fn wait_for_in_flight(&self, poll: Duration) {
        let mut waited = false;
        while self.dispatcher.in_flight() > 0 {
            if !waited {
                info!(
                    "DispatchingBot: Waiting for {} in-flight jobs",
                    self.dispatcher.in_flight()
                );
                waited = true;
            }
            tokio::time::sleep(poll).await;
        }
    }
}

#[async_trait]
impl TradingBot for DispatchingBot {
    fn kind(&self) -> BotKind {
        BotKind::Dispatch
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.consumer.is_none() {
            anyhow::bail!("DispatchingBot: Relay consumer already used; build a new bot");
        }
        info!(
            "DispatchingBot: Ready (default user {}, strategy {}, symbol {})",
            self.default_user, self.default_strategy, self.default_symbol
        );
        Ok(())
    }

    async fn run(&mut self) -> Result<()> {
        let consumer = self
            .consumer
            .take()
            .context("DispatchingBot: run() called twice")?;
        let poll = consumer.poll_interval();

        let input = self
            .input
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .unwrap_or_else(|| Box::new(BufReader::new(tokio::io::stdin())));

        // The relay outlives the stop signal until admitted jobs have
        // enqueued their results.
        let (relay_stop_tx, relay_stop_rx) = watch::channel(false);
        let relay_task = consumer.run(relay_stop_rx);
        let stop = self.stop.clone();
        let command_task = async {
            let result = self.read_commands(input).await;
            self.wait_for_in_flight(poll).await;
            stop.trigger();
            relay_stop_tx.send_replace(true);
            result
        };

        let (stats, result) = tokio::join!(relay_task, command_task);
        info!(
            "DispatchingBot: Stopped ({} delivered, {} failed)",
            stats.delivered, stats.failed
        );
        result
    }

    fn stop(&self) {
        self.stop.trigger();
    }

    async fn analyze(&self, symbol: &str, strategy: &str) -> AnalysisOutcome {
        analyze_on(&self.runtime, &self.orchestrator, symbol, strategy).await
    }

    /// Applies to the console user
    fn change_strategy(&mut self, strategy: &str) -> Result<StrategyTier, AnalysisError> {
        self.set_strategy(self.default_user, strategy)
    }

    fn strategy(&self) -> StrategyTier {
        self.strategy_for(self.default_user)
    }

    fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }
}
