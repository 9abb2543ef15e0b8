use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coinsight::application::analysis::orchestrator::AnalysisOrchestrator;
use coinsight::application::bot::{BotDeps, BotFactory, BotKind, TradingBot};
use coinsight::config::{Config, ProviderMode};
use coinsight::domain::dispatch::{DeliveryPayload, Destination, UserId};
use coinsight::domain::ports::{AuxiliaryMetricsProvider, CandleSeriesProvider, DeliverySink};
use coinsight::infrastructure::ConsoleSink;
use coinsight::infrastructure::binance::{BinanceCandleProvider, BinanceMetricsProvider};
use coinsight::infrastructure::logging::init_logging;
use coinsight::infrastructure::mock::{MockCandleProvider, MockMetricsProvider};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about = "Multi-timeframe crypto signal analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one symbol and print the report
    Analyze {
        /// Base asset or full pair, e.g. BTC or ETH/USDT
        symbol: String,

        /// Strategy tier (short, mid, long)
        #[arg(short, long)]
        strategy: Option<String>,
    },
    /// Serve line commands from stdin through the dispatcher
    Serve,
    /// Analyze the configured watch list once
    Watch,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    init_logging(config.observability.log_format);

    info!("Coinsight v{} starting ({:?} data)", env!("CARGO_PKG_VERSION"), config.provider_mode);

    // Provider I/O and analysis run here; the bot's own scheduler only delivers
    let io_runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("coinsight-io")
        .enable_all()
        .build()
        .context("Failed to build I/O runtime")?;

    let (candles, metrics): (Arc<dyn CandleSeriesProvider>, Arc<dyn AuxiliaryMetricsProvider>) =
        match config.provider_mode {
            ProviderMode::Mock => {
                info!("Using mock market data");
                (
                    Arc::new(MockCandleProvider::new()),
                    Arc::new(MockMetricsProvider::new()),
                )
            }
            ProviderMode::Binance => {
                info!("Using Binance market data ({})", config.provider.binance_spot_url);
                (
                    Arc::new(BinanceCandleProvider::new(&config.provider)),
                    Arc::new(BinanceMetricsProvider::new(&config.provider)),
                )
            }
        };

    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        candles,
        metrics,
        config.analysis.clone(),
    ));
    let sink: Arc<dyn DeliverySink> = Arc::new(ConsoleSink::new(config.observability.output_format));

    let kind = match &cli.command {
        Some(Commands::Serve) => BotKind::Dispatch,
        Some(Commands::Watch) | Some(Commands::Analyze { .. }) => BotKind::Direct,
        None => config.dispatch.bot_mode,
    };

    let deps = BotDeps {
        orchestrator,
        sink: Arc::clone(&sink),
        runtime: io_runtime.handle().clone(),
        dispatch: config.dispatch.clone(),
    };
    let mut bot = BotFactory::create(kind, deps)?;

    let scheduler = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build delivery scheduler")?;

    let result = scheduler.block_on(async {
        bot.initialize().await?;

        if let Some(Commands::Analyze { symbol, strategy }) = &cli.command {
            let strategy = strategy
                .clone()
                .unwrap_or_else(|| bot.strategy().to_string());
            let outcome = bot.analyze(symbol, &strategy).await;
            let failed = outcome.is_failure();
            let destination = Destination::User(UserId(config.dispatch.console_user_id));
            sink.deliver(&destination, &DeliveryPayload::Outcome(outcome))
                .await
                .context("Failed to print analysis")?;
            if failed {
                anyhow::bail!("Analysis of {} failed", symbol);
            }
            return Ok(());
        }

        let stop = bot.stop_signal();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping");
                stop.trigger();
            }
        });

        bot.run().await
    });

    // A pending stdin read would otherwise hold the scheduler open
    scheduler.shutdown_background();

    if let Err(e) = &result {
        error!("Coinsight stopped with error: {:#}", e);
    }
    io_runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    info!("Coinsight stopped");
    result
}
