use async_trait::async_trait;
use coinsight::application::analysis::orchestrator::AnalysisOrchestrator;
use coinsight::application::bot::{BotDeps, BotFactory, BotKind, TradingBot};
use coinsight::config::{AnalysisEnvConfig, DispatchEnvConfig};
use coinsight::domain::analysis::AnalysisOutcome;
use coinsight::domain::dispatch::{DeliveryPayload, Destination, UserId};
use coinsight::domain::errors::DataUnavailable;
use coinsight::domain::market::candle::Candle;
use coinsight::domain::market::strategy_tier::StrategyTier;
use coinsight::domain::market::symbol::TradingPair;
use coinsight::domain::market::timeframe::Timeframe;
use coinsight::domain::ports::CandleSeriesProvider;
use coinsight::infrastructure::mock::{MockCandleProvider, MockMetricsProvider, RecordingSink};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

/// Holds every fetch until the test opens the gate
struct GatedCandleProvider {
    inner: MockCandleProvider,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl CandleSeriesProvider for GatedCandleProvider {
    async fn fetch_series(
        &self,
        pair: &TradingPair,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataUnavailable> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| DataUnavailable::new("gate", "closed"))?;
        self.inner.fetch_series(pair, timeframe, count).await
    }
}

fn deps(sink: Arc<RecordingSink>, dispatch: DispatchEnvConfig) -> BotDeps {
    deps_with(Arc::new(MockCandleProvider::new()), sink, dispatch)
}

fn deps_with(
    candles: Arc<dyn CandleSeriesProvider>,
    sink: Arc<RecordingSink>,
    dispatch: DispatchEnvConfig,
) -> BotDeps {
    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        candles,
        Arc::new(MockMetricsProvider::new()),
        AnalysisEnvConfig::default(),
    ));
    BotDeps {
        orchestrator,
        sink,
        runtime: Handle::current(),
        dispatch,
    }
}

fn dispatch_config() -> DispatchEnvConfig {
    DispatchEnvConfig {
        relay_poll_interval_ms: 5,
        console_user_id: 1,
        ..DispatchEnvConfig::default()
    }
}

fn texts_for(deliveries: &[(Destination, DeliveryPayload)], user: i64) -> Vec<String> {
    deliveries
        .iter()
        .filter(|(dest, _)| *dest == Destination::User(UserId(user)))
        .filter_map(|(_, payload)| match payload {
            DeliveryPayload::Text(text) => Some(text.clone()),
            DeliveryPayload::Outcome(_) => None,
        })
        .collect()
}

fn reports_for(deliveries: &[(Destination, DeliveryPayload)], user: i64) -> Vec<StrategyTier> {
    deliveries
        .iter()
        .filter(|(dest, _)| *dest == Destination::User(UserId(user)))
        .filter_map(|(_, payload)| match payload {
            DeliveryPayload::Outcome(AnalysisOutcome::Report(report)) => Some(report.strategy),
            _ => None,
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dispatching_bot_serves_line_commands() {
    let sink = Arc::new(RecordingSink::new());
    let input = "/help\n@5 /analyze ETH mid\n/strategy long\n/strategy scalp\n\n/status\n";
    let mut bot = BotFactory::dispatching(deps(sink.clone(), dispatch_config()))
        .unwrap()
        .with_input(Box::new(Cursor::new(input.as_bytes().to_vec())));

    bot.initialize().await.unwrap();
    tokio::time::timeout(Duration::from_secs(20), bot.run())
        .await
        .expect("bot did not stop after input closed")
        .unwrap();

    assert_eq!(bot.strategy(), StrategyTier::Long);

    let deliveries = sink.deliveries();
    let outcome = deliveries
        .iter()
        .find_map(|(dest, payload)| match payload {
            DeliveryPayload::Outcome(outcome) => Some((dest.clone(), outcome.clone())),
            DeliveryPayload::Text(_) => None,
        })
        .expect("analysis result delivered");
    assert_eq!(outcome.0, Destination::User(UserId(5)));
    match outcome.1 {
        AnalysisOutcome::Report(report) => {
            assert_eq!(report.symbol, "ETHUSDT");
            assert_eq!(report.strategy, StrategyTier::Mid);
        }
        AnalysisOutcome::Failed(f) => panic!("unexpected failure: {}", f.reason),
    }

    let user5 = texts_for(&deliveries, 5);
    assert_eq!(user5.len(), 1);
    assert!(user5[0].starts_with("Analyzing ETH (mid)"));

    let console = texts_for(&deliveries, 1);
    assert_eq!(console.len(), 4);
    assert!(console[0].starts_with("Commands:"));
    assert!(console[1].contains("Your strategy is now long"));
    assert!(console[2].contains("scalp"));
    assert!(console[3].contains("idle"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_strategy_choice_is_kept_per_user() {
    let sink = Arc::new(RecordingSink::new());
    let input = "@5 /strategy long\n@5 /status\n@7 /status\n@5 /analyze ETH\n@7 /analyze SOL\n";
    let mut bot = BotFactory::dispatching(deps(sink.clone(), dispatch_config()))
        .unwrap()
        .with_input(Box::new(Cursor::new(input.as_bytes().to_vec())));

    bot.initialize().await.unwrap();
    tokio::time::timeout(Duration::from_secs(20), bot.run())
        .await
        .expect("bot did not stop after input closed")
        .unwrap();

    assert_eq!(bot.strategy_for(UserId(5)), StrategyTier::Long);
    assert_eq!(bot.strategy_for(UserId(7)), StrategyTier::Short);
    assert_eq!(bot.strategy(), StrategyTier::Short);

    let deliveries = sink.deliveries();
    let user5 = texts_for(&deliveries, 5);
    assert_eq!(user5.len(), 3);
    assert!(user5[0].contains("Your strategy is now long"));
    assert!(user5[1].contains("Strategy long"));
    assert!(user5[2].starts_with("Analyzing ETH (long)"));

    let user7 = texts_for(&deliveries, 7);
    assert_eq!(user7.len(), 2);
    assert!(user7[0].contains("Strategy short"));
    assert!(user7[1].starts_with("Analyzing SOL (short)"));

    assert_eq!(reports_for(&deliveries, 5), vec![StrategyTier::Long]);
    assert_eq!(reports_for(&deliveries, 7), vec![StrategyTier::Short]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_still_delivers_admitted_results() {
    let gate = Arc::new(Semaphore::new(0));
    let candles = Arc::new(GatedCandleProvider {
        inner: MockCandleProvider::new(),
        gate: Arc::clone(&gate),
    });
    let sink = Arc::new(RecordingSink::new());
    // The writer stays open, so only the stop signal ends the command loop
    let (mut writer, reader) = tokio::io::duplex(256);
    let mut bot = BotFactory::dispatching(deps_with(candles, sink.clone(), dispatch_config()))
        .unwrap()
        .with_input(Box::new(BufReader::new(reader)));
    let stop = bot.stop_signal();
    let dispatcher = Arc::clone(bot.dispatcher());

    bot.initialize().await.unwrap();
    writer.write_all(b"/analyze BTC\n").await.unwrap();

    let stop_mid_job = async {
        while dispatcher.in_flight() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        stop.trigger();
        tokio::time::sleep(Duration::from_millis(100)).await;
        gate.add_permits(64);
    };
    let (result, ()) = tokio::time::timeout(Duration::from_secs(20), async {
        tokio::join!(bot.run(), stop_mid_job)
    })
    .await
    .expect("bot did not stop after the job finished");
    result.unwrap();
    drop(writer);

    assert_eq!(dispatcher.in_flight(), 0);
    assert_eq!(reports_for(&sink.deliveries(), 1), vec![StrategyTier::Short]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_direct_bot_delivers_each_watched_symbol() {
    let sink = Arc::new(RecordingSink::new());
    let config = DispatchEnvConfig {
        watchlist: vec!["BTC".to_string(), "ETH".to_string(), "SOL".to_string()],
        ..dispatch_config()
    };
    let mut bot = BotFactory::create(BotKind::Direct, deps(sink.clone(), config)).unwrap();
    assert_eq!(bot.kind(), BotKind::Direct);

    assert_eq!(bot.change_strategy("mid").unwrap(), StrategyTier::Mid);
    assert!(bot.change_strategy("hodl").is_err());
    assert_eq!(bot.strategy(), StrategyTier::Mid);

    bot.initialize().await.unwrap();
    bot.run().await.unwrap();

    let symbols: Vec<String> = sink
        .deliveries()
        .into_iter()
        .filter_map(|(_, payload)| match payload {
            DeliveryPayload::Outcome(AnalysisOutcome::Report(report)) => {
                assert_eq!(report.strategy, StrategyTier::Mid);
                Some(report.symbol.clone())
            }
            _ => None,
        })
        .collect();
    assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stopped_bot_does_no_work() {
    let sink = Arc::new(RecordingSink::new());
    let mut bot = BotFactory::create(BotKind::Direct, deps(sink.clone(), dispatch_config())).unwrap();

    bot.stop();
    bot.run().await.unwrap();
    assert_eq!(sink.count(), 0);

    let outcome = bot.analyze("BTC", "short").await;
    assert!(!outcome.is_failure());
}
