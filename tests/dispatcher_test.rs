use async_trait::async_trait;
use coinsight::application::analysis::orchestrator::AnalysisOrchestrator;
use coinsight::application::dispatch::dispatcher::AnalysisDispatcher;
use coinsight::application::dispatch::relay::{RelayConsumer, ResultRelay};
use coinsight::config::AnalysisEnvConfig;
use coinsight::domain::analysis::AnalysisOutcome;
use coinsight::domain::dispatch::{Admission, AnalysisRequest, DeliveryPayload, Destination, UserId};
use coinsight::domain::errors::{DataUnavailable, DispatchError};
use coinsight::domain::market::candle::Candle;
use coinsight::domain::market::symbol::TradingPair;
use coinsight::domain::market::timeframe::Timeframe;
use coinsight::domain::ports::CandleSeriesProvider;
use coinsight::infrastructure::mock::{MockCandleProvider, MockMetricsProvider, RecordingSink};
use std::sync::{Arc, Barrier};
use std::time::Duration;
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

struct PanickingCandleProvider;

#[async_trait]
impl CandleSeriesProvider for PanickingCandleProvider {
    async fn fetch_series(
        &self,
        _pair: &TradingPair,
        _timeframe: Timeframe,
        _count: usize,
    ) -> Result<Vec<Candle>, DataUnavailable> {
        panic!("provider bug")
    }
}

fn build(
    candles: Arc<dyn CandleSeriesProvider>,
    sink: Arc<RecordingSink>,
) -> (Arc<AnalysisDispatcher>, RelayConsumer) {
    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        candles,
        Arc::new(MockMetricsProvider::new()),
        AnalysisEnvConfig::default(),
    ));
    let (relay_tx, relay_rx) = ResultRelay::channel(Duration::from_millis(10));
    let dispatcher =
        AnalysisDispatcher::new(orchestrator, relay_tx, sink, 4, Handle::current()).unwrap();
    (Arc::new(dispatcher), relay_rx)
}

/// Drains the relay until `expected` actions have run
async fn drain_until(consumer: &mut RelayConsumer, expected: usize) {
    let mut handled = 0;
    tokio::time::timeout(Duration::from_secs(20), async {
        while handled < expected {
            handled += consumer.drain_ready().await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("relay never received the expected deliveries");
}

async fn wait_until_free(dispatcher: &AnalysisDispatcher, user: UserId) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while dispatcher.is_busy(user) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("user lock was never released");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_submissions_for_one_user_admit_exactly_one() {
    let gate = Arc::new(Semaphore::new(0));
    let candles = Arc::new(GatedCandleProvider {
        inner: MockCandleProvider::new(),
        gate: gate.clone(),
    });
    let sink = Arc::new(RecordingSink::new());
    let (dispatcher, mut consumer) = build(candles, sink.clone());
    let user = UserId(7);

    let barrier = Arc::new(Barrier::new(2));
    let attempts: Vec<_> = (0..2)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            let barrier = barrier.clone();
            tokio::task::spawn_blocking(move || {
                barrier.wait();
                dispatcher.submit_analysis(user, "BTC", "short")
            })
        })
        .collect();

    let mut admissions = Vec::new();
    for attempt in attempts {
        admissions.push(attempt.await.unwrap());
    }
    let admitted = admissions.iter().filter(|a| a.is_admitted()).count();
    let rejected = admissions
        .iter()
        .filter(|a| **a == Admission::RejectedBusy)
        .count();
    assert_eq!(admitted, 1);
    assert_eq!(rejected, 1);
    assert!(dispatcher.is_busy(user));

    // Another user is independent
    assert!(dispatcher.submit_analysis(UserId(8), "ETH", "mid").is_admitted());
    assert_eq!(dispatcher.in_flight(), 2);

    gate.add_permits(1_000);
    drain_until(&mut consumer, 2).await;
    wait_until_free(&dispatcher, user).await;

    // Exactly one delivery per admitted job, none for the rejected one
    let deliveries = sink.deliveries();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(
        deliveries
            .iter()
            .filter(|(dest, _)| *dest == Destination::User(user))
            .count(),
        1
    );

    assert!(dispatcher.submit_analysis(user, "BTC", "short").is_admitted());
    drain_until(&mut consumer, 1).await;
    assert_eq!(sink.count(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failure_marker_releases_the_user() {
    let candles = Arc::new(MockCandleProvider::new().all_unavailable());
    let sink = Arc::new(RecordingSink::new());
    let (dispatcher, mut consumer) = build(candles, sink.clone());
    let user = UserId(3);

    assert!(dispatcher.submit_analysis(user, "BTC", "long").is_admitted());
    drain_until(&mut consumer, 1).await;
    wait_until_free(&dispatcher, user).await;

    let deliveries = sink.deliveries();
    assert!(matches!(
        &deliveries[0].1,
        DeliveryPayload::Outcome(AnalysisOutcome::Failed(_))
    ));
    assert!(dispatcher.submit_analysis(user, "BTC", "long").is_admitted());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_job_still_delivers_and_releases() {
    let sink = Arc::new(RecordingSink::new());
    let (dispatcher, mut consumer) = build(Arc::new(PanickingCandleProvider), sink.clone());
    let user = UserId(11);

    assert!(dispatcher.submit_analysis(user, "BTC", "short").is_admitted());
    drain_until(&mut consumer, 1).await;
    wait_until_free(&dispatcher, user).await;

    match &sink.deliveries()[0].1 {
        DeliveryPayload::Outcome(AnalysisOutcome::Failed(failure)) => {
            assert!(failure.reason.contains("provider bug"));
        }
        other => panic!("expected failure marker, got {:?}", other),
    }
    assert_eq!(dispatcher.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_try_submit_reports_admission_conflict() {
    let gate = Arc::new(Semaphore::new(0));
    let candles = Arc::new(GatedCandleProvider {
        inner: MockCandleProvider::new(),
        gate: gate.clone(),
    });
    let sink = Arc::new(RecordingSink::new());
    let (dispatcher, mut consumer) = build(candles, sink.clone());

    let chat = Destination::Chat(-1001);
    let first = AnalysisRequest::new(UserId(5), "SOL", "mid").reply_to(chat.clone());
    assert!(dispatcher.try_submit(first).is_ok());

    let err = dispatcher
        .try_submit(AnalysisRequest::new(UserId(5), "SOL", "mid"))
        .unwrap_err();
    assert!(matches!(err, DispatchError::AdmissionConflict { user_id: 5 }));

    gate.add_permits(1_000);
    drain_until(&mut consumer, 1).await;
    assert_eq!(sink.deliveries()[0].0, chat);
}
