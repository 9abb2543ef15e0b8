//! In-memory providers and sinks for tests and offline runs.

use crate::domain::dispatch::{DeliveryPayload, Destination};
use crate::domain::errors::{DataUnavailable, DeliveryError};
use crate::domain::market::candle::Candle;
use crate::domain::market::metrics::{FuturesMetrics, OnChainMetrics};
use crate::domain::market::symbol::TradingPair;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{AuxiliaryMetricsProvider, CandleSeriesProvider, DeliverySink};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Synthetic candle source. Series are a seeded random walk, so the same
/// (pair, timeframe, count) always yields the same candles.
#[derive(Default)]
pub struct MockCandleProvider {
    fixed: HashMap<Timeframe, Vec<Candle>>,
    unavailable: HashSet<Timeframe>,
    all_unavailable: bool,
    drift: f64,
    calls: AtomicUsize,
    requested: Mutex<Vec<Timeframe>>,
}

impl MockCandleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `series` verbatim for `timeframe`
    pub fn with_series(mut self, timeframe: Timeframe, series: Vec<Candle>) -> Self {
        self.fixed.insert(timeframe, series);
        self
    }

    pub fn with_unavailable(mut self, timeframe: Timeframe) -> Self {
        self.unavailable.insert(timeframe);
        self
    }

    pub fn all_unavailable(mut self) -> Self {
        self.all_unavailable = true;
        self
    }

    /// Per-candle drift of the random walk, as a fraction of price
    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Timeframes requested so far, in call order
    pub fn requested(&self) -> Vec<Timeframe> {
        self.requested
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn synthesize(&self, pair: &TradingPair, timeframe: Timeframe, count: usize) -> Vec<Candle> {
        let mut hasher = DefaultHasher::new();
        pair.symbol().hash(&mut hasher);
        timeframe.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());

        let step = timeframe.to_millis();
        let start = 1_700_000_000_000i64 - step * count as i64;
        let mut close = rng.random_range(20.0..60_000.0);

        (0..count)
            .map(|i| {
                let open = close;
                let change = self.drift + rng.random_range(-0.01..0.01);
                close = (open * (1.0 + change)).max(0.0001);
                let high = open.max(close) * (1.0 + rng.random_range(0.0..0.004));
                let low = open.min(close) * (1.0 - rng.random_range(0.0..0.004));
                let volume = rng.random_range(500.0..1_500.0);
                Candle::new(start + step * i as i64, open, high, low, close, volume)
            })
            .collect()
    }
}

#[async_trait]
impl CandleSeriesProvider for MockCandleProvider {
    async fn fetch_series(
        &self,
        pair: &TradingPair,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataUnavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(timeframe);
        }
        if self.all_unavailable || self.unavailable.contains(&timeframe) {
            return Err(DataUnavailable::new(
                format!("{} {} candles", pair, timeframe),
                "mock provider configured as unavailable",
            ));
        }
        if let Some(series) = self.fixed.get(&timeframe) {
            let skip = series.len().saturating_sub(count);
            return Ok(series[skip..].to_vec());
        }
        debug!("MockCandleProvider: Synthesizing {} {} x{}", pair, timeframe, count);
        Ok(self.synthesize(pair, timeframe, count))
    }
}

pub struct MockMetricsProvider {
    futures: Option<FuturesMetrics>,
    onchain: Option<OnChainMetrics>,
}

impl Default for MockMetricsProvider {
    fn default() -> Self {
        Self {
            futures: Some(FuturesMetrics {
                open_interest: Some(85_000.0),
                funding_rate: Some(0.0001),
                long_short_ratio: Some(1.05),
            }),
            onchain: Some(OnChainMetrics {
                mvrv_z: Some(0.8),
                nvt: Some(45.0),
            }),
        }
    }
}

impl MockMetricsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_futures(mut self, metrics: Option<FuturesMetrics>) -> Self {
        self.futures = metrics;
        self
    }

    pub fn with_onchain(mut self, metrics: Option<OnChainMetrics>) -> Self {
        self.onchain = metrics;
        self
    }
}

#[async_trait]
impl AuxiliaryMetricsProvider for MockMetricsProvider {
    async fn futures_metrics(&self, pair: &TradingPair) -> Result<FuturesMetrics, DataUnavailable> {
        self.futures
            .clone()
            .ok_or_else(|| DataUnavailable::new(format!("{} futures metrics", pair), "not configured"))
    }

    async fn onchain_metrics(&self, pair: &TradingPair) -> Result<OnChainMetrics, DataUnavailable> {
        self.onchain
            .clone()
            .ok_or_else(|| DataUnavailable::new(format!("{} on-chain metrics", pair), "not configured"))
    }
}

/// Sink that records every delivery. Destinations listed in `failing` error out.
#[derive(Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<(Destination, DeliveryPayload)>>,
    failing: HashSet<Destination>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, destination: Destination) -> Self {
        self.failing.insert(destination);
        self
    }

    pub fn deliveries(&self) -> Vec<(Destination, DeliveryPayload)> {
        self.deliveries
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.deliveries.lock().map(|d| d.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn deliver(
        &self,
        destination: &Destination,
        payload: &DeliveryPayload,
    ) -> Result<(), DeliveryError> {
        if self.failing.contains(destination) {
            return Err(DeliveryError::Transport {
                destination: destination.to_string(),
                reason: "mock transport failure".to_string(),
            });
        }
        let mut deliveries = self.deliveries.lock().map_err(|_| DeliveryError::Rejected {
            destination: destination.to_string(),
            reason: "recording sink poisoned".to_string(),
        })?;
        deliveries.push((destination.clone(), payload.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TradingPair {
        TradingPair::parse("BTC", "USDT").unwrap()
    }

    #[tokio::test]
    async fn test_synthetic_series_is_deterministic() {
        let provider = MockCandleProvider::new();
        let a = provider.fetch_series(&pair(), Timeframe::OneHour, 50).await.unwrap();
        let b = provider.fetch_series(&pair(), Timeframe::OneHour, 50).await.unwrap();
        assert_eq!(a.len(), 50);
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(a.iter().all(|c| c.high >= c.low && c.close > 0.0));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_timeframe() {
        let provider = MockCandleProvider::new().with_unavailable(Timeframe::FourHour);
        assert!(provider.fetch_series(&pair(), Timeframe::FourHour, 10).await.is_err());
        assert!(provider.fetch_series(&pair(), Timeframe::OneHour, 10).await.is_ok());
    }

    #[tokio::test]
    async fn test_fixed_series_is_truncated_to_count() {
        let series: Vec<Candle> = (0..10)
            .map(|i| Candle::new(i, 1.0, 1.0, 1.0, 1.0 + i as f64, 1.0))
            .collect();
        let provider = MockCandleProvider::new().with_series(Timeframe::OneDay, series);
        let got = provider.fetch_series(&pair(), Timeframe::OneDay, 3).await.unwrap();
        assert_eq!(got.iter().map(|c| c.timestamp).collect::<Vec<_>>(), vec![7, 8, 9]);
    }

    #[tokio::test]
    async fn test_recording_sink() {
        let sink = RecordingSink::new().failing_for(Destination::Chat(9));
        let payload = DeliveryPayload::Text("hello".to_string());
        sink.deliver(&Destination::Chat(1), &payload).await.unwrap();
        assert!(sink.deliver(&Destination::Chat(9), &payload).await.is_err());
        assert_eq!(sink.count(), 1);
    }
}
