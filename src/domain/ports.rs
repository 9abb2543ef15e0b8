use crate::domain::dispatch::{DeliveryPayload, Destination};
use crate::domain::errors::{DataUnavailable, DeliveryError};
use crate::domain::market::candle::Candle;
use crate::domain::market::metrics::{FuturesMetrics, OnChainMetrics};
use crate::domain::market::symbol::TradingPair;
use crate::domain::market::timeframe::Timeframe;
use async_trait::async_trait;

/// Source of ordered (oldest first) candle series. Implementations own their
/// retries and report failure as `DataUnavailable`, never by panicking.
#[async_trait]
pub trait CandleSeriesProvider: Send + Sync {
    async fn fetch_series(
        &self,
        pair: &TradingPair,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataUnavailable>;
}

#[async_trait]
pub trait AuxiliaryMetricsProvider: Send + Sync {
    async fn futures_metrics(&self, pair: &TradingPair) -> Result<FuturesMetrics, DataUnavailable>;
    async fn onchain_metrics(&self, pair: &TradingPair) -> Result<OnChainMetrics, DataUnavailable>;
}

/// Outward transport used by delivery actions on the cooperative scheduler
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(
        &self,
        destination: &Destination,
        payload: &DeliveryPayload,
    ) -> Result<(), DeliveryError>;
}
