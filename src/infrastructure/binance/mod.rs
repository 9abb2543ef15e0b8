//! Binance REST adapters for spot klines and USDⓈ-M futures metrics.

pub mod futures;
pub mod klines;

pub use futures::BinanceMetricsProvider;
pub use klines::BinanceCandleProvider;
