pub mod candle;
pub mod metrics;
pub mod strategy_tier;
pub mod symbol;
pub mod timeframe;
