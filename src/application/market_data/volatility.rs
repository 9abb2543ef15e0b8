use crate::domain::market::candle::Candle;
use statrs::statistics::{Data, Distribution};

pub const DEFAULT_LOOKBACK: usize = 14;

/// Mean of (high - low) / close over the trailing `lookback` candles, as a
/// fraction of price. `None` when no candle in the window is usable.
pub fn recent_range_pct(series: &[Candle], lookback: usize) -> Option<f64> {
    let ranges: Vec<f64> = series
        .iter()
        .rev()
        .take(lookback)
        .filter(|c| c.close > 0.0 && c.high >= c.low)
        .map(|c| (c.high - c.low) / c.close)
        .filter(|r| r.is_finite())
        .collect();

    if ranges.is_empty() {
        return None;
    }
    Data::new(ranges).mean().filter(|m| m.is_finite())
}
