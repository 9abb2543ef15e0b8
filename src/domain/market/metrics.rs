use serde::{Deserialize, Serialize};

/// Perpetual-futures context for a pair.
///
/// `long_short_ratio: None` means the venue did not report a ratio. That is a
/// distinct state from any numeric reading and is surfaced as such.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FuturesMetrics {
    pub open_interest: Option<f64>,
    /// Raw per-interval rate, e.g. 0.0001 for 0.01%
    pub funding_rate: Option<f64>,
    pub long_short_ratio: Option<f64>,
}

impl FuturesMetrics {
    pub fn is_empty(&self) -> bool {
        self.open_interest.is_none() && self.funding_rate.is_none() && self.long_short_ratio.is_none()
    }
}

/// Long-horizon on-chain valuation inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnChainMetrics {
    pub mvrv_z: Option<f64>,
    pub nvt: Option<f64>,
}

impl OnChainMetrics {
    pub fn is_empty(&self) -> bool {
        self.mvrv_z.is_none() && self.nvt.is_none()
    }
}
