use super::timeframe::Timeframe;
use crate::domain::errors::DataUnavailable;
use serde::{Deserialize, Serialize};

/// Keeps a value only when it is a real number. Providers encode
/// "not enough history" as NaN, which must never reach a comparison.
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Derived indicator values for a single candle. Every field is optional:
/// absent means the indicator has not warmed up or the provider did not supply it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd_signal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd_histogram: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema5: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema13: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ema100: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_ma20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bb_upper: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bb_middle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bb_lower: Option<f64>,
    /// Highest high of the trailing 20 bars
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_high: Option<f64>,
    /// Lowest low of the trailing 20 bars
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_low: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time, unix milliseconds
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub indicators: Indicators,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            indicators: Indicators::default(),
        }
    }

    pub fn with_indicators(mut self, indicators: Indicators) -> Self {
        self.indicators = indicators;
        self
    }
}

/// Latest and previous candle of one timeframe, the unit the classifier reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub timeframe: Timeframe,
    pub latest: Candle,
    pub previous: Option<Candle>,
}

impl IndicatorSnapshot {
    pub fn from_series(timeframe: Timeframe, series: &[Candle]) -> Result<Self, DataUnavailable> {
        let (latest, rest) = series.split_last().ok_or_else(|| DataUnavailable {
            what: format!("{} candles", timeframe),
            reason: "series is empty".to_string(),
        })?;

        if !latest.close.is_finite() || latest.close <= 0.0 {
            return Err(DataUnavailable {
                what: format!("{} candles", timeframe),
                reason: format!("latest close is not a usable price ({})", latest.close),
            });
        }

        Ok(Self {
            timeframe,
            latest: latest.clone(),
            previous: rest.last().cloned(),
        })
    }

    pub fn price(&self) -> f64 {
        self.latest.close
    }

    /// Signed close-to-close change against the previous candle, if there is one
    pub fn price_change(&self) -> Option<f64> {
        self.previous
            .as_ref()
            .map(|prev| self.latest.close - prev.close)
            .filter(|d| d.is_finite())
    }
}
