use crate::domain::market::strategy_tier::{StrategyFallback, StrategyTier};
use crate::domain::market::timeframe::Timeframe;
use crate::domain::signal::{CategoryVerdicts, CombinedSignal, Direction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A report section that is either computed or explicitly marked unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Section<T> {
    Available(T),
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Section::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn as_available(&self) -> Option<&T> {
        match self {
            Section::Available(value) => Some(value),
            Section::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Section::Available(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    StrategyFallback,
    SymbolFallback,
    HeadlineFallback,
}

/// Something the user should know about how the request was interpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeAnalysis {
    pub timeframe: Timeframe,
    pub close: f64,
    pub ma20: Option<f64>,
    pub ma50: Option<f64>,
    pub verdicts: CategoryVerdicts,
    pub combined: CombinedSignal,
}

impl TimeframeAnalysis {
    /// `None` when the average could not be computed
    pub fn above_ma20(&self) -> Option<bool> {
        self.ma20.map(|ma| self.close > ma)
    }

    pub fn above_ma50(&self) -> Option<bool> {
        self.ma50.map(|ma| self.close > ma)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeSection {
    pub timeframe: Timeframe,
    pub analysis: Section<TimeframeAnalysis>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeCharacter {
    SurgeUp,
    SurgeDown,
    ShrinkUp,
    ShrinkDown,
    Unremarkable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeSection {
    pub current_volume: f64,
    pub previous_volume: f64,
    pub change_pct: f64,
    /// Current volume over its 20-bar average
    pub ma_ratio: Option<f64>,
    pub character: VolumeCharacter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundingBias {
    LongsPaying,
    ShortsPaying,
    Balanced,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LongShortReading {
    Absent,
    LongHeavy(f64),
    ShortHeavy(f64),
    Balanced(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesSection {
    pub funding_rate_pct: Option<f64>,
    pub funding_bias: FundingBias,
    pub long_short: LongShortReading,
    pub open_interest: Option<f64>,
    pub lean: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfitPressure {
    ProfitTaking,
    TrappedSupply,
    Balanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipSection {
    pub dominant_low: f64,
    pub dominant_high: f64,
    pub concentration_pct: f64,
    pub concentrated: bool,
    pub profit_ratio_pct: f64,
    pub pressure: ProfitPressure,
    pub lean: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuationBand {
    DeeplyUndervalued,
    Undervalued,
    Fair,
    Overvalued,
    DeeplyOvervalued,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSection {
    pub mvrv_z: Option<f64>,
    pub mvrv_band: Option<ValuationBand>,
    pub nvt: Option<f64>,
    pub nvt_band: Option<ValuationBand>,
    pub lean: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBands {
    pub entry_low: f64,
    pub entry_high: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    /// Multiplier applied to the tier's base offsets
    pub volatility_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub requested_symbol: String,
    pub strategy: StrategyTier,
    pub strategy_fallback: Option<StrategyFallback>,
    pub notices: Vec<Notice>,
    pub generated_at: DateTime<Utc>,
    pub current_price: f64,
    pub headline_timeframe: Timeframe,
    pub headline: CombinedSignal,
    pub timeframes: Vec<TimeframeSection>,
    pub volume: Section<VolumeSection>,
    pub futures: Section<FuturesSection>,
    pub chips: Section<ChipSection>,
    /// Present for the long tier only
    pub valuation: Option<Section<ValuationSection>>,
    pub price_bands: PriceBands,
    pub position_hint: String,
    pub risk_notes: Vec<String>,
}

/// Whole-result failure marker: no timeframe yielded any data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub symbol: String,
    pub strategy: String,
    pub reason: String,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Report(Box<AnalysisReport>),
    Failed(AnalysisFailure),
}

impl AnalysisOutcome {
    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            AnalysisOutcome::Report(report) => Some(report),
            AnalysisOutcome::Failed(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AnalysisOutcome::Failed(_))
    }
}
