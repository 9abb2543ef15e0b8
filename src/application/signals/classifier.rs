//! Per-category indicator rules.
//!
//! Every rule is total: absent, NaN or zero-denominator inputs yield
//! `(Neutral, Weak)` instead of an error.

use crate::domain::market::candle::{IndicatorSnapshot, finite};
use crate::domain::signal::{CategoryVerdict, CategoryVerdicts, Direction, Strength};

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const VOLUME_SURGE_RATIO: f64 = 1.5;
pub const VOLUME_DRY_RATIO: f64 = 0.8;
/// Distance (fraction of the level) that counts as "at" a level
pub const LEVEL_PROXIMITY: f64 = 0.01;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrendInputs {
    pub ema5: Option<f64>,
    pub ema13: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema100: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MomentumInputs {
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VolumeInputs {
    pub current_volume: Option<f64>,
    pub avg_volume: Option<f64>,
    /// Signed close-to-close change
    pub price_change: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelInputs {
    pub price: Option<f64>,
    pub supports: Vec<f64>,
    pub resistances: Vec<f64>,
    pub current_volume: Option<f64>,
    pub avg_volume: Option<f64>,
}

pub fn classify_trend(inputs: &TrendInputs) -> CategoryVerdict {
    let (Some(e5), Some(e13)) = (finite(inputs.ema5), finite(inputs.ema13)) else {
        return CategoryVerdict::neutral();
    };

    let full = [
        Some(e5),
        Some(e13),
        finite(inputs.ema20),
        finite(inputs.ema50),
        finite(inputs.ema100),
    ];
    if let [Some(a), Some(b), Some(c), Some(d), Some(e)] = full {
        if a > b && b > c && c > d && d > e {
            return CategoryVerdict::new(Direction::Bullish, Strength::Strong);
        }
        if a < b && b < c && c < d && d < e {
            return CategoryVerdict::new(Direction::Bearish, Strength::Strong);
        }
    }

    if e5 > e13 {
        CategoryVerdict::new(Direction::Bullish, Strength::Medium)
    } else if e5 < e13 {
        CategoryVerdict::new(Direction::Bearish, Strength::Medium)
    } else {
        CategoryVerdict::neutral()
    }
}

pub fn classify_momentum(inputs: &MomentumInputs) -> CategoryVerdict {
    let rsi_signal = match finite(inputs.rsi) {
        Some(rsi) if rsi < RSI_OVERSOLD => CategoryVerdict::new(Direction::Bullish, Strength::Strong),
        Some(rsi) if rsi > RSI_OVERBOUGHT => CategoryVerdict::new(Direction::Bearish, Strength::Strong),
        _ => CategoryVerdict::neutral(),
    };

    let macd_signal = match (finite(inputs.macd), finite(inputs.macd_signal)) {
        (Some(macd), Some(signal)) if macd > signal => {
            CategoryVerdict::new(Direction::Bullish, Strength::Medium)
        }
        (Some(macd), Some(signal)) if macd < signal => {
            CategoryVerdict::new(Direction::Bearish, Strength::Medium)
        }
        _ => CategoryVerdict::neutral(),
    };

    let subs = [rsi_signal.direction, macd_signal.direction];
    if subs.iter().all(|d| *d == Direction::Bullish) {
        CategoryVerdict::new(Direction::Bullish, Strength::Strong)
    } else if subs.iter().all(|d| *d == Direction::Bearish) {
        CategoryVerdict::new(Direction::Bearish, Strength::Strong)
    } else if subs.contains(&Direction::Bullish) {
        CategoryVerdict::new(Direction::Bullish, Strength::Medium)
    } else if subs.contains(&Direction::Bearish) {
        CategoryVerdict::new(Direction::Bearish, Strength::Medium)
    } else {
        CategoryVerdict::neutral()
    }
}

fn volume_ratio(current: Option<f64>, avg: Option<f64>) -> Option<f64> {
    let (current, avg) = (finite(current)?, finite(avg)?);
    if avg <= 0.0 {
        return None;
    }
    finite(Some(current / avg))
}

pub fn classify_volume(inputs: &VolumeInputs) -> CategoryVerdict {
    let Some(ratio) = volume_ratio(inputs.current_volume, inputs.avg_volume) else {
        return CategoryVerdict::neutral();
    };
    let change = finite(inputs.price_change).unwrap_or(0.0);
    let rising = change > 0.0;
    let falling = change < 0.0;

    if ratio > VOLUME_SURGE_RATIO && rising {
        CategoryVerdict::new(Direction::Bullish, Strength::Strong)
    } else if ratio > VOLUME_SURGE_RATIO && falling {
        CategoryVerdict::new(Direction::Bearish, Strength::Strong)
    } else if ratio < VOLUME_DRY_RATIO && rising {
        CategoryVerdict::new(Direction::Bullish, Strength::Weak)
    } else if ratio < VOLUME_DRY_RATIO && falling {
        CategoryVerdict::new(Direction::Bearish, Strength::Weak)
    } else {
        CategoryVerdict::neutral()
    }
}

pub fn classify_levels(inputs: &LevelInputs) -> CategoryVerdict {
    let Some(price) = finite(inputs.price) else {
        return CategoryVerdict::neutral();
    };
    let supports = inputs.supports.iter().copied().filter(|l| l.is_finite() && *l > 0.0);
    let resistances = inputs.resistances.iter().copied().filter(|l| l.is_finite() && *l > 0.0);
    let surge = volume_ratio(inputs.current_volume, inputs.avg_volume)
        .is_some_and(|r| r > VOLUME_SURGE_RATIO);

    if surge && resistances.clone().any(|r| price > r) {
        return CategoryVerdict::new(Direction::Bullish, Strength::Strong);
    }
    if surge && supports.clone().any(|s| price < s) {
        return CategoryVerdict::new(Direction::Bearish, Strength::Strong);
    }
    let near = |level: f64| ((price - level) / level).abs() < LEVEL_PROXIMITY;
    if supports.clone().any(near) {
        return CategoryVerdict::new(Direction::Bullish, Strength::Medium);
    }
    if resistances.clone().any(near) {
        return CategoryVerdict::new(Direction::Bearish, Strength::Medium);
    }
    CategoryVerdict::neutral()
}

impl TrendInputs {
    /// Reads the EMA stack, substituting simple averages where an EMA has
    /// not warmed up (ma20 for ema20, ma50 for ema50 and ema100).
    pub fn from_snapshot(snapshot: &IndicatorSnapshot) -> Self {
        let ind = &snapshot.latest.indicators;
        Self {
            ema5: finite(ind.ema5),
            ema13: finite(ind.ema13),
            ema20: finite(ind.ema20).or(finite(ind.ma20)),
            ema50: finite(ind.ema50).or(finite(ind.ma50)),
            ema100: finite(ind.ema100).or(finite(ind.ma50)),
        }
    }
}

impl MomentumInputs {
    pub fn from_snapshot(snapshot: &IndicatorSnapshot) -> Self {
        let ind = &snapshot.latest.indicators;
        Self {
            rsi: ind.rsi,
            macd: ind.macd,
            macd_signal: ind.macd_signal,
        }
    }
}

impl VolumeInputs {
    pub fn from_snapshot(snapshot: &IndicatorSnapshot) -> Self {
        Self {
            current_volume: Some(snapshot.latest.volume),
            avg_volume: snapshot.latest.indicators.volume_ma20,
            price_change: snapshot.price_change(),
        }
    }
}

impl LevelInputs {
    /// Resistance: previous box high and upper band. Support: previous box
    /// low and lower band. The box comes from the previous candle so that a
    /// close beyond it is a break rather than a tautology.
    pub fn from_snapshot(snapshot: &IndicatorSnapshot) -> Self {
        let latest = &snapshot.latest.indicators;
        let prev = snapshot.previous.as_ref().map(|c| &c.indicators);

        let resistances = [prev.and_then(|p| p.box_high), latest.bb_upper]
            .into_iter()
            .filter_map(finite)
            .collect();
        let supports = [prev.and_then(|p| p.box_low), latest.bb_lower]
            .into_iter()
            .filter_map(finite)
            .collect();

        Self {
            price: Some(snapshot.price()),
            supports,
            resistances,
            current_volume: Some(snapshot.latest.volume),
            avg_volume: latest.volume_ma20,
        }
    }
}

pub fn classify_snapshot(snapshot: &IndicatorSnapshot) -> CategoryVerdicts {
    CategoryVerdicts {
        trend: classify_trend(&TrendInputs::from_snapshot(snapshot)),
        momentum: classify_momentum(&MomentumInputs::from_snapshot(snapshot)),
        volume: classify_volume(&VolumeInputs::from_snapshot(snapshot)),
        support_resistance: classify_levels(&LevelInputs::from_snapshot(snapshot)),
    }
}
