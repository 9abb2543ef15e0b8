use crate::domain::analysis::{
    ChipSection, FuturesSection, LongShortReading, PriceBands, Section, VolumeSection,
};
use crate::domain::market::candle::finite;
use crate::domain::market::strategy_tier::{StrategyFallback, StrategyTier};
use crate::domain::signal::{CombinedSignal, Direction, Strength};

/// Offsets from the current price, in multiples of `unit`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandProfile {
    pub unit: f64,
    pub entry: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
}

impl BandProfile {
    pub fn for_tier(tier: StrategyTier) -> Self {
        match tier {
            StrategyTier::Short => Self {
                unit: 0.01,
                entry: 0.3,
                take_profit: 1.5,
                stop_loss: 1.0,
            },
            StrategyTier::Mid => Self {
                unit: 0.01,
                entry: 0.5,
                take_profit: 2.0,
                stop_loss: 1.5,
            },
            StrategyTier::Long => Self {
                unit: 0.03,
                entry: 0.5,
                take_profit: 3.0,
                stop_loss: 2.0,
            },
        }
    }
}

pub const MIN_VOLATILITY_FACTOR: f64 = 0.5;
pub const MAX_VOLATILITY_FACTOR: f64 = 2.0;

pub fn volatility_factor(recent_range: Option<f64>, unit: f64) -> f64 {
    match finite(recent_range) {
        Some(range) if range > 0.0 && unit > 0.0 => {
            (range / unit).clamp(MIN_VOLATILITY_FACTOR, MAX_VOLATILITY_FACTOR)
        }
        _ => 1.0,
    }
}

/// Entry, take-profit and stop-loss levels around `price`.
pub fn price_bands(
    price: f64,
    direction: Direction,
    tier: StrategyTier,
    recent_range: Option<f64>,
) -> PriceBands {
    let profile = BandProfile::for_tier(tier);
    let factor = volatility_factor(recent_range, profile.unit);
    let step = price * profile.unit * factor;

    let entry_low = price - step * profile.entry;
    let entry_high = price + step * profile.entry;
    let (take_profit, stop_loss) = match direction {
        Direction::Bullish => (
            price + step * profile.take_profit,
            price - step * profile.stop_loss,
        ),
        Direction::Bearish => (
            price - step * profile.take_profit,
            price + step * profile.stop_loss,
        ),
        Direction::Neutral => (
            price + step * profile.stop_loss,
            price - step * profile.stop_loss,
        ),
    };

    PriceBands {
        entry_low,
        entry_high,
        take_profit,
        stop_loss,
        volatility_factor: factor,
    }
}

pub fn position_hint(signal: &CombinedSignal) -> String {
    if signal.direction == Direction::Neutral {
        return "0-5% (wait for confirmation)".to_string();
    }
    match signal.strength {
        Strength::Strong => "20-30%",
        Strength::Medium => "10-15%",
        Strength::Weak => "5-10%",
    }
    .to_string()
}

pub const RSI_EXTREME_HIGH: f64 = 75.0;
pub const RSI_EXTREME_LOW: f64 = 25.0;
pub const FUNDING_EXTREME_PCT: f64 = 0.03;
pub const VOLUME_SPIKE_PCT: f64 = 50.0;

pub fn risk_notes(
    rsi: Option<f64>,
    volume: &Section<VolumeSection>,
    futures: &Section<FuturesSection>,
    chips: &Section<ChipSection>,
    fallback: Option<&StrategyFallback>,
) -> Vec<String> {
    let mut notes = Vec::new();

    if let Some(rsi) = finite(rsi) {
        if rsi > RSI_EXTREME_HIGH {
            notes.push(format!("RSI {:.1} is deeply overbought; chasing longs is risky", rsi));
        } else if rsi < RSI_EXTREME_LOW {
            notes.push(format!("RSI {:.1} is deeply oversold; shorts may get squeezed", rsi));
        }
    }

    if let Some(f) = futures.as_available() {
        if let Some(pct) = f.funding_rate_pct.filter(|p| p.abs() > FUNDING_EXTREME_PCT) {
            notes.push(format!("Funding rate {:.4}% is extreme; expect a leverage flush", pct));
        }
        if f.long_short == LongShortReading::Absent {
            notes.push("Long/short ratio not reported; positioning is unknown".to_string());
        }
    }

    if let Some(v) = volume.as_available()
        && v.change_pct > VOLUME_SPIKE_PCT
    {
        notes.push(format!("Volume jumped {:.0}% bar over bar; moves may be erratic", v.change_pct));
    }

    if let Some(c) = chips.as_available()
        && c.concentrated
    {
        notes.push(format!(
            "{:.0}% of volume sits in {:.4}-{:.4}; expect a reaction there",
            c.concentration_pct, c.dominant_low, c.dominant_high
        ));
    }

    if let Some(fb) = fallback {
        notes.push(format!(
            "Strategy '{}' is not recognised; analysed as {}",
            fb.requested, fb.applied
        ));
    }

    notes
}
