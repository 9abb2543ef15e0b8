use crate::application::market_data::volume_profile::VolumeProfile;
use crate::domain::analysis::{
    ChipSection, FundingBias, FuturesSection, LongShortReading, ProfitPressure, Section,
    ValuationBand, ValuationSection, VolumeCharacter, VolumeSection,
};
use crate::domain::errors::{AnalysisError, DataUnavailable};
use crate::domain::market::candle::{IndicatorSnapshot, finite};
use crate::domain::market::metrics::{FuturesMetrics, OnChainMetrics};
use crate::domain::signal::Direction;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::warn;

pub const VOLUME_CHANGE_THRESHOLD_PCT: f64 = 30.0;
/// Funding rate in percent per interval
pub const FUNDING_BIAS_PCT: f64 = 0.01;
pub const LONG_HEAVY_RATIO: f64 = 1.1;
pub const SHORT_HEAVY_RATIO: f64 = 0.9;
pub const CONCENTRATION_PCT: f64 = 30.0;
pub const PROFIT_TAKING_PCT: f64 = 70.0;
pub const TRAPPED_SUPPLY_PCT: f64 = 30.0;

/// Runs `build`, converting a panic into `ComputationFault`.
pub fn contain<T, F>(name: &str, build: F) -> Result<T, AnalysisError>
where
    F: FnOnce() -> Result<T, AnalysisError>,
{
    catch_unwind(AssertUnwindSafe(build)).unwrap_or_else(|panic| {
        Err(AnalysisError::ComputationFault {
            section: name.to_string(),
            detail: panic_message(panic.as_ref()),
        })
    })
}

/// Runs a section builder, turning errors and panics into an unavailable section.
pub fn guard_section<T, F>(name: &str, build: F) -> Section<T>
where
    F: FnOnce() -> Result<T, AnalysisError>,
{
    match contain(name, build) {
        Ok(value) => Section::Available(value),
        Err(AnalysisError::DataUnavailable(e)) => Section::unavailable(e.to_string()),
        Err(e) => {
            warn!("Section '{}' degraded: {}", name, e);
            Section::unavailable(e.to_string())
        }
    }
}

pub fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub fn volume_section(snapshot: &IndicatorSnapshot) -> Result<VolumeSection, AnalysisError> {
    let previous = snapshot.previous.as_ref().ok_or_else(|| {
        DataUnavailable::new("volume change", "only one candle available")
    })?;
    let (Some(current), Some(prev_volume)) = (
        finite(Some(snapshot.latest.volume)),
        finite(Some(previous.volume)),
    ) else {
        return Err(DataUnavailable::new("volume change", "volume is not a number").into());
    };
    if prev_volume <= 0.0 {
        return Err(DataUnavailable::new("volume change", "previous volume is zero").into());
    }

    let change_pct = (current - prev_volume) / prev_volume * 100.0;
    // A flat or unknown price move labels no direction.
    let price_change = snapshot.price_change().unwrap_or(0.0);
    let character = match (change_pct, price_change) {
        (v, p) if v > VOLUME_CHANGE_THRESHOLD_PCT && p > 0.0 => VolumeCharacter::SurgeUp,
        (v, p) if v > VOLUME_CHANGE_THRESHOLD_PCT && p < 0.0 => VolumeCharacter::SurgeDown,
        (v, p) if v < -VOLUME_CHANGE_THRESHOLD_PCT && p > 0.0 => VolumeCharacter::ShrinkUp,
        (v, p) if v < -VOLUME_CHANGE_THRESHOLD_PCT && p < 0.0 => VolumeCharacter::ShrinkDown,
        _ => VolumeCharacter::Unremarkable,
    };

    let ma_ratio = finite(snapshot.latest.indicators.volume_ma20)
        .filter(|avg| *avg > 0.0)
        .map(|avg| current / avg);

    Ok(VolumeSection {
        current_volume: current,
        previous_volume: prev_volume,
        change_pct,
        ma_ratio,
        character,
    })
}

pub fn futures_section(metrics: &FuturesMetrics) -> Result<FuturesSection, AnalysisError> {
    let metrics = FuturesMetrics {
        open_interest: finite(metrics.open_interest),
        funding_rate: finite(metrics.funding_rate),
        long_short_ratio: finite(metrics.long_short_ratio),
    };
    if metrics.is_empty() {
        return Err(DataUnavailable::new("futures metrics", "no field reported").into());
    }

    let funding_rate_pct = metrics.funding_rate.map(|r| r * 100.0);
    let funding_bias = match funding_rate_pct {
        Some(pct) if pct > FUNDING_BIAS_PCT => FundingBias::LongsPaying,
        Some(pct) if pct < -FUNDING_BIAS_PCT => FundingBias::ShortsPaying,
        Some(_) => FundingBias::Balanced,
        None => FundingBias::Unknown,
    };

    let long_short = match metrics.long_short_ratio {
        None => LongShortReading::Absent,
        Some(r) if r > LONG_HEAVY_RATIO => LongShortReading::LongHeavy(r),
        Some(r) if r < SHORT_HEAVY_RATIO => LongShortReading::ShortHeavy(r),
        Some(r) => LongShortReading::Balanced(r),
    };

    // Crowded longs pay funding and are the side that gets squeezed
    let lean = match funding_bias {
        FundingBias::LongsPaying => Direction::Bearish,
        FundingBias::ShortsPaying => Direction::Bullish,
        _ => Direction::Neutral,
    };

    Ok(FuturesSection {
        funding_rate_pct,
        funding_bias,
        long_short,
        open_interest: metrics.open_interest,
        lean,
    })
}

pub fn chip_section(profile: Option<&VolumeProfile>, price: f64) -> Result<ChipSection, AnalysisError> {
    let profile = profile.ok_or_else(|| {
        DataUnavailable::new("chip distribution", "price range is flat or volume is zero")
    })?;
    let dominant = profile.dominant_bucket().ok_or_else(|| {
        DataUnavailable::new("chip distribution", "profile has no buckets")
    })?;

    let concentration_pct = profile.concentration_pct();
    let profit_ratio_pct = profile.profit_ratio_pct(price);
    let (pressure, lean) = if profit_ratio_pct > PROFIT_TAKING_PCT {
        (ProfitPressure::ProfitTaking, Direction::Bearish)
    } else if profit_ratio_pct < TRAPPED_SUPPLY_PCT {
        (ProfitPressure::TrappedSupply, Direction::Bullish)
    } else {
        (ProfitPressure::Balanced, Direction::Neutral)
    };

    Ok(ChipSection {
        dominant_low: dominant.lower,
        dominant_high: dominant.upper,
        concentration_pct,
        concentrated: concentration_pct > CONCENTRATION_PCT,
        profit_ratio_pct,
        pressure,
        lean,
    })
}

pub fn mvrv_band(mvrv_z: f64) -> ValuationBand {
    if mvrv_z < -1.0 {
        ValuationBand::DeeplyUndervalued
    } else if mvrv_z < 0.0 {
        ValuationBand::Undervalued
    } else if mvrv_z > 3.0 {
        ValuationBand::DeeplyOvervalued
    } else if mvrv_z > 1.0 {
        ValuationBand::Overvalued
    } else {
        ValuationBand::Fair
    }
}

pub fn nvt_band(nvt: f64) -> ValuationBand {
    if nvt < 20.0 {
        ValuationBand::Undervalued
    } else if nvt > 100.0 {
        ValuationBand::Overvalued
    } else {
        ValuationBand::Fair
    }
}

pub fn valuation_section(metrics: &OnChainMetrics) -> Result<ValuationSection, AnalysisError> {
    let mvrv_z = finite(metrics.mvrv_z);
    let nvt = finite(metrics.nvt);
    if mvrv_z.is_none() && nvt.is_none() {
        return Err(DataUnavailable::new("on-chain metrics", "neither MVRV-Z nor NVT reported").into());
    }

    let mvrv = mvrv_z.map(mvrv_band);
    let nvt_b = nvt.map(nvt_band);

    let mut bull = 0u8;
    let mut bear = 0u8;
    match mvrv {
        Some(ValuationBand::DeeplyUndervalued) => bull += 2,
        Some(ValuationBand::Undervalued) => bull += 1,
        Some(ValuationBand::DeeplyOvervalued) => bear += 2,
        Some(ValuationBand::Overvalued) => bear += 1,
        _ => {}
    }
    match nvt_b {
        Some(ValuationBand::Undervalued) => bull += 1,
        Some(ValuationBand::Overvalued) => bear += 1,
        _ => {}
    }
    let lean = match bull.cmp(&bear) {
        std::cmp::Ordering::Greater => Direction::Bullish,
        std::cmp::Ordering::Less => Direction::Bearish,
        std::cmp::Ordering::Equal => Direction::Neutral,
    };

    Ok(ValuationSection {
        mvrv_z,
        mvrv_band: mvrv,
        nvt,
        nvt_band: nvt_b,
        lean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::candle::{Candle, Indicators};
    use crate::domain::market::timeframe::Timeframe;

    fn snapshot(prev_close: f64, prev_vol: f64, close: f64, vol: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            timeframe: Timeframe::OneHour,
            latest: Candle::new(1, close, close, close, close, vol).with_indicators(Indicators {
                volume_ma20: Some(100.0),
                ..Default::default()
            }),
            previous: Some(Candle::new(0, prev_close, prev_close, prev_close, prev_close, prev_vol)),
        }
    }

    #[test]
    fn test_volume_character_bands() {
        let surge = volume_section(&snapshot(100.0, 100.0, 101.0, 140.0)).unwrap();
        assert_eq!(surge.character, VolumeCharacter::SurgeUp);
        assert!((surge.change_pct - 40.0).abs() < 1e-9);
        assert_eq!(surge.ma_ratio, Some(1.4));

        let dump = volume_section(&snapshot(100.0, 100.0, 99.0, 140.0)).unwrap();
        assert_eq!(dump.character, VolumeCharacter::SurgeDown);

        let fade = volume_section(&snapshot(100.0, 100.0, 101.0, 60.0)).unwrap();
        assert_eq!(fade.character, VolumeCharacter::ShrinkUp);

        let quiet = volume_section(&snapshot(100.0, 100.0, 99.0, 110.0)).unwrap();
        assert_eq!(quiet.character, VolumeCharacter::Unremarkable);

        let flat_surge = volume_section(&snapshot(100.0, 100.0, 100.0, 200.0)).unwrap();
        assert_eq!(flat_surge.character, VolumeCharacter::Unremarkable);
        assert!((flat_surge.change_pct - 100.0).abs() < 1e-9);

        let flat_fade = volume_section(&snapshot(100.0, 100.0, 100.0, 50.0)).unwrap();
        assert_eq!(flat_fade.character, VolumeCharacter::Unremarkable);
    }

    #[test]
    fn test_volume_zero_previous_is_unavailable() {
        let section = guard_section("volume", || volume_section(&snapshot(100.0, 0.0, 101.0, 50.0)));
        assert!(!section.is_available());
    }

    #[test]
    fn test_futures_interpretation() {
        let section = futures_section(&FuturesMetrics {
            open_interest: Some(1_000.0),
            funding_rate: Some(0.0003),
            long_short_ratio: None,
        })
        .unwrap();
        assert_eq!(section.funding_bias, FundingBias::LongsPaying);
        assert_eq!(section.lean, Direction::Bearish);
        assert_eq!(section.long_short, LongShortReading::Absent);

        let section = futures_section(&FuturesMetrics {
            open_interest: None,
            funding_rate: Some(-0.0002),
            long_short_ratio: Some(0.8),
        })
        .unwrap();
        assert_eq!(section.funding_bias, FundingBias::ShortsPaying);
        assert_eq!(section.lean, Direction::Bullish);
        assert_eq!(section.long_short, LongShortReading::ShortHeavy(0.8));

        let section = futures_section(&FuturesMetrics {
            long_short_ratio: Some(1.0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(section.funding_bias, FundingBias::Unknown);
        assert_eq!(section.long_short, LongShortReading::Balanced(1.0));
    }

    #[test]
    fn test_futures_all_absent_is_unavailable() {
        let metrics = FuturesMetrics {
            funding_rate: Some(f64::NAN),
            ..Default::default()
        };
        assert!(futures_section(&metrics).is_err());
    }

    #[test]
    fn test_chip_section() {
        let series = vec![
            Candle::new(0, 100.0, 100.0, 100.0, 100.0, 80.0),
            Candle::new(1, 200.0, 200.0, 200.0, 200.0, 20.0),
        ];
        let profile = VolumeProfile::from_series(&series, 10);
        let section = chip_section(profile.as_ref(), 150.0).unwrap();
        assert!(section.concentrated);
        assert_eq!(section.dominant_low, 100.0);
        assert!((section.profit_ratio_pct - 80.0).abs() < 1e-9);
        assert_eq!(section.pressure, ProfitPressure::ProfitTaking);
        assert_eq!(section.lean, Direction::Bearish);

        assert!(chip_section(None, 150.0).is_err());
    }

    #[test]
    fn test_valuation_bands_and_lean() {
        assert_eq!(mvrv_band(-1.5), ValuationBand::DeeplyUndervalued);
        assert_eq!(mvrv_band(-0.5), ValuationBand::Undervalued);
        assert_eq!(mvrv_band(0.5), ValuationBand::Fair);
        assert_eq!(mvrv_band(2.0), ValuationBand::Overvalued);
        assert_eq!(mvrv_band(3.5), ValuationBand::DeeplyOvervalued);
        assert_eq!(nvt_band(10.0), ValuationBand::Undervalued);
        assert_eq!(nvt_band(50.0), ValuationBand::Fair);
        assert_eq!(nvt_band(150.0), ValuationBand::Overvalued);

        let section = valuation_section(&OnChainMetrics {
            mvrv_z: Some(-1.2),
            nvt: Some(150.0),
        })
        .unwrap();
        assert_eq!(section.lean, Direction::Bullish);

        let section = valuation_section(&OnChainMetrics {
            mvrv_z: Some(2.0),
            nvt: Some(10.0),
        })
        .unwrap();
        assert_eq!(section.lean, Direction::Neutral);

        assert!(valuation_section(&OnChainMetrics::default()).is_err());
    }

    #[test]
    fn test_guard_section_contains_panics() {
        let section: Section<u8> =
            guard_section("exploding", || -> Result<u8, AnalysisError> { panic!("boom") });
        match section {
            Section::Unavailable { reason } => {
                assert!(reason.contains("exploding"));
                assert!(reason.contains("boom"));
            }
            Section::Available(_) => panic!("panic must degrade the section"),
        }
    }
}
