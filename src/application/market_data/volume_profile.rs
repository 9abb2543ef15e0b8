use crate::domain::market::candle::Candle;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BINS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    pub lower: f64,
    pub upper: f64,
    pub volume: f64,
}

/// Volume traded per close-price bucket over a series ("chip distribution").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub buckets: Vec<PriceBucket>,
    pub total_volume: f64,
}

impl VolumeProfile {
    /// Returns `None` when the series is empty, has a flat price range, or
    /// carries no volume.
    pub fn from_series(series: &[Candle], bins: usize) -> Option<Self> {
        if bins == 0 {
            return None;
        }
        let closes = series.iter().map(|c| c.close).filter(|p| p.is_finite());
        let (min, max) = closes.fold(None, |acc: Option<(f64, f64)>, p| match acc {
            None => Some((p, p)),
            Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
        })?;
        if max <= min {
            return None;
        }

        let width = (max - min) / bins as f64;
        let mut buckets: Vec<PriceBucket> = (0..bins)
            .map(|i| PriceBucket {
                lower: min + width * i as f64,
                upper: min + width * (i + 1) as f64,
                volume: 0.0,
            })
            .collect();

        for candle in series {
            if !candle.close.is_finite() || !candle.volume.is_finite() || candle.volume < 0.0 {
                continue;
            }
            // The maximum close belongs to the last bucket
            let idx = (((candle.close - min) / width) as usize).min(bins - 1);
            buckets[idx].volume += candle.volume;
        }

        let total_volume: f64 = buckets.iter().map(|b| b.volume).sum();
        if total_volume <= 0.0 {
            return None;
        }
        Some(Self {
            buckets,
            total_volume,
        })
    }

    pub fn dominant_bucket(&self) -> Option<&PriceBucket> {
        self.buckets
            .iter()
            .max_by(|a, b| a.volume.total_cmp(&b.volume))
    }

    /// Share of total volume held by the dominant bucket, in percent
    pub fn concentration_pct(&self) -> f64 {
        self.dominant_bucket()
            .map(|b| b.volume / self.total_volume * 100.0)
            .unwrap_or(0.0)
    }

    /// Share of volume whose whole bucket sits at or below `price`, in percent
    pub fn profit_ratio_pct(&self, price: f64) -> f64 {
        let below: f64 = self
            .buckets
            .iter()
            .filter(|b| b.upper <= price)
            .map(|b| b.volume)
            .sum();
        below / self.total_volume * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: f64, volume: f64) -> Candle {
        Candle::new(0, close, close, close, close, volume)
    }

    #[test]
    fn test_flat_range_has_no_profile() {
        let series = vec![candle(10.0, 5.0), candle(10.0, 7.0)];
        assert!(VolumeProfile::from_series(&series, DEFAULT_BINS).is_none());
        assert!(VolumeProfile::from_series(&[], DEFAULT_BINS).is_none());
    }

    #[test]
    fn test_zero_volume_has_no_profile() {
        let series = vec![candle(10.0, 0.0), candle(20.0, 0.0)];
        assert!(VolumeProfile::from_series(&series, DEFAULT_BINS).is_none());
    }

    #[test]
    fn test_buckets_accumulate_volume() {
        let series = vec![
            candle(100.0, 10.0),
            candle(101.0, 10.0),
            candle(150.0, 60.0),
            candle(200.0, 20.0),
        ];
        let profile = VolumeProfile::from_series(&series, DEFAULT_BINS).unwrap();
        assert_eq!(profile.buckets.len(), 10);
        assert_eq!(profile.total_volume, 100.0);
        // Max close lands in the last bucket rather than falling off the end
        assert_eq!(profile.buckets[9].volume, 20.0);
        assert_eq!(profile.buckets[0].volume, 20.0);

        let dominant = profile.dominant_bucket().unwrap();
        assert_eq!(dominant.lower, 150.0);
        assert!((profile.concentration_pct() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_profit_ratio_counts_buckets_below_price() {
        let series = vec![candle(100.0, 30.0), candle(200.0, 70.0)];
        let profile = VolumeProfile::from_series(&series, DEFAULT_BINS).unwrap();
        assert_eq!(profile.profit_ratio_pct(99.0), 0.0);
        assert!((profile.profit_ratio_pct(110.0) - 30.0).abs() < 1e-9);
        assert!((profile.profit_ratio_pct(200.0) - 100.0).abs() < 1e-9);
    }
}
