use super::timeframe::Timeframe;
use serde::{Deserialize, Serialize};

/// Holding horizon requested by the user. Selects timeframes and price-band sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StrategyTier {
    #[default]
    Short,
    Mid,
    Long,
}

/// Recorded when the requested strategy was not recognized and a default was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFallback {
    pub requested: String,
    pub applied: StrategyTier,
}

impl StrategyTier {
    pub fn timeframes(&self) -> [Timeframe; 3] {
        match self {
            StrategyTier::Short => [Timeframe::FifteenMin, Timeframe::OneHour, Timeframe::FourHour],
            StrategyTier::Mid => [Timeframe::OneHour, Timeframe::FourHour, Timeframe::OneDay],
            StrategyTier::Long => [Timeframe::OneDay, Timeframe::ThreeDay, Timeframe::OneWeek],
        }
    }

    /// Timeframe whose combined signal becomes the headline verdict
    pub fn primary_timeframe(&self) -> Timeframe {
        match self {
            StrategyTier::Short => Timeframe::FifteenMin,
            StrategyTier::Mid => Timeframe::OneDay,
            StrategyTier::Long => Timeframe::OneWeek,
        }
    }

    pub fn includes_valuation(&self) -> bool {
        matches!(self, StrategyTier::Long)
    }

    /// Resolves free-form user input, falling back to `Short` when the input is
    /// not a known tier. The fallback is returned so callers can surface it.
    ///
    /// ```
    /// use coinsight::domain::market::strategy_tier::StrategyTier;
    ///
    /// let (tier, fallback) = StrategyTier::resolve("MID");
    /// assert_eq!(tier, StrategyTier::Mid);
    /// assert!(fallback.is_none());
    ///
    /// let (tier, fallback) = StrategyTier::resolve("scalp");
    /// assert_eq!(tier, StrategyTier::Short);
    /// assert_eq!(fallback.unwrap().requested, "scalp");
    /// ```
    pub fn resolve(input: &str) -> (StrategyTier, Option<StrategyFallback>) {
        match input.parse::<StrategyTier>() {
            Ok(tier) => (tier, None),
            Err(_) => {
                let applied = StrategyTier::default();
                (
                    applied,
                    Some(StrategyFallback {
                        requested: input.to_string(),
                        applied,
                    }),
                )
            }
        }
    }
}

impl std::str::FromStr for StrategyTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(StrategyTier::Short),
            "mid" | "medium" | "m" => Ok(StrategyTier::Mid),
            "long" | "l" => Ok(StrategyTier::Long),
            _ => anyhow::bail!("Invalid strategy: {}. Valid: short, mid, long", s),
        }
    }
}

impl std::fmt::Display for StrategyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyTier::Short => write!(f, "short"),
            StrategyTier::Mid => write!(f, "mid"),
            StrategyTier::Long => write!(f, "long"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_sets() {
        assert_eq!(
            StrategyTier::Short.timeframes(),
            [Timeframe::FifteenMin, Timeframe::OneHour, Timeframe::FourHour]
        );
        assert_eq!(
            StrategyTier::Mid.timeframes(),
            [Timeframe::OneHour, Timeframe::FourHour, Timeframe::OneDay]
        );
        assert_eq!(
            StrategyTier::Long.timeframes(),
            [Timeframe::OneDay, Timeframe::ThreeDay, Timeframe::OneWeek]
        );
    }

    #[test]
    fn test_primary_timeframe_is_in_set() {
        for tier in [StrategyTier::Short, StrategyTier::Mid, StrategyTier::Long] {
            assert!(tier.timeframes().contains(&tier.primary_timeframe()));
        }
    }

    #[test]
    fn test_resolve_known_tiers_without_fallback() {
        assert_eq!(StrategyTier::resolve(" Long "), (StrategyTier::Long, None));
        assert_eq!(StrategyTier::resolve("medium"), (StrategyTier::Mid, None));
    }

    #[test]
    fn test_resolve_unknown_falls_back_to_short() {
        let (tier, fallback) = StrategyTier::resolve("yolo");
        assert_eq!(tier, StrategyTier::Short);
        let fallback = fallback.expect("fallback must be reported");
        assert_eq!(fallback.requested, "yolo");
        assert_eq!(fallback.applied, StrategyTier::Short);
    }

    #[test]
    fn test_swing_is_not_a_tier() {
        assert!("swing".parse::<StrategyTier>().is_err());
        let (tier, fallback) = StrategyTier::resolve("swing");
        assert_eq!(tier, StrategyTier::Short);
        assert_eq!(fallback.map(|f| f.requested).as_deref(), Some("swing"));
    }

    #[test]
    fn test_only_long_includes_valuation() {
        assert!(StrategyTier::Long.includes_valuation());
        assert!(!StrategyTier::Mid.includes_valuation());
        assert!(!StrategyTier::Short.includes_valuation());
    }
}
