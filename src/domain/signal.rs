use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

/// Verdict strength. The numeric values feed the weighted total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strength {
    Weak,
    Medium,
    Strong,
}

impl Strength {
    pub fn value(&self) -> u8 {
        match self {
            Strength::Weak => 1,
            Strength::Medium => 3,
            Strength::Strong => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVerdict {
    pub direction: Direction,
    pub strength: Strength,
}

impl CategoryVerdict {
    pub const fn new(direction: Direction, strength: Strength) -> Self {
        Self { direction, strength }
    }

    /// The fail-soft verdict for missing or unusable inputs
    pub const fn neutral() -> Self {
        Self::new(Direction::Neutral, Strength::Weak)
    }
}

/// Indicator categories in priority order. Lower priority number weighs more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Trend,
    Momentum,
    Volume,
    SupportResistance,
}

impl Category {
    pub fn priority(&self) -> u8 {
        match self {
            Category::Trend => 1,
            Category::Momentum => 2,
            Category::Volume => 3,
            Category::SupportResistance => 4,
        }
    }

    pub fn weight(&self) -> f64 {
        1.0 / f64::from(self.priority())
    }

    pub fn all() -> [Category; 4] {
        [
            Category::Trend,
            Category::Momentum,
            Category::Volume,
            Category::SupportResistance,
        ]
    }
}

/// The four category verdicts for one timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVerdicts {
    pub trend: CategoryVerdict,
    pub momentum: CategoryVerdict,
    pub volume: CategoryVerdict,
    pub support_resistance: CategoryVerdict,
}

impl CategoryVerdicts {
    pub fn get(&self, category: Category) -> CategoryVerdict {
        match category {
            Category::Trend => self.trend,
            Category::Momentum => self.momentum,
            Category::Volume => self.volume,
            Category::SupportResistance => self.support_resistance,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, CategoryVerdict)> + '_ {
        Category::all().into_iter().map(|c| (c, self.get(c)))
    }
}

/// Final verdict plus the inputs that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinedSignal {
    pub direction: Direction,
    pub strength: Strength,
    pub total_strength: f64,
    pub contributions: CategoryVerdicts,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "bullish"),
            Direction::Bearish => write!(f, "bearish"),
            Direction::Neutral => write!(f, "neutral"),
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strength::Weak => write!(f, "weak"),
            Strength::Medium => write!(f, "medium"),
            Strength::Strong => write!(f, "strong"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Trend => write!(f, "trend"),
            Category::Momentum => write!(f, "momentum"),
            Category::Volume => write!(f, "volume"),
            Category::SupportResistance => write!(f, "support/resistance"),
        }
    }
}
