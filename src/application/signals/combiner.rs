use crate::domain::signal::{CategoryVerdicts, CombinedSignal, Direction, Strength};

pub const STRONG_THRESHOLD: f64 = 4.0;
pub const MEDIUM_THRESHOLD: f64 = 2.0;

/// Merges the four category verdicts into one signal.
///
/// Direction is a majority vote of bullish against bearish verdicts (ties are
/// neutral). Strength comes from the priority-weighted sum of verdict
/// strengths, so it depends only on the inputs.
pub fn combine(verdicts: &CategoryVerdicts) -> CombinedSignal {
    let mut bullish = 0usize;
    let mut bearish = 0usize;
    let mut total_strength = 0.0;

    for (category, verdict) in verdicts.iter() {
        match verdict.direction {
            Direction::Bullish => bullish += 1,
            Direction::Bearish => bearish += 1,
            Direction::Neutral => {}
        }
        total_strength += f64::from(verdict.strength.value()) * category.weight();
    }

    let direction = if bullish > bearish {
        Direction::Bullish
    } else if bearish > bullish {
        Direction::Bearish
    } else {
        Direction::Neutral
    };

    let strength = if total_strength >= STRONG_THRESHOLD {
        Strength::Strong
    } else if total_strength >= MEDIUM_THRESHOLD {
        Strength::Medium
    } else {
        Strength::Weak
    };

    CombinedSignal {
        direction,
        strength,
        total_strength,
        contributions: *verdicts,
    }
}
