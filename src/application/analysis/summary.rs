use crate::domain::analysis::{
    AnalysisOutcome, AnalysisReport, FundingBias, LongShortReading, Section,
};
use crate::domain::dispatch::DeliveryPayload;
use std::fmt::Write;

/// Short plain-text rendering of the structured verdicts.
pub fn render_summary(outcome: &AnalysisOutcome) -> String {
    match outcome {
        AnalysisOutcome::Report(report) => render_report(report),
        AnalysisOutcome::Failed(failure) => {
            let mut out = format!(
                "Analysis failed for {} ({}): {}",
                failure.symbol, failure.strategy, failure.reason
            );
            for notice in &failure.notices {
                let _ = write!(out, "\n! {}", notice.message);
            }
            out
        }
    }
}

pub fn render_payload(payload: &DeliveryPayload) -> String {
    match payload {
        DeliveryPayload::Outcome(outcome) => render_summary(outcome),
        DeliveryPayload::Text(text) => text.clone(),
    }
}

fn render_report(r: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} [{}] @ {:.4}: {} {} (score {:.2}, {})",
        r.symbol,
        r.strategy,
        r.current_price,
        r.headline.direction,
        r.headline.strength,
        r.headline.total_strength,
        r.headline_timeframe
    );
    for notice in &r.notices {
        let _ = writeln!(out, "! {}", notice.message);
    }

    for tf in &r.timeframes {
        match &tf.analysis {
            Section::Available(a) => {
                let _ = writeln!(
                    out,
                    "  {}: {} {} | trend {} momentum {} volume {} levels {}",
                    tf.timeframe,
                    a.combined.direction,
                    a.combined.strength,
                    a.verdicts.trend.direction,
                    a.verdicts.momentum.direction,
                    a.verdicts.volume.direction,
                    a.verdicts.support_resistance.direction
                );
                let _ = writeln!(
                    out,
                    "    price {} MA20, {} MA50",
                    ma_position(a.above_ma20(), a.ma20),
                    ma_position(a.above_ma50(), a.ma50)
                );
            }
            Section::Unavailable { reason } => {
                let _ = writeln!(out, "  {}: unavailable ({})", tf.timeframe, reason);
            }
        }
    }

    match &r.volume {
        Section::Available(v) => {
            let _ = writeln!(out, "  volume: {:+.1}% {:?}", v.change_pct, v.character);
        }
        Section::Unavailable { reason } => {
            let _ = writeln!(out, "  volume: unavailable ({})", reason);
        }
    }

    match &r.futures {
        Section::Available(f) => {
            let funding = match (f.funding_bias, f.funding_rate_pct) {
                (FundingBias::Unknown, _) | (_, None) => "funding n/a".to_string(),
                (bias, Some(pct)) => format!("funding {:.4}% {:?}", pct, bias),
            };
            let ratio = match f.long_short {
                LongShortReading::Absent => "L/S absent".to_string(),
                LongShortReading::LongHeavy(v) => format!("L/S {:.2} long-heavy", v),
                LongShortReading::ShortHeavy(v) => format!("L/S {:.2} short-heavy", v),
                LongShortReading::Balanced(v) => format!("L/S {:.2} balanced", v),
            };
            let _ = writeln!(out, "  futures: {}, {}", funding, ratio);
        }
        Section::Unavailable { reason } => {
            let _ = writeln!(out, "  futures: unavailable ({})", reason);
        }
    }

    match &r.chips {
        Section::Available(c) => {
            let _ = writeln!(
                out,
                "  chips: {:.1}% in {:.4}-{:.4}, profit ratio {:.1}% {:?}",
                c.concentration_pct, c.dominant_low, c.dominant_high, c.profit_ratio_pct, c.pressure
            );
        }
        Section::Unavailable { reason } => {
            let _ = writeln!(out, "  chips: unavailable ({})", reason);
        }
    }

    if let Some(valuation) = &r.valuation {
        match valuation {
            Section::Available(v) => {
                let _ = writeln!(
                    out,
                    "  valuation: mvrv-z {:?} {:?}, nvt {:?} {:?} -> {}",
                    v.mvrv_z, v.mvrv_band, v.nvt, v.nvt_band, v.lean
                );
            }
            Section::Unavailable { reason } => {
                let _ = writeln!(out, "  valuation: unavailable ({})", reason);
            }
        }
    }

    let b = &r.price_bands;
    let _ = writeln!(
        out,
        "  entry {:.4}-{:.4}, take profit {:.4}, stop loss {:.4}, size {}",
        b.entry_low, b.entry_high, b.take_profit, b.stop_loss, r.position_hint
    );
    for note in &r.risk_notes {
        let _ = writeln!(out, "  risk: {}", note);
    }

    out.trim_end().to_string()
}

fn ma_position(above: Option<bool>, ma: Option<f64>) -> String {
    match (above, ma) {
        (Some(true), Some(ma)) => format!("above {:.4}", ma),
        (Some(false), Some(ma)) => format!("below {:.4}", ma),
        _ => "n/a vs".to_string(),
    }
}
