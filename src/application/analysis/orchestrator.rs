use crate::application::analysis::price_bands::{position_hint, price_bands, risk_notes};
use crate::application::analysis::sections::{
    chip_section, contain, futures_section, guard_section, valuation_section, volume_section,
};
use crate::application::market_data::indicator_engine::IndicatorEngine;
use crate::application::market_data::volatility::{DEFAULT_LOOKBACK, recent_range_pct};
use crate::application::market_data::volume_profile::{DEFAULT_BINS, VolumeProfile};
use crate::application::signals::classifier::classify_snapshot;
use crate::application::signals::combiner::combine;
use crate::config::AnalysisEnvConfig;
use crate::domain::analysis::{
    AnalysisFailure, AnalysisOutcome, AnalysisReport, Notice, NoticeKind, Section,
    TimeframeAnalysis, TimeframeSection,
};
use crate::domain::errors::{AnalysisError, DataUnavailable};
use crate::domain::market::candle::{Candle, IndicatorSnapshot};
use crate::domain::market::strategy_tier::StrategyTier;
use crate::domain::market::symbol::TradingPair;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{AuxiliaryMetricsProvider, CandleSeriesProvider};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One timeframe's series after enrichment, with its classification
struct LoadedTimeframe {
    series: Vec<Candle>,
    snapshot: IndicatorSnapshot,
    analysis: TimeframeAnalysis,
}

/// Turns (symbol, strategy) into a structured report.
///
/// Never returns an error: missing data degrades individual sections, and
/// only a request where no timeframe produced anything becomes
/// `AnalysisOutcome::Failed`.
pub struct AnalysisOrchestrator {
    candles: Arc<dyn CandleSeriesProvider>,
    metrics: Arc<dyn AuxiliaryMetricsProvider>,
    config: AnalysisEnvConfig,
}

impl AnalysisOrchestrator {
    pub fn new(
        candles: Arc<dyn CandleSeriesProvider>,
        metrics: Arc<dyn AuxiliaryMetricsProvider>,
        config: AnalysisEnvConfig,
    ) -> Self {
        Self {
            candles,
            metrics,
            config,
        }
    }

    pub fn config(&self) -> &AnalysisEnvConfig {
        &self.config
    }

    pub async fn analyze(&self, symbol: &str, strategy: &str) -> AnalysisOutcome {
        let mut notices = Vec::new();

        let (tier, fallback) = StrategyTier::resolve(strategy);
        if let Some(fb) = &fallback {
            info!(
                "Orchestrator: Unknown strategy '{}', falling back to {}",
                fb.requested, fb.applied
            );
            notices.push(Notice {
                kind: NoticeKind::StrategyFallback,
                message: format!(
                    "Strategy '{}' is not recognised; using {} instead",
                    fb.requested, fb.applied
                ),
            });
        }

        let pair = match self.resolve_pair(symbol, &mut notices) {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Orchestrator: {}", e);
                return AnalysisOutcome::Failed(AnalysisFailure {
                    symbol: symbol.to_string(),
                    strategy: tier.to_string(),
                    reason: e.to_string(),
                    notices,
                });
            }
        };

        let timeframes = tier.timeframes();
        info!("Orchestrator [{}]: Analyzing {} on {:?}", pair, tier, timeframes);

        let loads = join_all(timeframes.iter().map(|tf| self.load_timeframe(&pair, *tf)));
        let onchain = async {
            if tier.includes_valuation() {
                Some(self.metrics.onchain_metrics(&pair).await)
            } else {
                None
            }
        };
        let (loaded, futures_metrics, onchain_metrics) =
            tokio::join!(loads, self.metrics.futures_metrics(&pair), onchain);

        let mut timeframe_sections = Vec::with_capacity(timeframes.len());
        let mut available: Vec<LoadedTimeframe> = Vec::new();
        for (timeframe, result) in timeframes.iter().copied().zip(loaded) {
            match result {
                Ok(tf) => {
                    timeframe_sections.push(TimeframeSection {
                        timeframe,
                        analysis: Section::Available(tf.analysis.clone()),
                    });
                    available.push(tf);
                }
                Err(e) => {
                    warn!("Orchestrator [{}]: {} degraded: {}", pair, timeframe, e);
                    timeframe_sections.push(TimeframeSection {
                        timeframe,
                        analysis: Section::unavailable(e.to_string()),
                    });
                }
            }
        }

        let Some(headline) = self.pick_headline(tier, &available, &mut notices) else {
            warn!("Orchestrator [{}]: No timeframe produced data", pair);
            return AnalysisOutcome::Failed(AnalysisFailure {
                symbol: pair.symbol(),
                strategy: tier.to_string(),
                reason: format!("No data for {} on any of {:?}", pair, timeframes),
                notices,
            });
        };

        // Shortest available timeframe carries the freshest close
        let current_price = available
            .first()
            .map(|tf| tf.snapshot.price())
            .unwrap_or_else(|| headline.snapshot.price());

        let volume = guard_section("volume", || volume_section(&headline.snapshot));
        let futures_sec = guard_section("futures", || {
            futures_section(&futures_metrics.map_err(AnalysisError::from)?)
        });
        let chips = guard_section("chips", || {
            let profile = VolumeProfile::from_series(&headline.series, DEFAULT_BINS);
            chip_section(profile.as_ref(), current_price)
        });
        let valuation = onchain_metrics.map(|result| {
            guard_section("valuation", || valuation_section(&result.map_err(AnalysisError::from)?))
        });

        let signal = headline.analysis.combined;
        let recent_range = recent_range_pct(&headline.series, DEFAULT_LOOKBACK);
        let bands = price_bands(current_price, signal.direction, tier, recent_range);
        let notes = risk_notes(
            headline.snapshot.latest.indicators.rsi,
            &volume,
            &futures_sec,
            &chips,
            fallback.as_ref(),
        );

        debug!(
            "Orchestrator [{}]: headline {} {} ({:.2}) on {}",
            pair, signal.direction, signal.strength, signal.total_strength, headline.snapshot.timeframe
        );

        AnalysisOutcome::Report(Box::new(AnalysisReport {
            symbol: pair.symbol(),
            requested_symbol: symbol.to_string(),
            strategy: tier,
            strategy_fallback: fallback,
            notices,
            generated_at: Utc::now(),
            current_price,
            headline_timeframe: headline.snapshot.timeframe,
            headline: signal,
            timeframes: timeframe_sections,
            volume,
            futures: futures_sec,
            chips,
            valuation,
            price_bands: bands,
            position_hint: position_hint(&signal),
            risk_notes: notes,
        }))
    }

    fn resolve_pair(
        &self,
        symbol: &str,
        notices: &mut Vec<Notice>,
    ) -> Result<TradingPair, AnalysisError> {
        match TradingPair::parse(symbol, &self.config.quote_asset) {
            Ok(pair) => Ok(pair),
            Err(reason) => {
                let pair = TradingPair::parse(&self.config.default_symbol, &self.config.quote_asset)
                    .map_err(|default_reason| AnalysisError::InvalidInput {
                        field: "DEFAULT_SYMBOL".to_string(),
                        value: self.config.default_symbol.clone(),
                        reason: default_reason,
                    })?;
                info!("Orchestrator: Invalid symbol '{}' ({}), using {}", symbol, reason, pair);
                notices.push(Notice {
                    kind: NoticeKind::SymbolFallback,
                    message: format!("Symbol '{}' is not valid ({}); using {}", symbol, reason, pair),
                });
                Ok(pair)
            }
        }
    }

    async fn load_timeframe(
        &self,
        pair: &TradingPair,
        timeframe: Timeframe,
    ) -> Result<LoadedTimeframe, AnalysisError> {
        let mut series = self
            .candles
            .fetch_series(pair, timeframe, self.config.candle_count)
            .await?;
        if series.is_empty() {
            return Err(DataUnavailable::new(
                format!("{} {} candles", pair, timeframe),
                "provider returned an empty series",
            )
            .into());
        }

        contain(&format!("{} analysis", timeframe), move || {
            IndicatorEngine::enrich(&mut series)?;
            let snapshot = IndicatorSnapshot::from_series(timeframe, &series)?;
            let verdicts = classify_snapshot(&snapshot);
            let analysis = TimeframeAnalysis {
                timeframe,
                close: snapshot.price(),
                ma20: snapshot.latest.indicators.ma20.filter(|v| v.is_finite()),
                ma50: snapshot.latest.indicators.ma50.filter(|v| v.is_finite()),
                verdicts,
                combined: combine(&verdicts),
            };
            Ok(LoadedTimeframe {
                series,
                snapshot,
                analysis,
            })
        })
    }

    /// The tier's primary timeframe, or the first available one with a notice.
    fn pick_headline<'a>(
        &self,
        tier: StrategyTier,
        available: &'a [LoadedTimeframe],
        notices: &mut Vec<Notice>,
    ) -> Option<&'a LoadedTimeframe> {
        let primary = tier.primary_timeframe();
        if let Some(tf) = available.iter().find(|tf| tf.snapshot.timeframe == primary) {
            return Some(tf);
        }
        let substitute = available.first()?;
        notices.push(Notice {
            kind: NoticeKind::HeadlineFallback,
            message: format!(
                "{} data unavailable; headline uses {} instead",
                primary, substitute.snapshot.timeframe
            ),
        });
        Some(substitute)
    }
}
