use crate::domain::errors::AnalysisError;
use crate::domain::market::candle::{Candle, Indicators, finite};
use std::collections::VecDeque;
use ta::Next;
use ta::indicators::{
    BollingerBands, ExponentialMovingAverage, MovingAverageConvergenceDivergence,
    RelativeStrengthIndex, SimpleMovingAverage,
};

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BB_PERIOD: usize = 20;
pub const BB_MULTIPLIER: f64 = 2.0;
pub const BOX_PERIOD: usize = 20;
pub const VOLUME_MA_PERIOD: usize = 20;

/// Rolling highest-high / lowest-low over a fixed window
pub struct RollingExtremes {
    period: usize,
    highs: VecDeque<f64>,
    lows: VecDeque<f64>,
}

impl RollingExtremes {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            highs: VecDeque::with_capacity(period),
            lows: VecDeque::with_capacity(period),
        }
    }

    /// Returns `(high, low)` once the window is full
    pub fn next(&mut self, high: f64, low: f64) -> Option<(f64, f64)> {
        if self.highs.len() == self.period {
            self.highs.pop_front();
            self.lows.pop_front();
        }
        self.highs.push_back(high);
        self.lows.push_back(low);

        if self.highs.len() < self.period {
            return None;
        }
        let max = self.highs.iter().copied().fold(f64::MIN, f64::max);
        let min = self.lows.iter().copied().fold(f64::MAX, f64::min);
        Some((max, min))
    }
}

/// Streaming indicator calculator. Values are only emitted once the
/// indicator's warm-up window is covered; before that the field stays `None`.
pub struct IndicatorEngine {
    rsi: RelativeStrengthIndex,
    macd: MovingAverageConvergenceDivergence,
    ema5: ExponentialMovingAverage,
    ema13: ExponentialMovingAverage,
    ema20: ExponentialMovingAverage,
    ema50: ExponentialMovingAverage,
    ema100: ExponentialMovingAverage,
    ma20: SimpleMovingAverage,
    ma50: SimpleMovingAverage,
    volume_ma20: SimpleMovingAverage,
    bb: BollingerBands,
    box_range: RollingExtremes,
    seen: usize,
}

fn build<T>(result: ta::errors::Result<T>, name: &str) -> Result<T, AnalysisError> {
    result.map_err(|e| AnalysisError::ComputationFault {
        section: "indicators".to_string(),
        detail: format!("cannot build {}: {:?}", name, e),
    })
}

fn ready(seen: usize, warmup: usize, value: f64) -> Option<f64> {
    if seen >= warmup { finite(Some(value)) } else { None }
}

impl IndicatorEngine {
    pub fn new() -> Result<Self, AnalysisError> {
        Ok(Self {
            rsi: build(RelativeStrengthIndex::new(RSI_PERIOD), "rsi")?,
            macd: build(
                MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL),
                "macd",
            )?,
            ema5: build(ExponentialMovingAverage::new(5), "ema5")?,
            ema13: build(ExponentialMovingAverage::new(13), "ema13")?,
            ema20: build(ExponentialMovingAverage::new(20), "ema20")?,
            ema50: build(ExponentialMovingAverage::new(50), "ema50")?,
            ema100: build(ExponentialMovingAverage::new(100), "ema100")?,
            ma20: build(SimpleMovingAverage::new(20), "ma20")?,
            ma50: build(SimpleMovingAverage::new(50), "ma50")?,
            volume_ma20: build(SimpleMovingAverage::new(VOLUME_MA_PERIOD), "volume_ma20")?,
            bb: build(BollingerBands::new(BB_PERIOD, BB_MULTIPLIER), "bollinger")?,
            box_range: RollingExtremes::new(BOX_PERIOD),
            seen: 0,
        })
    }

    pub fn update(&mut self, candle: &Candle) -> Indicators {
        self.seen += 1;
        let n = self.seen;
        let close = candle.close;

        let rsi = self.rsi.next(close);
        let macd = self.macd.next(close);
        let bb = self.bb.next(close);
        let box_range = self.box_range.next(candle.high, candle.low);
        // RSI needs `period` price changes, i.e. one more close than its period
        let macd_warmup = MACD_SLOW + MACD_SIGNAL - 1;

        Indicators {
            rsi: ready(n, RSI_PERIOD + 1, rsi),
            macd: ready(n, macd_warmup, macd.macd),
            macd_signal: ready(n, macd_warmup, macd.signal),
            macd_histogram: ready(n, macd_warmup, macd.histogram),
            ema5: ready(n, 5, self.ema5.next(close)),
            ema13: ready(n, 13, self.ema13.next(close)),
            ema20: ready(n, 20, self.ema20.next(close)),
            ema50: ready(n, 50, self.ema50.next(close)),
            ema100: ready(n, 100, self.ema100.next(close)),
            ma20: ready(n, 20, self.ma20.next(close)),
            ma50: ready(n, 50, self.ma50.next(close)),
            volume_ma20: ready(n, VOLUME_MA_PERIOD, self.volume_ma20.next(candle.volume)),
            bb_upper: ready(n, BB_PERIOD, bb.upper),
            bb_middle: ready(n, BB_PERIOD, bb.average),
            bb_lower: ready(n, BB_PERIOD, bb.lower),
            box_high: box_range.and_then(|(h, _)| finite(Some(h))),
            box_low: box_range.and_then(|(_, l)| finite(Some(l))),
        }
    }

    /// Fills every indicator the provider left empty (or NaN). Provider values win.
    pub fn enrich(series: &mut [Candle]) -> Result<(), AnalysisError> {
        let mut engine = Self::new()?;
        for candle in series.iter_mut() {
            let computed = engine.update(candle);
            merge(&mut candle.indicators, computed);
        }
        Ok(())
    }
}

fn merge(target: &mut Indicators, computed: Indicators) {
    fn fill(slot: &mut Option<f64>, value: Option<f64>) {
        if finite(*slot).is_none() {
            *slot = value;
        }
    }

    fill(&mut target.rsi, computed.rsi);
    fill(&mut target.macd, computed.macd);
    fill(&mut target.macd_signal, computed.macd_signal);
    fill(&mut target.macd_histogram, computed.macd_histogram);
    fill(&mut target.ema5, computed.ema5);
    fill(&mut target.ema13, computed.ema13);
    fill(&mut target.ema20, computed.ema20);
    fill(&mut target.ema50, computed.ema50);
    fill(&mut target.ema100, computed.ema100);
    fill(&mut target.ma20, computed.ma20);
    fill(&mut target.ma50, computed.ma50);
    fill(&mut target.volume_ma20, computed.volume_ma20);
    fill(&mut target.bb_upper, computed.bb_upper);
    fill(&mut target.bb_middle, computed.bb_middle);
    fill(&mut target.bb_lower, computed.bb_lower);
    fill(&mut target.box_high, computed.box_high);
    fill(&mut target.box_low, computed.box_low);
}
