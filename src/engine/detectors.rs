//! Detector bank
//!
//! Independent strategy detectors run over the closed bars. Each one that
//! fires yields a signed candidate keyed `{DETECTOR}_{LONG|SHORT}`.

use serde::Serialize;

use crate::config::DetectorThresholds;
use crate::indicators::{
    bollinger, donchian_break, ema, engulfing, pin_bar, rsi, rsi_divergence, vwap, zscore,
};
use crate::types::{closed, closes, Candle, Direction, Strategy};

/// Minimum closed bars before any detector runs
pub const MIN_CLOSED_BARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Detector {
    Divergence,
    Engulfing,
    PinBar,
    Breakout,
    MeanReversion,
    TrendContinuation,
    VolatilityExpansion,
}

impl Detector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Detector::Divergence => "DIVERGENCE",
            Detector::Engulfing => "ENGULFING",
            Detector::PinBar => "PIN_BAR",
            Detector::Breakout => "BREAKOUT",
            Detector::MeanReversion => "MEAN_REVERSION",
            Detector::TrendContinuation => "TREND_CONTINUATION",
            Detector::VolatilityExpansion => "VOLATILITY_EXPANSION",
        }
    }

    /// Canonical strategy, `None` for pattern and divergence detectors
    pub fn canonical(&self) -> Option<Strategy> {
        match self {
            Detector::Breakout => Some(Strategy::Breakout),
            Detector::MeanReversion => Some(Strategy::MeanReversion),
            Detector::TrendContinuation => Some(Strategy::TrendContinuation),
            Detector::VolatilityExpansion => Some(Strategy::VolatilityExpansion),
            Detector::Divergence | Detector::Engulfing | Detector::PinBar => None,
        }
    }
}

/// One fired detector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub key: String,
    pub detector: Detector,
    pub points: i32,
    pub code: &'static str,
}

impl Candidate {
    pub fn new(detector: Detector, points: i32, code: &'static str) -> Self {
        let side = if points >= 0 { "LONG" } else { "SHORT" };
        Self {
            key: format!("{}_{}", detector.as_str(), side),
            detector,
            points,
            code,
        }
    }

    pub fn direction(&self) -> Direction {
        Direction::from_sign(self.points as f64)
    }
}

fn signed(direction: Direction, points: i32) -> i32 {
    match direction {
        Direction::Short => -points,
        _ => points,
    }
}

/// Run every detector. `candles` includes the forming bar.
pub fn run_detectors(candles: &[Candle], cfg: &DetectorThresholds) -> Vec<Candidate> {
    let completed = closed(candles);
    let prices = closes(completed);
    if prices.len() < MIN_CLOSED_BARS {
        return Vec::new();
    }

    let pts = &cfg.points;
    let last = prices[prices.len() - 1];
    let mut out = Vec::new();

    let (bull_div, bear_div) = rsi_divergence(&prices, cfg.rsi_period, cfg.divergence_lookback);
    if bull_div {
        out.push(Candidate::new(Detector::Divergence, pts.divergence, "RSI_DIV_BULL"));
    }
    if bear_div {
        out.push(Candidate::new(Detector::Divergence, -pts.divergence, "RSI_DIV_BEAR"));
    }

    if let Some(dir) = engulfing(completed) {
        let code = if dir == Direction::Long { "ENGULFING_BULL" } else { "ENGULFING_BEAR" };
        out.push(Candidate::new(Detector::Engulfing, signed(dir, pts.pattern), code));
    }

    if let Some(dir) = pin_bar(completed) {
        let code = if dir == Direction::Long { "PIN_BAR_BULL" } else { "PIN_BAR_BEAR" };
        out.push(Candidate::new(Detector::PinBar, signed(dir, pts.pattern), code));
    }

    let (up_break, down_break) = donchian_break(candles, cfg.donchian_lookback);
    if up_break {
        out.push(Candidate::new(Detector::Breakout, pts.breakout, "DONCHIAN_BREAK"));
    } else if down_break {
        out.push(Candidate::new(Detector::Breakout, -pts.breakout, "DONCHIAN_BREAK"));
    }

    let z = zscore(&prices, cfg.zscore_period).unwrap_or(0.0);
    let strength = rsi(&prices, cfg.rsi_period).unwrap_or(50.0);
    if z.abs() > cfg.zscore_extreme {
        if z < 0.0 && strength < cfg.rsi_oversold {
            out.push(Candidate::new(Detector::MeanReversion, pts.mean_reversion, "ZSCORE_EXTREME"));
        } else if z > 0.0 && strength > cfg.rsi_overbought {
            out.push(Candidate::new(Detector::MeanReversion, -pts.mean_reversion, "ZSCORE_EXTREME"));
        }
    }

    let window = &completed[completed.len().saturating_sub(cfg.vwap_window)..];
    if let (Some(fast), Some(slow), Some(anchor)) = (ema(&prices, 9), ema(&prices, 21), vwap(window)) {
        if fast > slow && last > anchor {
            out.push(Candidate::new(Detector::TrendContinuation, pts.trend_continuation, "VWAP_RECLAIM"));
        } else if fast < slow && last < anchor {
            out.push(Candidate::new(Detector::TrendContinuation, -pts.trend_continuation, "VWAP_REJECT"));
        }
    }

    if let Some(bands) = bollinger(&prices, cfg.bb_period, cfg.bb_std) {
        if last > bands.upper {
            out.push(Candidate::new(Detector::VolatilityExpansion, pts.volatility_expansion, "BB_EXPANSION"));
        } else if last < bands.lower {
            out.push(Candidate::new(Detector::VolatilityExpansion, -pts.volatility_expansion, "BB_EXPANSION"));
        }
    }

    out
}
