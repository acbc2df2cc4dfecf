//! Regime classifier
//!
//! Labels a window as trend / range / vol_chop / chop from ADX, the
//! EMA9-EMA21 slope and the ATR percentile. With enough history the label
//! must hold for three consecutive bars before it is reported.

use crate::config::RegimeThresholds;
use crate::indicators::{adx, atr, ema, percentile_rank};
use crate::types::{closed, closes, Candle, Regime};

/// Classified regime with its score contribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeVerdict {
    pub regime: Regime,
    pub points: f64,
    pub code: &'static str,
}

const ATR_PERIOD: usize = 14;
const DEFAULT_ADX: f64 = 18.0;
const DEFAULT_ATR_RANK: f64 = 50.0;

/// Single-window label, no persistence
pub fn raw_label(candles: &[Candle], cfg: &RegimeThresholds) -> Regime {
    let completed = closed(candles);
    let prices = closes(completed);

    let adx_value = adx(completed, cfg.adx_period).unwrap_or(DEFAULT_ADX);
    let slope = match (ema(&prices, 9), ema(&prices, 21)) {
        (Some(fast), Some(slow)) if slow != 0.0 => (fast - slow) / slow,
        _ => 0.0,
    };

    let local_atr = atr(completed, ATR_PERIOD).unwrap_or(0.0);
    let history: Vec<f64> = (20..candles.len())
        .filter_map(|i| atr(&candles[..i], ATR_PERIOD))
        .collect();
    let rank = percentile_rank(&history, local_atr).unwrap_or(DEFAULT_ATR_RANK);

    if adx_value > cfg.adx_trend && slope.abs() > cfg.slope_trend {
        Regime::Trend
    } else if rank > cfg.atr_rank_chop && adx_value < cfg.adx_chop {
        Regime::VolChop
    } else if adx_value < cfg.adx_low && rank < cfg.atr_rank_low {
        Regime::Chop
    } else {
        Regime::Range
    }
}

/// Apply the 3-bar persistence rule to labels for t, t-1 and t-2
pub fn persist(current: Regime, prev: Regime, prev2: Regime) -> Regime {
    if current == prev && prev == prev2 {
        current
    } else if prev == prev2 {
        prev
    } else {
        Regime::Range
    }
}

pub fn classify(candles: &[Candle], cfg: &RegimeThresholds) -> RegimeVerdict {
    let n = candles.len();
    let regime = if n >= cfg.persistence_min_bars && n >= 3 {
        persist(
            raw_label(candles, cfg),
            raw_label(&candles[..n - 1], cfg),
            raw_label(&candles[..n - 2], cfg),
        )
    } else {
        raw_label(candles, cfg)
    };
    verdict(regime, cfg)
}

fn verdict(regime: Regime, cfg: &RegimeThresholds) -> RegimeVerdict {
    let (points, code) = match regime {
        Regime::Trend => (cfg.trend_points, "REGIME_TREND"),
        Regime::VolChop => (cfg.vol_chop_points, "REGIME_VOL_CHOP"),
        Regime::Chop => (cfg.chop_points, "REGIME_CHOP"),
        Regime::Range => (cfg.range_points, "REGIME_RANGE"),
    };
    RegimeVerdict {
        regime,
        points,
        code,
    }
}
