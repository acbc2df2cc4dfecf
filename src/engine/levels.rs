//! Trade-level builder: entry zone, invalidation, targets and R:R

use serde::Serialize;

use crate::config::{DetectorThresholds, LevelMultipliers};
use crate::indicators::{atr, swing_levels, SwingLevels};
use crate::types::{Candle, Direction};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeLevels {
    pub entry_zone: String,
    pub invalidation: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub rr_ratio: f64,
    pub atr: f64,
}

/// ATR(14) on closed bars, falling back to 0.2% of price
pub fn level_atr(completed: &[Candle], price: f64) -> f64 {
    atr(completed, 14).unwrap_or(price * 0.002)
}

/// Levels from an explicit ATR and swing set. Swing levels may tighten the
/// stop or pull in TP1, never the reverse.
pub fn compute_levels(
    direction: Direction,
    price: f64,
    atr: f64,
    mult: &LevelMultipliers,
    swings: &SwingLevels,
) -> TradeLevels {
    let (invalidation, tp1, tp2) = match direction {
        Direction::Long => {
            let raw_inv = price - mult.inv * atr;
            let raw_tp1 = price + mult.tp1 * atr;
            (
                swings.nearest_support_between(raw_inv, price).unwrap_or(raw_inv),
                swings.nearest_resistance_between(price, raw_tp1).unwrap_or(raw_tp1),
                price + mult.tp2 * atr,
            )
        }
        Direction::Short => {
            let raw_inv = price + mult.inv * atr;
            let raw_tp1 = price - mult.tp1 * atr;
            (
                swings.nearest_resistance_between(price, raw_inv).unwrap_or(raw_inv),
                swings.nearest_support_between(raw_tp1, price).unwrap_or(raw_tp1),
                price - mult.tp2 * atr,
            )
        }
        Direction::Neutral => {
            return TradeLevels {
                entry_zone: "-".to_string(),
                invalidation: 0.0,
                tp1: 0.0,
                tp2: 0.0,
                rr_ratio: 0.0,
                atr,
            }
        }
    };

    let risk = (price - invalidation).abs().max(1e-6);
    let rr_ratio = (tp1 - price).abs() / risk;
    let entry_zone = format!(
        "{}-{}",
        thousands(price - 0.1 * atr),
        thousands(price + 0.1 * atr)
    );

    TradeLevels {
        entry_zone,
        invalidation,
        tp1,
        tp2,
        rr_ratio,
        atr,
    }
}

/// Levels for a closed-bar window
pub fn build_levels(
    direction: Direction,
    price: f64,
    completed: &[Candle],
    mult: &LevelMultipliers,
    cfg: &DetectorThresholds,
) -> TradeLevels {
    let range = level_atr(completed, price);
    let swings = swing_levels(completed, cfg.swing_lookback, cfg.swing_tolerance);
    compute_levels(direction, price, range, mult, &swings)
}

/// Low R:R and higher-timeframe disagreement vetoes
pub fn level_blockers(
    direction: Direction,
    rr_ratio: f64,
    min_rr: f64,
    timeframe: &str,
    t15: i32,
    t1h: i32,
) -> Vec<String> {
    let mut blockers = Vec::new();
    if direction == Direction::Neutral {
        return blockers;
    }
    if rr_ratio < min_rr {
        blockers.push("Low R:R".to_string());
    }

    let against = -direction.sign();
    if t1h == against || (timeframe == "5m" && t15 == against) {
        blockers.push("HTF conflict".to_string());
    }
    blockers
}

/// Round to a whole number with comma thousands separators
pub fn thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}
