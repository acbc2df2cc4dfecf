//! Volatility indicators: true range, ATR, Bollinger and Keltner bands

use serde::Serialize;

use crate::types::Candle;

use super::momentum::mean_std;

/// Upper/mid/lower band triple
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bands {
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
}

impl Bands {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Whether `self` sits strictly inside `outer`
    pub fn inside(&self, outer: &Bands) -> bool {
        self.lower > outer.lower && self.upper < outer.upper
    }
}

pub fn true_range(curr: &Candle, prev: &Candle) -> f64 {
    (curr.high - curr.low)
        .max((curr.high - prev.close).abs())
        .max((curr.low - prev.close).abs())
}

/// Simple mean of the trailing `period` true ranges
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }
    let recent = &candles[candles.len() - period - 1..];
    let sum: f64 = recent.windows(2).map(|w| true_range(&w[1], &w[0])).sum();
    Some(sum / period as f64)
}

/// SMA +/- `multiplier` population standard deviations
pub fn bollinger(values: &[f64], period: usize, multiplier: f64) -> Option<Bands> {
    if period == 0 || values.len() < period {
        return None;
    }
    let (mid, std) = mean_std(&values[values.len() - period..]);
    Some(Bands {
        upper: mid + multiplier * std,
        mid,
        lower: mid - multiplier * std,
    })
}

/// SMA of closes +/- `atr_mult` x ATR
pub fn keltner(candles: &[Candle], period: usize, atr_mult: f64) -> Option<Bands> {
    if period == 0 || candles.len() < period {
        return None;
    }
    let mid = candles[candles.len() - period..]
        .iter()
        .map(|c| c.close)
        .sum::<f64>()
        / period as f64;
    let range = atr(candles, period)?;
    Some(Bands {
        upper: mid + atr_mult * range,
        mid,
        lower: mid - atr_mult * range,
    })
}
