//! Price levels: Donchian breaks, swing pivots, volume delta

use crate::types::{closed, Candle};

/// Whether the last completed bar closed above / below the channel formed
/// by the `lookback` completed bars before it. `candles` includes the
/// forming bar.
pub fn donchian_break(candles: &[Candle], lookback: usize) -> (bool, bool) {
    let completed = closed(candles);
    if lookback == 0 || completed.len() < lookback + 1 {
        return (false, false);
    }

    let last = completed[completed.len() - 1];
    let channel = &completed[completed.len() - 1 - lookback..completed.len() - 1];
    let high = channel.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = channel.iter().map(|c| c.low).fold(f64::MAX, f64::min);

    (last.close > high, last.close < low)
}

/// Clustered pivot levels, ascending
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwingLevels {
    pub supports: Vec<f64>,
    pub resistances: Vec<f64>,
}

impl SwingLevels {
    /// Highest support strictly between `floor` and `price`
    pub fn nearest_support_between(&self, floor: f64, price: f64) -> Option<f64> {
        self.supports
            .iter()
            .copied()
            .filter(|s| *s > floor && *s < price)
            .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
    }

    /// Lowest resistance strictly between `price` and `ceiling`
    pub fn nearest_resistance_between(&self, price: f64, ceiling: f64) -> Option<f64> {
        self.resistances
            .iter()
            .copied()
            .filter(|r| *r > price && *r < ceiling)
            .fold(None, |best: Option<f64>, r| Some(best.map_or(r, |b| b.min(r))))
    }
}

/// Local highs and lows over the trailing `lookback` bars, merged when they
/// sit within `tolerance` (relative) of each other.
pub fn swing_levels(candles: &[Candle], lookback: usize, tolerance: f64) -> SwingLevels {
    if candles.len() < 3 {
        return SwingLevels::default();
    }

    let recent = &candles[candles.len().saturating_sub(lookback)..];
    let mut highs = Vec::new();
    let mut lows = Vec::new();

    for w in recent.windows(3) {
        let (prev, curr, next) = (&w[0], &w[1], &w[2]);
        if curr.high > prev.high && curr.high > next.high {
            highs.push(curr.high);
        }
        if curr.low < prev.low && curr.low < next.low {
            lows.push(curr.low);
        }
    }

    SwingLevels {
        supports: cluster(lows, tolerance),
        resistances: cluster(highs, tolerance),
    }
}

fn cluster(mut values: Vec<f64>, tolerance: f64) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));

    let mut clusters: Vec<Vec<f64>> = Vec::new();
    for value in values {
        match clusters.last_mut() {
            Some(group) => {
                let mean = group.iter().sum::<f64>() / group.len() as f64;
                if mean != 0.0 && ((value - mean) / mean).abs() <= tolerance {
                    group.push(value);
                } else {
                    clusters.push(vec![value]);
                }
            }
            None => clusters.push(vec![value]),
        }
    }

    clusters
        .into_iter()
        .map(|group| group.iter().sum::<f64>() / group.len() as f64)
        .collect()
}

/// Net signed volume: bullish bodies add, bearish bodies subtract
pub fn volume_delta(candles: &[Candle]) -> f64 {
    candles
        .iter()
        .map(|c| {
            if c.is_bullish() {
                c.volume
            } else if c.is_bearish() {
                -c.volume
            } else {
                0.0
            }
        })
        .sum()
}
