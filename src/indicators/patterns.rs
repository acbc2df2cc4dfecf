//! Candlestick patterns and RSI divergence

use crate::types::{Candle, Direction};

use super::momentum::rsi_series;

/// Engulfing pattern on the last two bars of `candles`
pub fn engulfing(candles: &[Candle]) -> Option<Direction> {
    let [prev, curr] = match candles {
        [.., a, b] => [a, b],
        _ => return None,
    };

    let prev_body = (prev.close - prev.open).abs();
    let curr_body = (curr.close - curr.open).abs();
    if curr_body <= prev_body {
        return None;
    }

    if prev.is_bearish() && curr.is_bullish() && curr.open <= prev.close && curr.close >= prev.open {
        return Some(Direction::Long);
    }
    if prev.is_bullish() && curr.is_bearish() && curr.open >= prev.close && curr.close <= prev.open {
        return Some(Direction::Short);
    }
    None
}

/// Pin bar (long rejection wick) on the last bar of `candles`
pub fn pin_bar(candles: &[Candle]) -> Option<Direction> {
    let bar = candles.last()?;
    let range = bar.high - bar.low;
    if range <= 0.0 {
        return None;
    }

    let body = (bar.close - bar.open).abs();
    let upper_wick = bar.high - bar.open.max(bar.close);
    let lower_wick = bar.open.min(bar.close) - bar.low;

    if lower_wick >= 2.0 * body && lower_wick >= 0.6 * range {
        Some(Direction::Long)
    } else if upper_wick >= 2.0 * body && upper_wick >= 0.6 * range {
        Some(Direction::Short)
    } else {
        None
    }
}

/// Regular RSI divergence over the trailing `lookback` closes.
///
/// Bullish: the latest price pivot low undercuts the previous one while RSI
/// makes a higher low. Bearish mirrors this on pivot highs.
pub fn rsi_divergence(closes: &[f64], period: usize, lookback: usize) -> (bool, bool) {
    let series = rsi_series(closes, period);
    let start = closes.len().saturating_sub(lookback);

    let mut lows: Vec<(f64, f64)> = Vec::new();
    let mut highs: Vec<(f64, f64)> = Vec::new();

    for i in start.max(1)..closes.len().saturating_sub(1) {
        let Some(r) = series[i] else { continue };
        let (prev, curr, next) = (closes[i - 1], closes[i], closes[i + 1]);
        if curr < prev && curr < next {
            lows.push((curr, r));
        }
        if curr > prev && curr > next {
            highs.push((curr, r));
        }
    }

    let bullish = match lows.as_slice() {
        [.., (p1, r1), (p2, r2)] => p2 < p1 && r2 > r1,
        _ => false,
    };
    let bearish = match highs.as_slice() {
        [.., (p1, r1), (p2, r2)] => p2 > p1 && r2 < r1,
        _ => false,
    };

    (bullish, bearish)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullish_engulfing() {
        let candles = vec![
            Candle::new(0, 10.0, 10.2, 9.4, 9.5, 1.0),
            Candle::new(300, 9.4, 10.4, 9.3, 10.3, 1.0),
        ];
        assert_eq!(engulfing(&candles), Some(Direction::Long));
        assert_eq!(engulfing(&candles[..1]), None);
    }

    #[test]
    fn test_bearish_engulfing() {
        let candles = vec![
            Candle::new(0, 9.5, 10.1, 9.4, 10.0, 1.0),
            Candle::new(300, 10.1, 10.2, 9.2, 9.3, 1.0),
        ];
        assert_eq!(engulfing(&candles), Some(Direction::Short));
    }

    #[test]
    fn test_pin_bars() {
        let hammer = Candle::new(0, 10.0, 10.2, 8.0, 10.1, 1.0);
        assert_eq!(pin_bar(&[hammer]), Some(Direction::Long));

        let shooting_star = Candle::new(0, 10.0, 12.0, 9.9, 9.95, 1.0);
        assert_eq!(pin_bar(&[shooting_star]), Some(Direction::Short));

        let doji = Candle::new(0, 10.0, 10.0, 10.0, 10.0, 1.0);
        assert_eq!(pin_bar(&[doji]), None);
    }

    #[test]
    fn test_bullish_divergence() {
        // Sharp sell-off to a first low, bounce, then a slow grind to a marginally lower low
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64 * 0.1).collect();
        closes.extend([95.0, 90.0, 94.0, 95.0, 94.5, 94.0, 93.0, 92.0, 91.0, 90.5, 89.9, 90.4]);
        let (bullish, bearish) = rsi_divergence(&closes, 14, 30);
        assert!(bullish);
        assert!(!bearish);
    }

    #[test]
    fn test_divergence_needs_history() {
        assert_eq!(rsi_divergence(&[1.0, 2.0, 3.0], 14, 30), (false, false));
    }
}
