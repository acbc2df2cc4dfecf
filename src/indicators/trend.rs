//! Trend indicators
//!
//! - SMA / EMA (SMA-seeded)
//! - ADX with Wilder-smoothed directional movement
//! - VWAP over a window

use crate::types::Candle;

use super::volatility::true_range;

/// Simple moving average of the last `period` values
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let recent = &values[values.len() - period..];
    Some(recent.iter().sum::<f64>() / period as f64)
}

/// Exponential moving average seeded with the mean of the first `period` values
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    for value in &values[period..] {
        ema = (value - ema) * k + ema;
    }

    Some(ema)
}

/// Average Directional Index
///
/// TR, +DM and -DM are Wilder-smoothed from a `period`-bar seed; the result
/// is the mean of the last `period` DX readings.
pub fn adx(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 2 {
        return None;
    }

    let mut trs = Vec::with_capacity(candles.len() - 1);
    let mut plus_dm = Vec::with_capacity(candles.len() - 1);
    let mut minus_dm = Vec::with_capacity(candles.len() - 1);

    for pair in candles.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let up_move = curr.high - prev.high;
        let down_move = prev.low - curr.low;

        plus_dm.push(if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 });
        minus_dm.push(if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 });
        trs.push(true_range(curr, prev));
    }

    let n = period as f64;
    let mut tr_smooth: f64 = trs[..period].iter().sum();
    let mut plus_smooth: f64 = plus_dm[..period].iter().sum();
    let mut minus_smooth: f64 = minus_dm[..period].iter().sum();

    let mut dxs = Vec::new();
    for i in period..trs.len() {
        tr_smooth = tr_smooth - tr_smooth / n + trs[i];
        plus_smooth = plus_smooth - plus_smooth / n + plus_dm[i];
        minus_smooth = minus_smooth - minus_smooth / n + minus_dm[i];

        let (pdi, mdi) = if tr_smooth > 0.0 {
            (100.0 * plus_smooth / tr_smooth, 100.0 * minus_smooth / tr_smooth)
        } else {
            (0.0, 0.0)
        };
        dxs.push(if pdi + mdi > 0.0 {
            100.0 * (pdi - mdi).abs() / (pdi + mdi)
        } else {
            0.0
        });
    }

    if dxs.is_empty() {
        return None;
    }
    let take = dxs.len().min(period);
    Some(dxs[dxs.len() - take..].iter().sum::<f64>() / take as f64)
}

/// Volume weighted average of the typical price, no decay
pub fn vwap(candles: &[Candle]) -> Option<f64> {
    let (pv, volume) = candles.iter().fold((0.0, 0.0), |(pv, vol), c| {
        let typical = (c.high + c.low + c.close) / 3.0;
        (pv + typical * c.volume, vol + c.volume)
    });

    if volume > 0.0 {
        Some(pv / volume)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_matches_closed_form() {
        let values: Vec<f64> = (1..=30).map(|v| v as f64).collect();
        let period = 9;

        // Seed with the mean of 1..=9, then apply the recursion explicitly
        let k = 2.0 / (period as f64 + 1.0);
        let mut expected = 5.0;
        for v in 10..=30 {
            expected = expected + k * (v as f64 - expected);
        }

        let got = ema(&values, period).unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn test_ema_insufficient_history() {
        assert!(ema(&[1.0, 2.0], 3).is_none());
        assert!(ema(&[1.0, 2.0], 0).is_none());
        assert_eq!(ema(&[2.0, 4.0, 6.0], 3), Some(4.0));
    }

    #[test]
    fn test_sma_uses_trailing_window() {
        assert_eq!(sma(&[1.0, 2.0, 3.0, 4.0], 2), Some(3.5));
        assert!(sma(&[1.0], 2).is_none());
    }

    #[test]
    fn test_adx_strong_trend() {
        let candles: Vec<Candle> = (0..60)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                Candle::new(i * 300, base, base + 1.0, base - 0.5, base + 0.8, 10.0)
            })
            .collect();
        let value = adx(&candles, 14).unwrap();
        assert!(value > 50.0, "adx was {}", value);
        assert!(adx(&candles[..10], 14).is_none());
    }

    #[test]
    fn test_vwap_weights_by_volume() {
        let candles = vec![
            Candle::new(0, 10.0, 10.0, 10.0, 10.0, 1.0),
            Candle::new(300, 20.0, 20.0, 20.0, 20.0, 3.0),
        ];
        assert_eq!(vwap(&candles), Some(17.5));
        assert!(vwap(&[]).is_none());
        assert!(vwap(&[Candle::new(0, 1.0, 1.0, 1.0, 1.0, 0.0)]).is_none());
    }
}
