//! Momentum and distribution indicators

/// Wilder RSI series aligned to `values`: entry `i` is the RSI using
/// `values[..=i]`, `None` until `period + 1` values exist.
pub fn rsi_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period + 1 {
        return out;
    }

    let n = period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let delta = values[i] - values[i - 1];
        avg_gain += delta.max(0.0);
        avg_loss += (-delta).max(0.0);
    }
    avg_gain /= n;
    avg_loss /= n;
    out[period] = Some(rsi_from(avg_gain, avg_loss));

    for i in period + 1..values.len() {
        let delta = values[i] - values[i - 1];
        avg_gain = (avg_gain * (n - 1.0) + delta.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-delta).max(0.0)) / n;
        out[i] = Some(rsi_from(avg_gain, avg_loss));
    }

    out
}

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Wilder RSI of the full series
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    rsi_series(values, period).last().copied().flatten()
}

/// Population standard deviation and mean
pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Z-score of the last value against the trailing `period` window
pub fn zscore(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let recent = &values[values.len() - period..];
    let (mean, sigma) = mean_std(recent);
    if sigma > 0.0 {
        Some((recent[period - 1] - mean) / sigma)
    } else {
        Some(0.0)
    }
}

/// Percentage of `history` at or below `value`
pub fn percentile_rank(history: &[f64], value: f64) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let count = history.iter().filter(|v| **v <= value).count();
    Some(count as f64 / history.len() as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_all_gains() {
        let values: Vec<f64> = (0..20).map(|v| v as f64).collect();
        assert_eq!(rsi(&values, 14), Some(100.0));
    }

    #[test]
    fn test_rsi_balanced_moves() {
        let values: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let value = rsi(&values, 14).unwrap();
        assert!(value > 40.0 && value < 60.0, "rsi was {}", value);
    }

    #[test]
    fn test_rsi_series_alignment() {
        let values: Vec<f64> = (0..20).map(|v| v as f64).collect();
        let series = rsi_series(&values, 14);
        assert_eq!(series.len(), 20);
        assert!(series[13].is_none());
        assert!(series[14].is_some());
        assert!(rsi(&values[..14], 14).is_none());
    }

    #[test]
    fn test_zscore_flat_series_is_zero() {
        assert_eq!(zscore(&[5.0; 20], 20), Some(0.0));
        assert!(zscore(&[5.0; 5], 20).is_none());
    }

    #[test]
    fn test_zscore_outlier() {
        let mut values = vec![10.0; 19];
        values.push(20.0);
        assert!(zscore(&values, 20).unwrap() > 4.0);
    }

    #[test]
    fn test_percentile_rank() {
        let history = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_rank(&history, 2.0), Some(50.0));
        assert_eq!(percentile_rank(&history, 10.0), Some(100.0));
        assert!(percentile_rank(&[], 1.0).is_none());
    }
}
