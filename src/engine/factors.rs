//! Aggregator factors
//!
//! Each factor inspects one slice of context and optionally returns a
//! signed contribution for one score bucket.

use crate::config::{DetectorThresholds, NewsRules, VixRules};
use crate::indicators::ema;
use crate::types::{
    closed, closes, Candle, DerivativesSnapshot, FearGreedSnapshot, FlowSnapshot, Headline,
    MacroContext,
};

use super::score::Bucket;

/// One factor's signed contribution
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub bucket: Bucket,
    pub delta: f64,
    pub code: String,
}

impl Contribution {
    fn new(bucket: Bucket, delta: f64, code: impl Into<String>) -> Self {
        Self {
            bucket,
            delta,
            code: code.into(),
        }
    }
}

const MIN_TREND_BARS: usize = 30;

fn ema_cross(prices: &[f64]) -> Option<i32> {
    let fast = ema(prices, 9)?;
    let slow = ema(prices, 21)?;
    Some(if fast > slow { 1 } else { -1 })
}

/// EMA9 vs EMA21 sign on closed bars, 0 without 30 closed bars
pub fn trend_bias(candles: &[Candle]) -> i32 {
    let prices = closes(closed(candles));
    if prices.len() < MIN_TREND_BARS {
        return 0;
    }
    ema_cross(&prices).unwrap_or(0)
}

pub fn ema_alignment(prices: &[f64]) -> Option<Contribution> {
    if prices.len() < MIN_TREND_BARS {
        return None;
    }
    match ema_cross(prices)? {
        1 => Some(Contribution::new(Bucket::TrendAlignment, 8.0, "EMA_BULL")),
        _ => Some(Contribution::new(Bucket::TrendAlignment, -8.0, "EMA_BEAR")),
    }
}

/// Last closed bar's volume against the average of the bars before it
pub fn volume_surge(completed: &[Candle], cfg: &DetectorThresholds) -> Option<Contribution> {
    let n = completed.len();
    if n < MIN_TREND_BARS || n <= cfg.volume_lookback {
        return None;
    }
    let last = completed[n - 1];
    let prior = &completed[n - 1 - cfg.volume_lookback..n - 1];
    let average = prior.iter().map(|c| c.volume).sum::<f64>() / cfg.volume_lookback as f64;

    if last.volume <= average * cfg.volume_multiplier {
        return None;
    }
    let delta = if last.close > completed[n - 2].close { 6.0 } else { -6.0 };
    Some(Contribution::new(Bucket::Volume, delta, "VOL_SURGE"))
}

pub fn htf_alignment(t15: i32, t1h: i32) -> Option<Contribution> {
    match (t15 + t1h).signum() {
        1 => Some(Contribution::new(Bucket::Htf, 8.0, "HTF_BULL")),
        -1 => Some(Contribution::new(Bucket::Htf, -8.0, "HTF_BEAR")),
        _ => None,
    }
}

/// Contrarian read of extreme fear / greed
pub fn fear_greed(snapshot: &FearGreedSnapshot) -> Option<Contribution> {
    if !snapshot.healthy {
        return None;
    }
    if snapshot.value < 20 {
        Some(Contribution::new(Bucket::Momentum, 3.0, "FG_EXTREME_FEAR"))
    } else if snapshot.value > 80 {
        Some(Contribution::new(Bucket::Momentum, -3.0, "FG_EXTREME_GREED"))
    } else {
        None
    }
}

pub fn derivatives_confirm(snapshot: &DerivativesSnapshot) -> Option<Contribution> {
    if snapshot.healthy && snapshot.oi_change_pct > 0.7 && snapshot.basis_pct > 0.0 {
        Some(Contribution::new(Bucket::TrendAlignment, 4.0, "OI_BASIS_CONFIRM"))
    } else {
        None
    }
}

pub fn flow_crowding(snapshot: &FlowSnapshot) -> Option<Contribution> {
    if snapshot.healthy && snapshot.crowding_score > 6.0 {
        Some(Contribution::new(Bucket::Penalty, -5.0, "CROWDING_LONG"))
    } else {
        None
    }
}

/// Equity index EMA cross as a risk-on tailwind
pub fn macro_risk_on(ctx: &MacroContext) -> Option<Contribution> {
    if ctx.spx.len() < MIN_TREND_BARS {
        return None;
    }
    match ema_cross(&closes(closed(&ctx.spx)))? {
        1 => Some(Contribution::new(Bucket::TrendAlignment, 4.0, "MACRO_RISK_ON")),
        _ => None,
    }
}

/// Volatility index level and one-bar spike, both risk-off
pub fn vix_risk(vix: &[Candle], rules: &VixRules) -> Vec<Contribution> {
    let completed = closed(vix);
    let mut out = Vec::new();
    let Some(last) = completed.last() else {
        return out;
    };

    if last.close >= rules.extreme_level {
        out.push(Contribution::new(Bucket::Penalty, -rules.extreme_points, "VIX_EXTREME"));
    }
    if let [.., prev, curr] = completed {
        if prev.close > 0.0 && (curr.close - prev.close) / prev.close * 100.0 >= rules.spike_pct {
            out.push(Contribution::new(Bucket::Penalty, -rules.spike_points, "VIX_SPIKE"));
        }
    }
    out
}

/// Keyword hits across all headlines. Each keyword counts at most
/// `max_hits_per_keyword` times and its first hit carries extra weight.
pub fn news_keywords(news: &[Headline], rules: &NewsRules) -> Vec<Contribution> {
    let titles: Vec<String> = news.iter().map(|h| h.title.to_lowercase()).collect();
    let mut out = Vec::new();

    for group in &rules.groups {
        for entry in &group.keywords {
            let keyword = entry.keyword.to_lowercase();
            let hits = titles
                .iter()
                .filter(|t| t.contains(&keyword))
                .count()
                .min(rules.max_hits_per_keyword);
            if hits == 0 {
                continue;
            }

            let delta = entry.weight * rules.first_hit_multiplier + entry.weight * (hits - 1) as f64;
            let code = format!("NEWS_{}", keyword.replace(' ', "_").to_uppercase());
            out.push(Contribution::new(Bucket::Momentum, delta, code));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(closes: &[f64], volume: f64) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Candle::new(i as i64 * 300, *c, c + 1.0, c - 1.0, *c, volume))
            .collect()
    }

    #[test]
    fn test_news_cap_and_first_hit_weight() {
        let rules = NewsRules::default();
        let news = vec![
            Headline::new("Exchange hack drains wallets", "rss"),
            Headline::new("Second hack this week", "rss"),
            Headline::new("Yet another HACK", "rss"),
        ];
        let found = news_keywords(&news, &rules);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "NEWS_HACK");
        // -0.6 * 2 for the first hit, -0.6 for the second, third ignored
        assert!((found[0].delta + 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_multi_word_keyword_code() {
        let news = vec![Headline::new("Fed signals rate cut", "rss")];
        let codes: Vec<String> = news_keywords(&news, &NewsRules::default())
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert!(codes.contains(&"NEWS_RATE_CUT".to_string()));
        assert!(codes.contains(&"NEWS_FED".to_string()));
    }

    #[test]
    fn test_volume_surge_signed_by_close() {
        let mut closes = vec![100.0; 35];
        closes.push(99.0);
        let mut candles = bars(&closes, 10.0);
        if let Some(last) = candles.last_mut() {
            last.volume = 20.0;
        }
        let found = volume_surge(&candles, &DetectorThresholds::default()).unwrap();
        assert_eq!(found.delta, -6.0);
        assert_eq!(found.code, "VOL_SURGE");
    }

    #[test]
    fn test_vix_extreme_and_spike() {
        let vix = bars(&[20.0, 20.0, 31.0, 31.0], 0.0);
        let found = vix_risk(&vix, &VixRules::default());
        let codes: Vec<&str> = found.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["VIX_EXTREME", "VIX_SPIKE"]);
        assert!(vix_risk(&[], &VixRules::default()).is_empty());
    }

    #[test]
    fn test_unhealthy_snapshots_are_neutral() {
        let mut fg = FearGreedSnapshot::unavailable();
        fg.value = 5;
        assert!(fear_greed(&fg).is_none());
        assert!(fear_greed(&FearGreedSnapshot::new(10, "Extreme Fear")).is_some());
        assert!(flow_crowding(&FlowSnapshot::unavailable("binance")).is_none());
        assert!(derivatives_confirm(&DerivativesSnapshot::unavailable("binance")).is_none());
    }

    #[test]
    fn test_htf_alignment() {
        assert_eq!(htf_alignment(1, 0).map(|c| c.delta), Some(8.0));
        assert_eq!(htf_alignment(-1, -1).map(|c| c.code), Some("HTF_BEAR".to_string()));
        assert!(htf_alignment(1, -1).is_none());
    }
}
