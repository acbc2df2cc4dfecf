//! Shared builders for integration tests
#![allow(dead_code)]

use btc_alerts::engine::ScoreInput;
use btc_alerts::types::{
    Candle, DerivativesSnapshot, FearGreedSnapshot, FlowSnapshot, Headline, MacroContext, PriceSnapshot,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 2024-01-03 14:00 UTC, a Wednesday in the US session
pub const WEDNESDAY_US: i64 = 1_704_290_400;
pub const FIVE_MIN: i64 = 300;

/// `n` bars ending at `end_ts`, closes moving by `step` with a small wobble
pub fn trend(n: usize, start: f64, step: f64, end_ts: i64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let ts = end_ts - (n - 1 - i) as i64 * FIVE_MIN;
            let close = start + i as f64 * step + if i % 4 == 0 { -step * 0.5 } else { 0.0 };
            let open = close - step * 0.6;
            Candle::new(ts, open, open.max(close) + 0.4, open.min(close) - 0.4, close, 10.0 + (i % 5) as f64)
        })
        .collect()
}

/// Directionless chop around 100 whose swings shrink every bar, so ADX stays
/// near zero and the latest ATR is the lowest in its history
pub fn fading_chop(n: usize, end_ts: i64) -> Vec<Candle> {
    let swing = |i: usize| 2.0 - i as f64 * (1.8 / n as f64);
    let close_at = |i: usize| if i % 2 == 0 { 100.0 + swing(i) } else { 100.0 - swing(i) };
    (0..n)
        .map(|i| {
            let ts = end_ts - (n - 1 - i) as i64 * FIVE_MIN;
            let close = close_at(i);
            let open = if i == 0 { 100.0 } else { close_at(i - 1) };
            Candle::new(ts, open, open.max(close) + 0.1, open.min(close) - 0.1, close, 20.0)
        })
        .collect()
}

/// Seeded random walk ending at `end_ts`
pub fn random_walk(seed: u64, n: usize, start: f64, end_ts: i64) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut close = start;
    (0..n)
        .map(|i| {
            let ts = end_ts - (n - 1 - i) as i64 * FIVE_MIN;
            let open = close;
            close = (open * (1.0 + rng.gen_range(-0.006..0.006))).max(1.0);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.002));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.002));
            let volume = rng.gen_range(5.0..50.0);
            Candle::new(ts, open, high, low, close, volume)
        })
        .collect()
}

/// Owned inputs for one scoring pass with neutral auxiliary data
pub struct Fixture {
    pub symbol: String,
    pub timeframe: String,
    pub price: PriceSnapshot,
    pub candles: Vec<Candle>,
    pub candles_15m: Vec<Candle>,
    pub candles_1h: Vec<Candle>,
    pub fear_greed: FearGreedSnapshot,
    pub news: Vec<Headline>,
    pub derivatives: DerivativesSnapshot,
    pub flows: FlowSnapshot,
    pub macro_ctx: MacroContext,
    pub now: i64,
}

impl Fixture {
    /// BTC 5m fixture; the same series stands in for the higher timeframes
    pub fn new(candles: Vec<Candle>) -> Self {
        let now = candles.last().map(|c| c.ts).unwrap_or(WEDNESDAY_US);
        let price = candles
            .last()
            .map(|c| PriceSnapshot::new(c.close, now, "test"))
            .unwrap_or_else(|| PriceSnapshot::unavailable(now));
        Self {
            symbol: "BTC".to_string(),
            timeframe: "5m".to_string(),
            price,
            candles_15m: candles.clone(),
            candles_1h: candles.clone(),
            candles,
            fear_greed: FearGreedSnapshot::new(50, "Neutral"),
            news: Vec::new(),
            derivatives: DerivativesSnapshot::unavailable("test"),
            flows: FlowSnapshot::unavailable("test"),
            macro_ctx: MacroContext::default(),
            now,
        }
    }

    pub fn with_news(mut self, titles: &[&str]) -> Self {
        self.news = titles.iter().map(|t| Headline::new(t, "test")).collect();
        self
    }

    pub fn input(&self) -> ScoreInput<'_> {
        ScoreInput {
            symbol: &self.symbol,
            timeframe: &self.timeframe,
            price: &self.price,
            candles: &self.candles,
            candles_15m: &self.candles_15m,
            candles_1h: &self.candles_1h,
            fear_greed: &self.fear_greed,
            news: &self.news,
            derivatives: &self.derivatives,
            flows: &self.flows,
            macro_ctx: &self.macro_ctx,
            order_book: None,
            now: self.now,
        }
    }
}
