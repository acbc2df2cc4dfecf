//! Backtest-lite replay over a candle history
//!
//! Scores a growing window bar by bar with neutral auxiliary inputs and
//! reports how noisy the alert stream is and how often its direction
//! matched the close a few bars later.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::engine::{AlertEngine, ScoreInput};
use crate::types::{
    Action, Candle, DerivativesSnapshot, Direction, FearGreedSnapshot, FlowSnapshot, MacroContext, PriceSnapshot,
};

const FIRST_BAR: usize = 50;
const MIN_WINDOW: usize = 40;
const MIN_HISTORY: usize = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplayMetrics {
    pub alerts: usize,
    pub trades: usize,
    pub noise_ratio: f64,
    pub directional_hit_proxy: f64,
}

/// Bars ahead used for the hit check
pub fn horizon_bars(timeframe: &str) -> usize {
    match timeframe {
        "5m" => 3,
        "1h" => 1,
        _ => 2,
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn replay_symbol_timeframe(engine: &AlertEngine, symbol: &str, timeframe: &str, candles: &[Candle]) -> ReplayMetrics {
    if candles.len() < MIN_HISTORY {
        return ReplayMetrics::default();
    }

    let fear_greed = FearGreedSnapshot::unavailable();
    let derivatives = DerivativesSnapshot::unavailable("replay");
    let flows = FlowSnapshot::unavailable("replay");
    let macro_ctx = MacroContext::default();
    let horizon = horizon_bars(timeframe);

    let mut alerts = 0;
    let mut trades = 0;
    let mut hits = 0;

    for i in FIRST_BAR..candles.len() {
        let window = &candles[..i.max(MIN_WINDOW)];
        let Some(last) = window.last() else {
            continue;
        };
        let price = PriceSnapshot::new(last.close, last.ts, "replay");
        let input = ScoreInput {
            symbol,
            timeframe,
            price: &price,
            candles: window,
            candles_15m: window,
            candles_1h: window,
            fear_greed: &fear_greed,
            news: &[],
            derivatives: &derivatives,
            flows: &flows,
            macro_ctx: &macro_ctx,
            order_book: None,
            now: last.ts,
        };
        let score = engine.compute_score(&input);
        if score.action == Action::Skip {
            continue;
        }

        alerts += 1;
        if score.action == Action::Trade {
            trades += 1;
        }
        if let Some(ahead) = candles.get(i + horizon) {
            let forward = ahead.close - candles[i].close;
            let hit = match score.direction {
                Direction::Long => forward > 0.0,
                Direction::Short => forward < 0.0,
                Direction::Neutral => false,
            };
            if hit {
                hits += 1;
            }
        }
    }

    if alerts == 0 {
        return ReplayMetrics::default();
    }
    ReplayMetrics {
        alerts,
        trades,
        noise_ratio: round4((alerts - trades) as f64 / alerts as f64),
        directional_hit_proxy: round4(hits as f64 / alerts as f64),
    }
}

/// Metrics keyed by `{symbol}:{timeframe}` as plain JSON objects
pub fn summarize(metrics: &BTreeMap<String, ReplayMetrics>) -> BTreeMap<String, Value> {
    metrics
        .iter()
        .map(|(key, m)| (key.clone(), serde_json::to_value(m).unwrap_or(Value::Null)))
        .collect()
}
