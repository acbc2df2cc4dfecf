//! Score buckets and the per-cycle alert record

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Action, Direction, Regime, Session, Strategy, Tier};

use super::trace::DecisionTrace;

/// Named accumulation bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    TrendAlignment,
    Momentum,
    Volatility,
    Volume,
    Htf,
    Penalty,
}

/// Per-bucket sums; confidence is `50 + total()` clamped to [0, 100]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub trend_alignment: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub volume: f64,
    pub htf: f64,
    pub penalty: f64,
}

impl ScoreBreakdown {
    pub fn add(&mut self, bucket: Bucket, delta: f64) {
        let slot = match bucket {
            Bucket::TrendAlignment => &mut self.trend_alignment,
            Bucket::Momentum => &mut self.momentum,
            Bucket::Volatility => &mut self.volatility,
            Bucket::Volume => &mut self.volume,
            Bucket::Htf => &mut self.htf,
            Bucket::Penalty => &mut self.penalty,
        };
        *slot += delta;
    }

    pub fn total(&self) -> f64 {
        self.trend_alignment + self.momentum + self.volatility + self.volume + self.htf + self.penalty
    }

    pub fn confidence(&self) -> u32 {
        (50.0 + self.total()).clamp(0.0, 100.0).floor() as u32
    }
}

/// Output of one scoring pass. Built once, never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AlertScore {
    pub symbol: String,
    pub timeframe: String,
    /// Display label: `long_signal`, `short_signal` or `{regime}_bias`
    pub regime: String,
    pub market_regime: Regime,
    pub confidence: u32,
    pub tier: Tier,
    pub action: Action,
    pub direction: Direction,
    pub strategy_type: Strategy,
    pub entry_zone: String,
    pub entry_price: f64,
    pub invalidation: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub rr_ratio: f64,
    pub session: Session,
    pub reasons: Vec<String>,
    pub reason_codes: Vec<String>,
    pub blockers: Vec<String>,
    pub quality: String,
    pub score_breakdown: ScoreBreakdown,
    pub lifecycle_key: String,
    pub last_candle_ts: i64,
    pub intelligence: BTreeMap<String, serde_json::Value>,
    pub trace: DecisionTrace,
}

impl AlertScore {
    pub fn is_actionable(&self) -> bool {
        self.action != Action::Skip
    }
}
