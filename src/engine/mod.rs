//! Scoring engine
//!
//! One synchronous pass per (symbol, timeframe): regime, detector bank,
//! arbitration, aggregator factors, intelligence layers, trade levels and
//! the tier decision. Every contribution lands in the decision trace.

use std::collections::BTreeMap;

use crate::config::Settings;
use crate::intelligence::{default_layers, IntelligenceBundle, IntelligenceLayer, LayerContext};
use crate::types::{
    closed, closes, Action, Candle, DerivativesSnapshot, Direction, FearGreedSnapshot, FlowSnapshot,
    Headline, MacroContext, OrderBookSnapshot, PriceSnapshot, Regime,
};

pub mod arbitration;
pub mod detectors;
pub mod factors;
pub mod levels;
pub mod regime;
pub mod score;
pub mod session;
pub mod tiering;
pub mod trace;

pub use score::{AlertScore, Bucket, ScoreBreakdown};
pub use trace::{DecisionTrace, Stage, TraceEntry};

use factors::Contribution;
use tiering::ConfluenceInputs;

/// Symbol that receives the crypto-only factors
pub const BTC: &str = "BTC";

const MIN_QUALITY_BARS: usize = 40;
const MAX_REASON_CODES: usize = 8;
const MAX_REASONS: usize = 5;

/// Everything one scoring pass reads
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub symbol: &'a str,
    pub timeframe: &'a str,
    pub price: &'a PriceSnapshot,
    pub candles: &'a [Candle],
    pub candles_15m: &'a [Candle],
    pub candles_1h: &'a [Candle],
    pub fear_greed: &'a FearGreedSnapshot,
    pub news: &'a [Headline],
    pub derivatives: &'a DerivativesSnapshot,
    pub flows: &'a FlowSnapshot,
    pub macro_ctx: &'a MacroContext,
    pub order_book: Option<&'a OrderBookSnapshot>,
    /// Wall-clock unix seconds used for the staleness check
    pub now: i64,
}

/// Holds validated settings and the intelligence layer set
pub struct AlertEngine {
    settings: Settings,
    layers: Vec<Box<dyn IntelligenceLayer>>,
}

impl AlertEngine {
    pub fn new(settings: Settings) -> Self {
        let layers = default_layers(&settings);
        Self { settings, layers }
    }

    pub fn with_layers(settings: Settings, layers: Vec<Box<dyn IntelligenceLayer>>) -> Self {
        Self { settings, layers }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn compute_score(&self, input: &ScoreInput<'_>) -> AlertScore {
        let cfg = &self.settings;
        let rule = cfg.rule_for(input.timeframe);
        let completed = closed(input.candles);
        let prices = closes(completed);
        let is_btc = input.symbol == BTC;

        let mut trace = DecisionTrace::default();
        let mut breakdown = ScoreBreakdown::default();
        let mut blockers: Vec<String> = Vec::new();
        let mut degraded: Vec<&str> = Vec::new();
        let mut reasons: Vec<String> = Vec::new();
        let mut confluence = ConfluenceInputs::default();

        // Data quality
        if input.candles.len() < MIN_QUALITY_BARS {
            degraded.push("candles");
        }
        if !input.price.healthy {
            degraded.push("price");
        }
        if is_btc {
            if !input.fear_greed.healthy {
                degraded.push("fear_greed");
            }
            if !input.derivatives.healthy {
                degraded.push("derivatives");
            }
            if !input.flows.healthy {
                degraded.push("flows");
            }
        }
        if closed(input.candles_15m).len() < 30 || closed(input.candles_1h).len() < 30 {
            degraded.push("htf");
        }

        let last_candle_ts = input.candles.last().map(|c| c.ts).unwrap_or(0);
        let stale = input.candles.is_empty() || input.now - last_candle_ts > cfg.stale_for(input.timeframe);
        if stale {
            blockers.push("Stale market data".to_string());
            trace.push(Stage::Quality, "STALE_DATA", 0.0);
        }

        let session = session::session_label(input.candles);

        // Regime
        let verdict = regime::classify(input.candles, &cfg.regime);
        breakdown.add(Bucket::Volatility, verdict.points);
        trace.push(Stage::Regime, verdict.code, verdict.points);
        if verdict.regime == Regime::Chop {
            blockers.push("Chop regime".to_string());
        }

        // Detectors and arbitration
        let candidates = detectors::run_detectors(input.candles, &cfg.detectors);
        for c in &candidates {
            trace.record_candidate(&c.key, c.points);
            trace.push(Stage::Detector, c.code, c.points as f64);
        }

        let t15 = factors::trend_bias(input.candles_15m);
        let t1h = factors::trend_bias(input.candles_1h);
        let arb = arbitration::arbitrate(
            &candidates,
            t15 + t1h,
            session,
            &cfg.weights_for(session),
            &cfg.arbitration,
        );
        breakdown.add(Bucket::Momentum, arb.points);
        breakdown.add(Bucket::Penalty, arb.penalty);
        for code in &arb.codes {
            trace.push(Stage::Arbitration, code.clone(), 0.0);
        }
        if arb.penalty != 0.0 {
            trace.push(Stage::Arbitration, "ARBITRATION_PENALTY", arb.penalty);
        }
        confluence.detectors = arb.points;
        match arb.direction {
            Direction::Long => reasons.push("Momentum supports LONG setup".to_string()),
            Direction::Short => reasons.push("Momentum supports SHORT setup".to_string()),
            Direction::Neutral if !candidates.is_empty() => {
                reasons.push("Detectors conflicted without a tie-break".to_string())
            }
            Direction::Neutral => {}
        }

        // Aggregator factors
        if let Some(c) = factors::ema_alignment(&prices) {
            confluence.ema = c.delta;
            apply(&c, Stage::Factor, &mut trace, &mut breakdown);
        }
        if let Some(c) = factors::volume_surge(completed, &cfg.detectors) {
            confluence.volume = c.delta;
            reasons.push("Volume surge on the trigger bar".to_string());
            apply(&c, Stage::Factor, &mut trace, &mut breakdown);
        }
        if let Some(c) = factors::htf_alignment(t15, t1h) {
            confluence.htf = c.delta;
            reasons.push(if c.delta > 0.0 {
                "Higher timeframes lean bullish".to_string()
            } else {
                "Higher timeframes lean bearish".to_string()
            });
            apply(&c, Stage::Factor, &mut trace, &mut breakdown);
        }

        if is_btc {
            if let Some(c) = factors::fear_greed(input.fear_greed) {
                apply(&c, Stage::Factor, &mut trace, &mut breakdown);
            }
            if let Some(c) = factors::derivatives_confirm(input.derivatives) {
                confluence.derivatives = c.delta;
                apply(&c, Stage::Factor, &mut trace, &mut breakdown);
            }
            if let Some(c) = factors::flow_crowding(input.flows) {
                reasons.push("Crowded long positioning".to_string());
                apply(&c, Stage::Factor, &mut trace, &mut breakdown);
            }
        }

        if let Some(c) = factors::macro_risk_on(input.macro_ctx) {
            confluence.macro_bias += c.delta;
            apply(&c, Stage::Factor, &mut trace, &mut breakdown);
        }
        for c in factors::vix_risk(&input.macro_ctx.vix, &cfg.vix) {
            confluence.macro_bias += c.delta;
            apply(&c, Stage::Factor, &mut trace, &mut breakdown);
        }
        for c in factors::news_keywords(input.news, &cfg.news) {
            confluence.news += c.delta;
            apply(&c, Stage::Factor, &mut trace, &mut breakdown);
        }

        // Intelligence layers
        let px = if input.price.healthy && input.price.price > 0.0 {
            input.price.price
        } else {
            prices
                .last()
                .copied()
                .or_else(|| input.candles.last().map(|c| c.close))
                .unwrap_or(0.0)
        };

        let layer_ctx = LayerContext {
            symbol: input.symbol,
            candles: completed,
            price: px,
            order_book: input.order_book,
            news: input.news,
            macro_ctx: input.macro_ctx,
        };
        let bundle = IntelligenceBundle::analyze(&self.layers, &cfg.intelligence, &layer_ctx);
        let mut intelligence = BTreeMap::new();
        for (kind, output) in bundle.outputs() {
            breakdown.add(kind.bucket(), output.points);
            confluence.intelligence.push(output.points);
            // The layer's points ride on its first code
            for (i, code) in output.codes.iter().enumerate() {
                let delta = if i == 0 { output.points } else { 0.0 };
                trace.push(Stage::Intelligence, code.clone(), delta);
            }
            intelligence.insert(kind.as_str().to_string(), output.context.clone());
        }

        // Session damping pulls the running net toward neutral
        if let Some((delta, code)) = session::session_damping(last_candle_ts, breakdown.total(), &cfg.session_penalties) {
            breakdown.add(Bucket::Penalty, delta);
            trace.push(Stage::Session, code, delta);
        }

        let confidence = breakdown.confidence();
        let score = confidence as f64;
        let direction = if score >= rule.watch_long {
            Direction::Long
        } else if score <= rule.watch_short {
            Direction::Short
        } else {
            Direction::Neutral
        };
        let display_regime = if score >= rule.trade_long {
            "long_signal".to_string()
        } else if score <= rule.trade_short {
            "short_signal".to_string()
        } else {
            format!("{}_bias", verdict.regime.as_str())
        };

        // Trade levels
        let mult = cfg.targets.for_regime(verdict.regime);
        let trade = levels::build_levels(direction, px, completed, &mult, &cfg.detectors);
        for blocker in levels::level_blockers(direction, trade.rr_ratio, rule.min_rr, input.timeframe, t15, t1h) {
            trace.push(Stage::Levels, blocker_code(&blocker), 0.0);
            blockers.push(blocker);
        }
        blockers.sort();
        blockers.dedup();

        // Tier decision
        let (mut tier, mut action) = tiering::tier_and_action(score, &blockers, &rule);
        let count = confluence.count(direction);
        trace.set_confluence(count);
        if cfg.intelligence.confluence && action != Action::Skip {
            let (t, a, code) = tiering::apply_confluence(tier, action, count, &cfg.confluence);
            if let Some(code) = code {
                trace.push(Stage::Tier, code, 0.0);
            }
            tier = t;
            action = a;
        }
        let (t, a, code) = tiering::apply_volume_gate(tier, action, completed);
        if let Some(code) = code {
            trace.push(Stage::Tier, code, 0.0);
        }
        tier = t;
        action = a;

        let mut reason_codes = trace.unique_codes();
        reason_codes.truncate(MAX_REASON_CODES);
        if reasons.is_empty() {
            reasons.push("No dominant setup".to_string());
        }
        reasons.truncate(MAX_REASONS);

        degraded.sort();
        degraded.dedup();
        let quality = if degraded.is_empty() {
            "ok".to_string()
        } else {
            format!("degraded:{}", degraded.join(","))
        };

        let lifecycle_key = format!(
            "{}:{}:{}:{}:{}",
            input.symbol,
            input.timeframe,
            display_regime,
            arb.strategy.as_str(),
            px.round() as i64
        );

        AlertScore {
            symbol: input.symbol.to_string(),
            timeframe: input.timeframe.to_string(),
            regime: display_regime,
            market_regime: verdict.regime,
            confidence,
            tier,
            action,
            direction,
            strategy_type: arb.strategy,
            entry_zone: trade.entry_zone,
            entry_price: px,
            invalidation: trade.invalidation,
            tp1: trade.tp1,
            tp2: trade.tp2,
            rr_ratio: trade.rr_ratio,
            session,
            reasons,
            reason_codes,
            blockers,
            quality,
            score_breakdown: breakdown,
            lifecycle_key,
            last_candle_ts,
            intelligence,
            trace,
        }
    }
}

fn apply(c: &Contribution, stage: Stage, trace: &mut DecisionTrace, breakdown: &mut ScoreBreakdown) {
    breakdown.add(c.bucket, c.delta);
    trace.push(stage, c.code.clone(), c.delta);
}

fn blocker_code(blocker: &str) -> &'static str {
    match blocker {
        "Low R:R" => "LOW_RR",
        "HTF conflict" => "HTF_CONFLICT",
        _ => "BLOCKER",
    }
}
