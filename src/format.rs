//! Alert message rendering: Markdown header plus a fenced JSON payload

use serde::Serialize;
use serde_json::{json, Value};

use crate::engine::AlertScore;
use crate::types::Result;

/// Which provider fed each input this cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderContext {
    pub price: String,
    pub derivatives: String,
    pub flows: String,
    /// `direct`, `proxy` or `none`
    pub spx_mode: String,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn alert_payload(score: &AlertScore, providers: &ProviderContext) -> Value {
    json!({
        "symbol": score.symbol,
        "timeframe": score.timeframe,
        "action": score.action,
        "tier": score.tier,
        "direction": score.direction,
        "strategy_type": score.strategy_type,
        "confidence_score": score.confidence,
        "entry_zone": score.entry_zone,
        "invalidation_level": round2(score.invalidation),
        "tp1": round2(score.tp1),
        "tp2": round2(score.tp2),
        "rr_ratio": round2(score.rr_ratio),
        "context": {
            "regime": score.regime,
            "session": score.session,
            "quality": score.quality,
            "providers": providers,
            "intelligence": score.intelligence,
        },
        "reason_codes": score.reason_codes,
        "score_breakdown": score.score_breakdown,
        "blockers": score.blockers,
        "decision_trace": score.trace,
    })
}

pub fn format_alert(score: &AlertScore, providers: &ProviderContext) -> Result<String> {
    let payload = serde_json::to_string_pretty(&alert_payload(score, providers))?;
    Ok(format!(
        "*{} {} {} ({})*\n```\n{}\n```",
        score.symbol,
        score.timeframe,
        score.action.as_str(),
        score.tier.as_str(),
        payload
    ))
}
