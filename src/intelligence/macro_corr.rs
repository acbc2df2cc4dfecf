//! Cross-asset alignment for BTC: equities, the dollar and gold

use serde_json::{json, Map, Value};

use crate::indicators::rsi;
use crate::types::{closed, closes, Candle};

use super::{IntelligenceLayer, LayerContext, LayerKind, LayerOutput};

const RSI_PERIOD: usize = 14;

/// +1 when RSI(14) of the closed bars is above 50, -1 below, `None` without history
fn momentum_side(candles: &[Candle]) -> Option<i32> {
    let value = rsi(&closes(candles), RSI_PERIOD)?;
    Some(if value > 50.0 { 1 } else if value < 50.0 { -1 } else { 0 })
}

/// How one macro series relates to BTC
struct Link {
    name: &'static str,
    points: f64,
    /// +1 when the series should move with BTC, -1 when against
    polarity: i32,
}

const LINKS: [Link; 3] = [
    Link { name: "spx", points: 3.0, polarity: 1 },
    Link { name: "dxy", points: 3.0, polarity: -1 },
    Link { name: "gold", points: 1.0, polarity: 1 },
];

pub struct MacroCorrelationLayer;

impl IntelligenceLayer for MacroCorrelationLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::MacroCorrelation
    }

    fn evaluate(&self, ctx: &LayerContext<'_>) -> Option<LayerOutput> {
        if ctx.symbol != "BTC" {
            return None;
        }
        let btc = momentum_side(ctx.candles)?;
        if btc == 0 {
            return None;
        }

        let series = [&ctx.macro_ctx.spx, &ctx.macro_ctx.dxy, &ctx.macro_ctx.gold];
        let mut points = 0.0;
        let mut codes = Vec::new();
        let mut context = Map::new();
        context.insert("btc".to_string(), json!(btc));

        for (link, candles) in LINKS.iter().zip(series) {
            let Some(side) = momentum_side(closed(candles)) else {
                continue;
            };
            context.insert(link.name.to_string(), json!(side));
            if side * link.polarity == btc {
                points += link.points * btc as f64;
                let tag = if btc > 0 { "BULL" } else { "BEAR" };
                codes.push(format!("MACRO_{}_{}", link.name.to_uppercase(), tag));
            }
        }

        if context.len() == 1 {
            return None;
        }
        Some(LayerOutput {
            points,
            codes,
            context: Value::Object(context),
        })
    }
}
