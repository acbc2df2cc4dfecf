//! Order-book liquidity: near-mid depth imbalance and walls

use serde_json::json;

use crate::config::LiquidityConfig;
use crate::types::OrderBookSnapshot;

use super::{IntelligenceLayer, LayerContext, LayerKind, LayerOutput};

#[derive(Debug, Clone, PartialEq)]
pub struct BookReading {
    pub mid: f64,
    pub bid_depth: f64,
    pub ask_depth: f64,
    pub imbalance: f64,
    pub bid_walls: Vec<(f64, f64)>,
    pub ask_walls: Vec<(f64, f64)>,
}

/// Depth within `depth_pct` of mid. `None` for an unhealthy or one-sided book.
pub fn read_book(book: &OrderBookSnapshot, cfg: &LiquidityConfig) -> Option<BookReading> {
    if !book.healthy {
        return None;
    }
    let best_bid = book.bids.first()?.0;
    let best_ask = book.asks.first()?.0;
    let mid = (best_bid + best_ask) / 2.0;
    let band = mid * cfg.depth_pct;

    let near_bids: Vec<(f64, f64)> = book.bids.iter().copied().filter(|(p, _)| *p >= mid - band).collect();
    let near_asks: Vec<(f64, f64)> = book.asks.iter().copied().filter(|(p, _)| *p <= mid + band).collect();

    let bid_depth: f64 = near_bids.iter().map(|(_, q)| q).sum();
    let ask_depth: f64 = near_asks.iter().map(|(_, q)| q).sum();
    let imbalance = if bid_depth + ask_depth > 0.0 {
        (bid_depth - ask_depth) / (bid_depth + ask_depth)
    } else {
        0.0
    };

    Some(BookReading {
        mid,
        bid_depth,
        ask_depth,
        imbalance,
        bid_walls: near_bids.into_iter().filter(|(_, q)| *q > cfg.wall_quantity).collect(),
        ask_walls: near_asks.into_iter().filter(|(_, q)| *q > cfg.wall_quantity).collect(),
    })
}

pub struct LiquidityLayer {
    cfg: LiquidityConfig,
}

impl LiquidityLayer {
    pub fn new(cfg: LiquidityConfig) -> Self {
        Self { cfg }
    }
}

impl IntelligenceLayer for LiquidityLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Liquidity
    }

    fn evaluate(&self, ctx: &LayerContext<'_>) -> Option<LayerOutput> {
        let reading = read_book(ctx.order_book?, &self.cfg)?;

        let mut codes = Vec::new();
        let mut points = 0.0;
        if reading.imbalance > self.cfg.imbalance_threshold {
            points = self.cfg.imbalance_points;
            codes.push("BID_IMBALANCE".to_string());
        } else if reading.imbalance < -self.cfg.imbalance_threshold {
            points = -self.cfg.imbalance_points;
            codes.push("ASK_IMBALANCE".to_string());
        }
        if !reading.bid_walls.is_empty() {
            codes.push("BID_WALL".to_string());
        }
        if !reading.ask_walls.is_empty() {
            codes.push("ASK_WALL".to_string());
        }

        Some(LayerOutput {
            points,
            codes,
            context: json!({
                "mid": reading.mid,
                "bid_depth": reading.bid_depth,
                "ask_depth": reading.ask_depth,
                "imbalance": (reading.imbalance * 1000.0).round() / 1000.0,
                "bid_walls": reading.bid_walls,
                "ask_walls": reading.ask_walls,
            }),
        })
    }
}
