//! Bollinger-inside-Keltner squeeze
//!
//! ON while the Bollinger bands sit inside the Keltner channel. FIRE on the
//! first bar after a squeeze releases, signed by close momentum.

use serde_json::json;

use crate::config::SqueezeConfig;
use crate::indicators::{bollinger, keltner, Bands};
use crate::types::{closes, Candle};

use super::{IntelligenceLayer, LayerContext, LayerKind, LayerOutput};

const MIN_BARS: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqueezeState {
    On,
    Fire,
    None,
}

impl SqueezeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqueezeState::On => "SQUEEZE_ON",
            SqueezeState::Fire => "SQUEEZE_FIRE",
            SqueezeState::None => "NONE",
        }
    }
}

pub struct SqueezeLayer {
    cfg: SqueezeConfig,
}

impl SqueezeLayer {
    pub fn new(cfg: SqueezeConfig) -> Self {
        Self { cfg }
    }

    fn bands(&self, candles: &[Candle]) -> Option<(Bands, Bands)> {
        let bb = bollinger(&closes(candles), self.cfg.bb_period, self.cfg.bb_std)?;
        let kc = keltner(candles, self.cfg.kc_period, self.cfg.kc_atr_mult)?;
        Some((bb, kc))
    }

    pub fn state(&self, candles: &[Candle]) -> Option<(SqueezeState, Bands, Bands)> {
        if candles.len() < MIN_BARS {
            return None;
        }
        let (bb, kc) = self.bands(candles)?;
        let on = bb.inside(&kc);
        let was_on = self
            .bands(&candles[..candles.len() - 1])
            .map(|(prev_bb, prev_kc)| prev_bb.inside(&prev_kc))
            .unwrap_or(false);

        let state = if was_on && !on {
            SqueezeState::Fire
        } else if on {
            SqueezeState::On
        } else {
            SqueezeState::None
        };
        Some((state, bb, kc))
    }

    fn momentum(&self, candles: &[Candle]) -> f64 {
        let n = candles.len();
        if n <= self.cfg.momentum_lookback {
            return 0.0;
        }
        candles[n - 1].close - candles[n - 1 - self.cfg.momentum_lookback].close
    }
}

impl IntelligenceLayer for SqueezeLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Squeeze
    }

    fn evaluate(&self, ctx: &LayerContext<'_>) -> Option<LayerOutput> {
        let (state, bb, kc) = self.state(ctx.candles)?;
        let momentum = self.momentum(ctx.candles);

        let (points, codes) = match state {
            SqueezeState::Fire if momentum > 0.0 => (self.cfg.fire_points, vec!["SQUEEZE_FIRE_BULL".to_string()]),
            SqueezeState::Fire if momentum < 0.0 => (-self.cfg.fire_points, vec!["SQUEEZE_FIRE_BEAR".to_string()]),
            SqueezeState::Fire => (0.0, vec!["SQUEEZE_FIRE".to_string()]),
            SqueezeState::On => (0.0, vec!["SQUEEZE_ON".to_string()]),
            SqueezeState::None => (0.0, Vec::new()),
        };

        Some(LayerOutput {
            points,
            codes,
            context: json!({
                "state": state.as_str(),
                "bb_width": bb.width(),
                "kc_width": kc.width(),
                "momentum": momentum,
            }),
        })
    }
}
