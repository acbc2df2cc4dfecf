//! Intelligence layers
//!
//! Optional scorers that sit beside the detector bank. Each layer reports
//! signed points, trace codes and a free-form context blob through the
//! narrow `LayerOutput` shape. Layers are gated by `IntelligenceFlags`.

use serde::Serialize;

use crate::config::{IntelligenceFlags, Settings};
use crate::engine::score::Bucket;
use crate::types::{Candle, Headline, MacroContext, OrderBookSnapshot};

pub mod liquidity;
pub mod macro_corr;
pub mod sentiment;
pub mod squeeze;
pub mod volume_profile;

pub use liquidity::LiquidityLayer;
pub use macro_corr::MacroCorrelationLayer;
pub use sentiment::{LexiconScorer, SentimentLayer};
pub use squeeze::SqueezeLayer;
pub use volume_profile::VolumeProfileLayer;

/// Which slot of the bundle a layer fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Squeeze,
    VolumeProfile,
    Liquidity,
    MacroCorrelation,
    Sentiment,
}

impl LayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Squeeze => "squeeze",
            LayerKind::VolumeProfile => "volume_profile",
            LayerKind::Liquidity => "liquidity",
            LayerKind::MacroCorrelation => "macro_correlation",
            LayerKind::Sentiment => "sentiment",
        }
    }

    pub fn enabled(&self, flags: &IntelligenceFlags) -> bool {
        match self {
            LayerKind::Squeeze => flags.squeeze,
            LayerKind::VolumeProfile => flags.volume_profile,
            LayerKind::Liquidity => flags.liquidity,
            LayerKind::MacroCorrelation => flags.macro_correlation,
            LayerKind::Sentiment => flags.sentiment,
        }
    }

    /// Score bucket receiving this layer's points
    pub fn bucket(&self) -> Bucket {
        match self {
            LayerKind::Squeeze => Bucket::Volatility,
            LayerKind::VolumeProfile | LayerKind::Liquidity => Bucket::Volume,
            LayerKind::MacroCorrelation => Bucket::TrendAlignment,
            LayerKind::Sentiment => Bucket::Momentum,
        }
    }
}

/// What every layer reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerOutput {
    pub points: f64,
    pub codes: Vec<String>,
    pub context: serde_json::Value,
}

/// Inputs a layer may read
#[derive(Debug, Clone, Copy)]
pub struct LayerContext<'a> {
    pub symbol: &'a str,
    /// Closed bars only
    pub candles: &'a [Candle],
    pub price: f64,
    pub order_book: Option<&'a OrderBookSnapshot>,
    pub news: &'a [Headline],
    pub macro_ctx: &'a MacroContext,
}

/// A pluggable scorer
pub trait IntelligenceLayer: Send + Sync {
    fn kind(&self) -> LayerKind;

    /// `None` when the layer has nothing to say for this input
    fn evaluate(&self, ctx: &LayerContext<'_>) -> Option<LayerOutput>;
}

/// Per-layer results, each present or absent
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntelligenceBundle {
    pub squeeze: Option<LayerOutput>,
    pub volume_profile: Option<LayerOutput>,
    pub liquidity: Option<LayerOutput>,
    pub macro_correlation: Option<LayerOutput>,
    pub sentiment: Option<LayerOutput>,
}

impl IntelligenceBundle {
    /// Run every enabled layer
    pub fn analyze(
        layers: &[Box<dyn IntelligenceLayer>],
        flags: &IntelligenceFlags,
        ctx: &LayerContext<'_>,
    ) -> Self {
        let mut bundle = Self::default();
        for layer in layers.iter().filter(|l| l.kind().enabled(flags)) {
            if let Some(output) = layer.evaluate(ctx) {
                bundle.set(layer.kind(), output);
            }
        }
        bundle
    }

    pub fn set(&mut self, kind: LayerKind, output: LayerOutput) {
        let slot = match kind {
            LayerKind::Squeeze => &mut self.squeeze,
            LayerKind::VolumeProfile => &mut self.volume_profile,
            LayerKind::Liquidity => &mut self.liquidity,
            LayerKind::MacroCorrelation => &mut self.macro_correlation,
            LayerKind::Sentiment => &mut self.sentiment,
        };
        *slot = Some(output);
    }

    /// Present layers in a fixed order
    pub fn outputs(&self) -> Vec<(LayerKind, &LayerOutput)> {
        [
            (LayerKind::Squeeze, &self.squeeze),
            (LayerKind::VolumeProfile, &self.volume_profile),
            (LayerKind::Liquidity, &self.liquidity),
            (LayerKind::MacroCorrelation, &self.macro_correlation),
            (LayerKind::Sentiment, &self.sentiment),
        ]
        .into_iter()
        .filter_map(|(kind, slot)| slot.as_ref().map(|o| (kind, o)))
        .collect()
    }

    pub fn total_points(&self) -> f64 {
        self.outputs().iter().map(|(_, o)| o.points).sum()
    }
}

/// The standard layer set built from settings
pub fn default_layers(settings: &Settings) -> Vec<Box<dyn IntelligenceLayer>> {
    vec![
        Box::new(SqueezeLayer::new(settings.squeeze)),
        Box::new(VolumeProfileLayer::new(settings.volume_profile)),
        Box::new(LiquidityLayer::new(settings.liquidity)),
        Box::new(MacroCorrelationLayer),
        Box::new(SentimentLayer::new(settings.sentiment.clone())),
    ]
}
