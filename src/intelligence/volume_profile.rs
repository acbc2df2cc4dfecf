//! Volume profile: point of control and value area positioning

use serde_json::json;

use crate::config::VolumeProfileConfig;
use crate::types::Candle;

use super::{IntelligenceLayer, LayerContext, LayerKind, LayerOutput};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    pub poc: f64,
    pub value_area_low: f64,
    pub value_area_high: f64,
}

/// Build a profile from `candles`, spreading each bar's volume evenly over
/// the bins its high-low range touches.
pub fn build_profile(candles: &[Candle], bins: usize, value_area_pct: f64) -> Option<Profile> {
    if candles.is_empty() || bins == 0 {
        return None;
    }

    // Providers occasionally swap high and low; order each bar's range first
    let range = |c: &Candle| (c.low.min(c.high), c.low.max(c.high));
    let lo = candles.iter().map(|c| range(c).0).fold(f64::MAX, f64::min);
    let hi = candles.iter().map(|c| range(c).1).fold(f64::MIN, f64::max);
    let span = hi - lo;
    if span <= 0.0 {
        return Some(Profile {
            poc: lo,
            value_area_low: lo,
            value_area_high: hi,
        });
    }

    let size = span / bins as f64;
    let index = |price: f64| (((price - lo) / size) as usize).min(bins - 1);

    let mut volume = vec![0.0; bins];
    for c in candles {
        let (bottom, top) = range(c);
        let (first, last) = (index(bottom), index(top));
        let share = c.volume / (last - first + 1) as f64;
        for slot in &mut volume[first..=last] {
            *slot += share;
        }
    }

    let total: f64 = volume.iter().sum();
    let poc = volume
        .iter()
        .enumerate()
        .fold(0, |best, (i, v)| if *v > volume[best] { i } else { best });

    let target = total * value_area_pct;
    let (mut low, mut high) = (poc, poc);
    let mut covered = volume[poc];
    while covered < target && (low > 0 || high < bins - 1) {
        let below = if low > 0 { volume[low - 1] } else { -1.0 };
        let above = if high < bins - 1 { volume[high + 1] } else { -1.0 };
        if above >= below {
            high += 1;
            covered += volume[high];
        } else {
            low -= 1;
            covered += volume[low];
        }
    }

    Some(Profile {
        poc: lo + (poc as f64 + 0.5) * size,
        value_area_low: lo + low as f64 * size,
        value_area_high: lo + (high + 1) as f64 * size,
    })
}

pub struct VolumeProfileLayer {
    cfg: VolumeProfileConfig,
}

impl VolumeProfileLayer {
    pub fn new(cfg: VolumeProfileConfig) -> Self {
        Self { cfg }
    }
}

impl IntelligenceLayer for VolumeProfileLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::VolumeProfile
    }

    fn evaluate(&self, ctx: &LayerContext<'_>) -> Option<LayerOutput> {
        if ctx.candles.len() < self.cfg.min_candles {
            return None;
        }
        let profile = build_profile(ctx.candles, self.cfg.bins, self.cfg.value_area_pct)?;

        let (points, codes, position) = if ctx.price < profile.value_area_low {
            (self.cfg.points, vec!["BELOW_VALUE".to_string()], "below")
        } else if ctx.price > profile.value_area_high {
            (-self.cfg.points, vec!["ABOVE_VALUE".to_string()], "above")
        } else {
            (0.0, Vec::new(), "inside")
        };

        Some(LayerOutput {
            points,
            codes,
            context: json!({
                "poc": profile.poc,
                "vah": profile.value_area_high,
                "val": profile.value_area_low,
                "position": position,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MacroContext;

    fn cluster() -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..10)
            .map(|i| Candle::new(i, 100.0, 101.0, 99.0, 100.0, 100.0))
            .collect();
        candles.push(Candle::new(10, 100.0, 120.0, 80.0, 100.0, 1.0));
        candles
    }

    fn evaluate(price: f64) -> Option<LayerOutput> {
        let candles = cluster();
        let macro_ctx = MacroContext::default();
        let ctx = LayerContext {
            symbol: "BTC",
            candles: &candles,
            price,
            order_book: None,
            news: &[],
            macro_ctx: &macro_ctx,
        };
        VolumeProfileLayer::new(VolumeProfileConfig::default()).evaluate(&ctx)
    }

    #[test]
    fn test_poc_sits_at_heavy_cluster() {
        let profile = build_profile(&cluster(), 50, 0.7).unwrap();
        assert!((profile.poc - 100.0).abs() < 1.5);
        assert!(profile.value_area_low >= 98.0);
        assert!(profile.value_area_high <= 102.0);
    }

    #[test]
    fn test_position_points() {
        assert_eq!(evaluate(90.0).unwrap().points, 3.0);
        assert_eq!(evaluate(115.0).unwrap().codes, vec!["ABOVE_VALUE"]);
        assert_eq!(evaluate(100.0).unwrap().points, 0.0);
    }

    #[test]
    fn test_inverted_bar_is_tolerated() {
        let mut candles = cluster();
        candles.push(Candle::new(11, 100.0, 99.5, 100.5, 100.0, 10.0));
        let profile = build_profile(&candles, 50, 0.7).unwrap();
        assert!((profile.poc - 100.0).abs() < 1.5);

        let lone = build_profile(&[Candle::new(0, 100.0, 90.0, 110.0, 100.0, 10.0)], 50, 0.7).unwrap();
        assert!(lone.value_area_low >= 90.0 && lone.value_area_high <= 110.0);
    }

    #[test]
    fn test_needs_min_candles() {
        let candles = &cluster()[..4];
        assert!(build_profile(candles, 50, 0.7).is_some());
        let macro_ctx = MacroContext::default();
        let ctx = LayerContext {
            symbol: "BTC",
            candles,
            price: 100.0,
            order_book: None,
            news: &[],
            macro_ctx: &macro_ctx,
        };
        assert!(VolumeProfileLayer::new(VolumeProfileConfig::default()).evaluate(&ctx).is_none());
    }
}
