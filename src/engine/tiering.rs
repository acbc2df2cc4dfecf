//! Tier/action decision with confluence and volume gates

use crate::config::{ConfluenceRules, TimeframeRule};
use crate::types::{Action, Candle, Direction, Tier};

/// Base decision from confidence, blockers and the timeframe thresholds
pub fn tier_and_action(confidence: f64, blockers: &[String], rule: &TimeframeRule) -> (Tier, Action) {
    if !blockers.is_empty() {
        return (Tier::NoTrade, Action::Skip);
    }
    if confidence >= rule.trade_long || confidence <= rule.trade_short {
        (Tier::APlus, Action::Trade)
    } else if confidence >= rule.watch_long || confidence <= rule.watch_short {
        (Tier::B, Action::Watch)
    } else {
        (Tier::NoTrade, Action::Skip)
    }
}

/// Signal categories that can independently confirm a direction
#[derive(Debug, Clone, Default)]
pub struct ConfluenceInputs {
    pub detectors: f64,
    pub ema: f64,
    pub volume: f64,
    pub htf: f64,
    pub derivatives: f64,
    pub macro_bias: f64,
    pub news: f64,
    pub intelligence: Vec<f64>,
}

impl ConfluenceInputs {
    /// Number of categories whose sign agrees with `direction`
    pub fn count(&self, direction: Direction) -> u32 {
        let sign = direction.sign() as f64;
        if sign == 0.0 {
            return 0;
        }
        [
            self.detectors,
            self.ema,
            self.volume,
            self.htf,
            self.derivatives,
            self.macro_bias,
            self.news,
        ]
        .iter()
        .chain(self.intelligence.iter())
        .filter(|v| **v * sign > 0.0)
        .count() as u32
    }
}

/// Demote A+ to B, then B to NO-TRADE, when too few categories agree
pub fn apply_confluence(
    tier: Tier,
    action: Action,
    count: u32,
    rules: &ConfluenceRules,
) -> (Tier, Action, Option<&'static str>) {
    let (mut tier, mut action, mut code) = (tier, action, None);
    if tier == Tier::APlus && count < rules.a_plus {
        tier = Tier::B;
        action = Action::Watch;
        code = Some("CONFLUENCE_DEMOTE");
    }
    if tier == Tier::B && count < rules.b {
        tier = Tier::NoTrade;
        action = Action::Skip;
        code = Some("CONFLUENCE_SKIP");
    }
    (tier, action, code)
}

/// A TRADE whose trigger bar traded below its trailing-20 average volume
/// drops to WATCH
pub fn apply_volume_gate(tier: Tier, action: Action, completed: &[Candle]) -> (Tier, Action, Option<&'static str>) {
    const LOOKBACK: usize = 20;
    if action != Action::Trade || completed.len() <= LOOKBACK {
        return (tier, action, None);
    }

    let n = completed.len();
    let average = completed[n - 1 - LOOKBACK..n - 1]
        .iter()
        .map(|c| c.volume)
        .sum::<f64>()
        / LOOKBACK as f64;

    if completed[n - 1].volume < average {
        (Tier::B, Action::Watch, Some("VOLUME_GATE"))
    } else {
        (tier, action, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> TimeframeRule {
        TimeframeRule::default()
    }

    #[test]
    fn test_blockers_force_skip() {
        let blockers = vec!["Low R:R".to_string()];
        assert_eq!(tier_and_action(95.0, &blockers, &rule()), (Tier::NoTrade, Action::Skip));
    }

    #[test]
    fn test_threshold_bands() {
        assert_eq!(tier_and_action(72.0, &[], &rule()), (Tier::APlus, Action::Trade));
        assert_eq!(tier_and_action(20.0, &[], &rule()), (Tier::APlus, Action::Trade));
        assert_eq!(tier_and_action(60.0, &[], &rule()), (Tier::B, Action::Watch));
        assert_eq!(tier_and_action(42.0, &[], &rule()), (Tier::B, Action::Watch));
        assert_eq!(tier_and_action(50.0, &[], &rule()), (Tier::NoTrade, Action::Skip));
    }

    #[test]
    fn test_confluence_demotion_chain() {
        let rules = ConfluenceRules::default();
        assert_eq!(
            apply_confluence(Tier::APlus, Action::Trade, 3, &rules),
            (Tier::B, Action::Watch, Some("CONFLUENCE_DEMOTE"))
        );
        assert_eq!(
            apply_confluence(Tier::APlus, Action::Trade, 1, &rules),
            (Tier::NoTrade, Action::Skip, Some("CONFLUENCE_SKIP"))
        );
        assert_eq!(apply_confluence(Tier::APlus, Action::Trade, 4, &rules).2, None);
    }

    #[test]
    fn test_confluence_count() {
        let inputs = ConfluenceInputs {
            detectors: 12.0,
            ema: 8.0,
            volume: -6.0,
            htf: 8.0,
            intelligence: vec![3.0, -2.0, 0.0],
            ..ConfluenceInputs::default()
        };
        assert_eq!(inputs.count(Direction::Long), 4);
        assert_eq!(inputs.count(Direction::Short), 2);
        assert_eq!(inputs.count(Direction::Neutral), 0);
    }

    #[test]
    fn test_volume_gate_demotes_quiet_trade() {
        let mut candles: Vec<Candle> = (0..25).map(|i| Candle::new(i, 1.0, 1.0, 1.0, 1.0, 10.0)).collect();
        if let Some(last) = candles.last_mut() {
            last.volume = 5.0;
        }
        assert_eq!(
            apply_volume_gate(Tier::APlus, Action::Trade, &candles),
            (Tier::B, Action::Watch, Some("VOLUME_GATE"))
        );
        assert_eq!(apply_volume_gate(Tier::B, Action::Watch, &candles).2, None);
    }
}
