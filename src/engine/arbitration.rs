//! Arbitration between simultaneous detector candidates
//!
//! Picks the strongest candidate, breaks opposite-side ties with the
//! higher-timeframe bias, normalizes the strategy label and applies the
//! session weight for that strategy.

use crate::config::{ArbitrationRules, StrategyWeights};
use crate::types::{Direction, Session, Strategy};

use super::detectors::Candidate;

/// Arbitration outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub direction: Direction,
    pub strategy: Strategy,
    /// Winning candidate's raw points
    pub raw_points: i32,
    /// Raw points after the session weight
    pub points: f64,
    /// Conflict and suppression penalties (non-positive)
    pub penalty: f64,
    pub weight: f64,
    pub winner: Option<String>,
    pub codes: Vec<String>,
}

impl Verdict {
    fn neutral(penalty: f64, codes: Vec<String>) -> Self {
        Self {
            direction: Direction::Neutral,
            strategy: Strategy::None,
            raw_points: 0,
            points: 0.0,
            penalty,
            weight: 1.0,
            winner: None,
            codes,
        }
    }
}

pub fn arbitrate(
    candidates: &[Candidate],
    htf_bias: i32,
    session: Session,
    weights: &StrategyWeights,
    rules: &ArbitrationRules,
) -> Verdict {
    let mut codes = Vec::new();
    let mut penalty = 0.0;

    let has_long = candidates.iter().any(|c| c.points > 0);
    let has_short = candidates.iter().any(|c| c.points < 0);
    if has_long && has_short {
        codes.push("CONFLICT".to_string());
        penalty -= rules.conflict_penalty;
    }

    let Some(best) = candidates.iter().map(|c| c.points.abs()).max() else {
        return Verdict::neutral(penalty, codes);
    };
    if best == 0 {
        return Verdict::neutral(penalty, codes);
    }
    let tied: Vec<&Candidate> = candidates.iter().filter(|c| c.points.abs() == best).collect();

    let winner = if tied.len() == 1 {
        tied[0]
    } else if tied.iter().all(|c| c.points.signum() == tied[0].points.signum()) {
        codes.push("TIE_SAME_SIDE".to_string());
        tied[0]
    } else {
        let agreeing = tied
            .iter()
            .copied()
            .find(|c| htf_bias != 0 && c.points.signum() == htf_bias.signum());
        match agreeing {
            Some(c) => {
                codes.push("TIE_BREAK_HTF".to_string());
                c
            }
            None => {
                codes.push("TIE_SUPPRESSED".to_string());
                penalty -= rules.tie_suppress_penalty;
                return Verdict::neutral(penalty, codes);
            }
        }
    };

    let strategy = normalize(winner, &tied, candidates);
    let weight = weights.weight(strategy);
    if weight > 1.0 {
        codes.push(format!("SESSION_BOOST_{}", session.as_str().to_uppercase()));
    } else if weight < 1.0 {
        codes.push(format!("SESSION_PENALTY_{}", session.as_str().to_uppercase()));
    }

    Verdict {
        direction: winner.direction(),
        strategy,
        raw_points: winner.points,
        points: winner.points as f64 * weight,
        penalty,
        weight,
        winner: Some(winner.key.clone()),
        codes,
    }
}

/// Collapse pattern/divergence winners into one of the canonical strategies:
/// first a same-side canonical detector in the tie set, then the strongest
/// same-side canonical candidate overall, else mean reversion.
fn normalize(winner: &Candidate, tied: &[&Candidate], all: &[Candidate]) -> Strategy {
    if let Some(strategy) = winner.detector.canonical() {
        return strategy;
    }
    let side = winner.points.signum();

    if let Some(strategy) = tied
        .iter()
        .filter(|c| c.points.signum() == side)
        .find_map(|c| c.detector.canonical())
    {
        return strategy;
    }

    let mut same_side: Vec<&Candidate> = all
        .iter()
        .filter(|c| c.points.signum() == side && c.detector.canonical().is_some())
        .collect();
    same_side.sort_by_key(|c| std::cmp::Reverse(c.points.abs()));
    same_side
        .first()
        .and_then(|c| c.detector.canonical())
        .unwrap_or(Strategy::MeanReversion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::detectors::Detector;

    fn neutral_weights() -> StrategyWeights {
        StrategyWeights::default()
    }

    #[test]
    fn test_tie_break_prefers_htf_side() {
        let candidates = vec![
            Candidate::new(Detector::Breakout, 12, "DONCHIAN_BREAK"),
            Candidate::new(Detector::MeanReversion, -12, "ZSCORE_EXTREME"),
        ];
        let rules = ArbitrationRules::default();
        let verdict = arbitrate(&candidates, 2, Session::Us, &neutral_weights(), &rules);
        assert_eq!(verdict.direction, Direction::Long);
        assert_eq!(verdict.strategy, Strategy::Breakout);
        assert!(verdict.codes.contains(&"TIE_BREAK_HTF".to_string()));
        assert!(verdict.codes.contains(&"CONFLICT".to_string()));
        assert_eq!(verdict.penalty, -4.0);
    }

    #[test]
    fn test_tie_without_htf_suppresses() {
        let candidates = vec![
            Candidate::new(Detector::Breakout, 12, "DONCHIAN_BREAK"),
            Candidate::new(Detector::MeanReversion, -12, "ZSCORE_EXTREME"),
        ];
        let rules = ArbitrationRules::default();
        let verdict = arbitrate(&candidates, 0, Session::Us, &neutral_weights(), &rules);
        assert_eq!(verdict.direction, Direction::Neutral);
        assert_eq!(verdict.points, 0.0);
        assert!(verdict.codes.contains(&"TIE_SUPPRESSED".to_string()));
        assert_eq!(verdict.penalty, -6.0);
    }

    #[test]
    fn test_pattern_winner_normalized() {
        let candidates = vec![
            Candidate::new(Detector::Divergence, 14, "RSI_DIV_BULL"),
            Candidate::new(Detector::TrendContinuation, 9, "VWAP_RECLAIM"),
            Candidate::new(Detector::VolatilityExpansion, 6, "BB_EXPANSION"),
        ];
        let verdict = arbitrate(&candidates, 0, Session::Us, &neutral_weights(), &ArbitrationRules::default());
        assert_eq!(verdict.raw_points, 14);
        assert_eq!(verdict.strategy, Strategy::TrendContinuation);

        let lone = vec![Candidate::new(Detector::PinBar, -6, "PIN_BAR_BEAR")];
        let verdict = arbitrate(&lone, 0, Session::Us, &neutral_weights(), &ArbitrationRules::default());
        assert_eq!(verdict.strategy, Strategy::MeanReversion);
        assert_eq!(verdict.direction, Direction::Short);
    }

    #[test]
    fn test_session_weight_applied() {
        let weights = StrategyWeights {
            breakout: 0.5,
            ..StrategyWeights::default()
        };
        let candidates = vec![Candidate::new(Detector::Breakout, 12, "DONCHIAN_BREAK")];
        let verdict = arbitrate(&candidates, 0, Session::Asia, &weights, &ArbitrationRules::default());
        assert_eq!(verdict.points, 6.0);
        assert_eq!(verdict.codes, vec!["SESSION_PENALTY_ASIA".to_string()]);
    }

    #[test]
    fn test_no_candidates_is_neutral() {
        let verdict = arbitrate(&[], 1, Session::Unknown, &neutral_weights(), &ArbitrationRules::default());
        assert_eq!(verdict.direction, Direction::Neutral);
        assert!(verdict.codes.is_empty());
    }
}
