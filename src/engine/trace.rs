//! Decision trace: an append-only record of every contribution made
//! during one scoring pass

use serde::Serialize;
use std::collections::BTreeMap;

/// Scoring stage that produced a trace entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Quality,
    Regime,
    Detector,
    Arbitration,
    Factor,
    Intelligence,
    Session,
    Levels,
    Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub stage: Stage,
    pub code: String,
    pub delta: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DecisionTrace {
    entries: Vec<TraceEntry>,
    candidates: BTreeMap<String, i32>,
    confluence: Option<u32>,
}

impl DecisionTrace {
    pub fn push(&mut self, stage: Stage, code: impl Into<String>, delta: f64) {
        self.entries.push(TraceEntry {
            stage,
            code: code.into(),
            delta,
        });
    }

    pub fn record_candidate(&mut self, key: &str, points: i32) {
        self.candidates.insert(key.to_string(), points);
    }

    pub fn set_confluence(&mut self, count: u32) {
        self.confluence = Some(count);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn candidates(&self) -> &BTreeMap<String, i32> {
        &self.candidates
    }

    pub fn confluence(&self) -> Option<u32> {
        self.confluence
    }

    /// Every code in insertion order, duplicates included
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.code.as_str())
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.codes().any(|c| c == code)
    }

    /// Sorted, de-duplicated codes
    pub fn unique_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.codes().map(str::to_string).collect();
        codes.sort();
        codes.dedup();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_codes_sorted() {
        let mut trace = DecisionTrace::default();
        trace.push(Stage::Factor, "EMA_BULL", 8.0);
        trace.push(Stage::Regime, "REGIME_TREND", 8.0);
        trace.push(Stage::Factor, "EMA_BULL", 0.0);
        assert_eq!(trace.unique_codes(), vec!["EMA_BULL", "REGIME_TREND"]);
        assert_eq!(trace.entries().len(), 3);
        assert!(trace.has_code("REGIME_TREND"));
        assert!(trace.confluence().is_none());
    }
}
