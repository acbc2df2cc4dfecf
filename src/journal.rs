//! Append-only alert journal with outcome resolution
//!
//! One JSON line per sent alert. Pending records are resolved against the
//! current price of their symbol and the file is rewritten in place.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::AlertScore;
use crate::types::{Action, Direction, Result, Session, Strategy, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    WinTp2,
    WinTp1,
    Loss,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub alert_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub timeframe: String,
    pub action: Action,
    pub tier: Tier,
    pub direction: Direction,
    pub strategy_type: Strategy,
    pub confidence: u32,
    pub entry_price: f64,
    pub entry_zone: String,
    pub invalidation: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub rr_ratio: f64,
    pub regime: String,
    pub session: Session,
    pub lifecycle_key: String,
    pub reason_codes: Vec<String>,
    pub resolved: bool,
    pub outcome: Option<Outcome>,
    pub outcome_timestamp: Option<DateTime<Utc>>,
    pub outcome_price: Option<f64>,
    pub r_multiple: Option<f64>,
}

impl AlertRecord {
    pub fn from_score(score: &AlertScore, timestamp: DateTime<Utc>) -> Self {
        Self {
            alert_id: Uuid::new_v4(),
            timestamp,
            symbol: score.symbol.clone(),
            timeframe: score.timeframe.clone(),
            action: score.action,
            tier: score.tier,
            direction: score.direction,
            strategy_type: score.strategy_type,
            confidence: score.confidence,
            entry_price: score.entry_price,
            entry_zone: score.entry_zone.clone(),
            invalidation: score.invalidation,
            tp1: score.tp1,
            tp2: score.tp2,
            rr_ratio: score.rr_ratio,
            regime: score.regime.clone(),
            session: score.session,
            lifecycle_key: score.lifecycle_key.clone(),
            reason_codes: score.reason_codes.clone(),
            resolved: false,
            outcome: None,
            outcome_timestamp: None,
            outcome_price: None,
            r_multiple: None,
        }
    }

    /// Outcome and R multiple at `price`, if the record is done
    pub fn evaluate(&self, price: f64, now: DateTime<Utc>) -> Option<(Outcome, f64)> {
        let raw_risk = (self.entry_price - self.invalidation).abs();
        let risk = if raw_risk > 0.0 { raw_risk } else { 1.0 };
        let reward = |target: f64| (target - self.entry_price).abs() / risk;

        let hit = match self.direction {
            Direction::Long if price >= self.tp2 => Some((Outcome::WinTp2, reward(self.tp2))),
            Direction::Long if price >= self.tp1 => Some((Outcome::WinTp1, reward(self.tp1))),
            Direction::Long if price <= self.invalidation => Some((Outcome::Loss, -1.0)),
            Direction::Short if price <= self.tp2 => Some((Outcome::WinTp2, reward(self.tp2))),
            Direction::Short if price <= self.tp1 => Some((Outcome::WinTp1, reward(self.tp1))),
            Direction::Short if price >= self.invalidation => Some((Outcome::Loss, -1.0)),
            _ => None,
        };
        if hit.is_some() {
            return hit;
        }

        let elapsed = (now - self.timestamp).num_seconds();
        if elapsed > max_duration_seconds(&self.timeframe) {
            let sign = self.direction.sign() as f64;
            return Some((Outcome::Timeout, sign * (price - self.entry_price) / risk));
        }
        None
    }
}

/// How long an alert may stay open before it times out
pub fn max_duration_seconds(timeframe: &str) -> i64 {
    match timeframe {
        "5m" => 4 * 3600,
        "15m" => 12 * 3600,
        "1h" => 48 * 3600,
        _ => 24 * 3600,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct AlertJournal {
    path: PathBuf,
}

impl AlertJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn append(&self, record: &AlertRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }

    /// Parsed records. Unparseable lines are skipped.
    pub async fn records(&self) -> Result<Vec<AlertRecord>> {
        Ok(self
            .read_lines()
            .await?
            .into_iter()
            .filter_map(|line| match line {
                Line::Record(record) => Some(*record),
                Line::Raw(_) => None,
            })
            .collect())
    }

    async fn read_lines(&self) -> Result<Vec<Line>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(raw
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| match serde_json::from_str(l) {
                Ok(record) => Line::Record(Box::new(record)),
                Err(e) => {
                    warn!("Keeping unparseable journal line: {}", e);
                    Line::Raw(l.to_string())
                }
            })
            .collect())
    }

    /// Resolve pending records against `prices` (by symbol). Returns how many resolved.
    pub async fn resolve_pending(&self, prices: &HashMap<String, f64>, now: DateTime<Utc>) -> Result<usize> {
        let mut lines = self.read_lines().await?;
        let mut resolved = 0;

        for line in &mut lines {
            let Line::Record(record) = line else {
                continue;
            };
            if record.resolved {
                continue;
            }
            let Some(&price) = prices.get(&record.symbol).filter(|p| **p > 0.0) else {
                continue;
            };
            if let Some((outcome, r)) = record.evaluate(price, now) {
                record.resolved = true;
                record.outcome = Some(outcome);
                record.outcome_timestamp = Some(now);
                record.outcome_price = Some(price);
                record.r_multiple = Some(round2(r));
                resolved += 1;
                info!(alert_id = %record.alert_id, ?outcome, r = round2(r), "Resolved alert");
            }
        }

        if resolved > 0 {
            let mut out = String::new();
            for line in &lines {
                match line {
                    Line::Record(record) => out.push_str(&serde_json::to_string(record)?),
                    Line::Raw(raw) => out.push_str(raw),
                }
                out.push('\n');
            }
            let mut tmp = self.path.as_os_str().to_owned();
            tmp.push(".tmp");
            let tmp = PathBuf::from(tmp);
            fs::write(&tmp, out).await?;
            fs::rename(&tmp, &self.path).await?;
        }
        Ok(resolved)
    }
}

enum Line {
    Record(Box<AlertRecord>),
    Raw(String),
}
