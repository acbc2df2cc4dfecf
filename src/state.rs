//! Alert lifecycle gate
//!
//! Per (symbol, timeframe) memory of the last sent setup. Decides whether a
//! fresh score is worth sending and records the decision. Persistence sits
//! behind `StateBackend`; the JSON file backend rotates a corrupt file aside
//! and starts empty instead of failing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::config::CooldownSeconds;
use crate::engine::AlertScore;
use crate::types::{tier_rank, Action, Direction, Result, Tier};

/// Persisted lifecycle for one (symbol, timeframe)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEntry {
    pub lifecycle_key: String,
    pub tier: String,
    pub last_sent: i64,
    #[serde(default)]
    pub last_candle_ts: i64,
    #[serde(default)]
    pub tp1_hit: bool,
}

/// `{symbol: {timeframe: entry}}`
pub type AlertState = BTreeMap<String, BTreeMap<String, LifecycleEntry>>;

/// Minimal load/save boundary for lifecycle state
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Never fails: unreadable state is treated as empty
    async fn load(&self) -> AlertState;
    async fn save(&self, state: &AlertState) -> Result<()>;
}

/// JSON file written via temp file + rename
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl StateBackend for JsonStateFile {
    async fn load(&self) -> AlertState {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return AlertState::new(),
            Err(e) => {
                warn!(path = %self.path.display(), "Unreadable alert state, starting empty: {}", e);
                return AlertState::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                let backup = self.backup_path();
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    "Corrupt alert state rotated aside: {}",
                    e
                );
                if let Err(e) = fs::rename(&self.path, &backup).await {
                    warn!("Failed to rotate corrupt state: {}", e);
                }
                AlertState::new()
            }
        }
    }

    async fn save(&self, state: &AlertState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, serde_json::to_string_pretty(state)?).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "Wrote alert state");
        Ok(())
    }
}

/// Whether `price` has reached TP1 in the signal's direction
pub fn tp1_crossed(score: &AlertScore, price: f64) -> bool {
    match score.direction {
        Direction::Long => score.tp1 > 0.0 && price >= score.tp1,
        Direction::Short => score.tp1 > 0.0 && price <= score.tp1,
        Direction::Neutral => false,
    }
}

/// Send/suppress decisions over persisted lifecycle state
pub struct AlertGate<B: StateBackend> {
    backend: B,
    state: AlertState,
    cooldowns: CooldownSeconds,
}

impl<B: StateBackend> AlertGate<B> {
    /// Load state once at startup
    pub async fn open(backend: B, cooldowns: CooldownSeconds) -> Self {
        let state = backend.load().await;
        Self {
            backend,
            state,
            cooldowns,
        }
    }

    pub fn entry(&self, symbol: &str, timeframe: &str) -> Option<&LifecycleEntry> {
        self.state.get(symbol)?.get(timeframe)
    }

    pub fn should_send(&self, score: &AlertScore, price: f64, now: i64) -> bool {
        if score.action == Action::Skip {
            return false;
        }
        let Some(entry) = self.entry(&score.symbol, &score.timeframe) else {
            return true;
        };

        if entry.lifecycle_key != score.lifecycle_key {
            return true;
        }
        if entry.last_candle_ts > 0 && score.last_candle_ts > entry.last_candle_ts {
            return true;
        }
        if tier_rank(score.tier.as_str()) > tier_rank(&entry.tier) {
            return true;
        }

        if now - entry.last_sent > self.cooldowns.for_tier(score.tier) {
            return true;
        }

        !entry.tp1_hit && tp1_crossed(score, price)
    }

    /// Overwrite the entry after a send decision and persist
    pub async fn record_sent(&mut self, score: &AlertScore, price: f64, now: i64) -> Result<()> {
        let entry = LifecycleEntry {
            lifecycle_key: score.lifecycle_key.clone(),
            tier: score.tier.as_str().to_string(),
            last_sent: now,
            last_candle_ts: score.last_candle_ts,
            tp1_hit: tp1_crossed(score, price),
        };
        self.state
            .entry(score.symbol.clone())
            .or_default()
            .insert(score.timeframe.clone(), entry);
        self.backend.save(&self.state).await
    }

    pub fn cooldown_for(&self, tier: Tier) -> i64 {
        self.cooldowns.for_tier(tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonStateFile::new(dir.path().join("state.json"));
        assert!(backend.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_rotated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let backend = JsonStateFile::new(&path);
        assert!(backend.load().await.is_empty());
        assert!(!path.exists());
        assert!(dir.path().join("state.json.bak").exists());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonStateFile::new(dir.path().join("nested").join("state.json"));

        let mut state = AlertState::new();
        state.entry("BTC".to_string()).or_default().insert(
            "5m".to_string(),
            LifecycleEntry {
                lifecycle_key: "k".to_string(),
                tier: "B".to_string(),
                last_sent: 10,
                last_candle_ts: 5,
                tp1_hit: true,
            },
        );
        backend.save(&state).await.unwrap();
        assert_eq!(backend.load().await, state);
    }
}
