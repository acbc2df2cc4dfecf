//! Per-source call budget
//!
//! Sliding-window call counts shared by every collector. The windows are
//! persisted after each record so limits survive a restart.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::BudgetLimit;

/// Admission check consumed by the collectors
#[async_trait]
pub trait CallBudget: Send + Sync {
    async fn can_call(&self, source: &str) -> bool;
    async fn record_call(&self, source: &str);

    /// Check and record in one step
    async fn try_acquire(&self, source: &str) -> bool {
        if self.can_call(source).await {
            self.record_call(source).await;
            true
        } else {
            false
        }
    }
}

/// Sliding-window limiter backed by a JSON file
pub struct BudgetManager {
    limits: BTreeMap<String, BudgetLimit>,
    windows: Mutex<HashMap<String, VecDeque<f64>>>,
    path: Option<PathBuf>,
    /// Serializes file writes so the newest windows land last
    write_lock: tokio::sync::Mutex<()>,
}

fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

impl BudgetManager {
    /// Load persisted windows from `path`. An unreadable file is ignored.
    pub fn new(limits: BTreeMap<String, BudgetLimit>, path: Option<PathBuf>) -> Self {
        let windows = path.as_ref().map(Self::read_windows).unwrap_or_default();
        Self {
            limits,
            windows: Mutex::new(windows),
            path,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// In-memory only, used by tests and one-off tools
    pub fn in_memory(limits: BTreeMap<String, BudgetLimit>) -> Self {
        Self::new(limits, None)
    }

    fn read_windows(path: &PathBuf) -> HashMap<String, VecDeque<f64>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str::<HashMap<String, Vec<f64>>>(&raw) {
            Ok(map) => map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            Err(e) => {
                warn!(path = %path.display(), "Ignoring unreadable budget file: {}", e);
                HashMap::new()
            }
        }
    }

    pub fn limit_for(&self, source: &str) -> BudgetLimit {
        self.limits.get(source).copied().unwrap_or_default()
    }

    fn prune(window: &mut VecDeque<f64>, now: f64, span: f64) {
        while window.front().is_some_and(|ts| now - ts >= span) {
            window.pop_front();
        }
    }

    pub fn can_call_at(&self, source: &str, now: f64) -> bool {
        let limit = self.limit_for(source);
        let Ok(mut windows) = self.windows.lock() else {
            return false;
        };
        let window = windows.entry(source.to_string()).or_default();
        Self::prune(window, now, limit.window_seconds);
        window.len() < limit.max_calls as usize
    }

    pub async fn record_call_at(&self, source: &str, now: f64) {
        {
            let Ok(mut windows) = self.windows.lock() else {
                return;
            };
            windows.entry(source.to_string()).or_default().push_back(now);
        }
        self.persist().await;
    }

    /// Check and record under a single lock
    pub async fn try_acquire_at(&self, source: &str, now: f64) -> bool {
        let limit = self.limit_for(source);
        {
            let Ok(mut windows) = self.windows.lock() else {
                return false;
            };
            let window = windows.entry(source.to_string()).or_default();
            Self::prune(window, now, limit.window_seconds);
            if window.len() >= limit.max_calls as usize {
                debug!(source, "Call budget exhausted");
                return false;
            }
            window.push_back(now);
        }
        self.persist().await;
        true
    }

    fn snapshot(&self) -> Option<BTreeMap<String, Vec<f64>>> {
        let windows = self.windows.lock().ok()?;
        Some(
            windows
                .iter()
                .map(|(k, v)| (k.clone(), v.iter().copied().collect()))
                .collect(),
        )
    }

    /// Write the current windows via temp file + rename
    async fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let _guard = self.write_lock.lock().await;
        let Some(snapshot) = self.snapshot() else {
            return;
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent).await {
                warn!("Failed to create budget directory: {}", e);
                return;
            }
        }
        let raw = match serde_json::to_string(&snapshot) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to encode call budget: {}", e);
                return;
            }
        };
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let result = match fs::write(&tmp, raw).await {
            Ok(()) => fs::rename(&tmp, path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(path = %path.display(), "Failed to persist call budget: {}", e);
        }
    }
}

#[async_trait]
impl CallBudget for BudgetManager {
    async fn can_call(&self, source: &str) -> bool {
        self.can_call_at(source, now_secs())
    }

    async fn record_call(&self, source: &str) {
        self.record_call_at(source, now_secs()).await
    }

    async fn try_acquire(&self, source: &str) -> bool {
        self.try_acquire_at(source, now_secs()).await
    }
}
