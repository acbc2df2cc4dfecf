//! BTC Alerts Library
//!
//! Deterministic multi-timeframe alert scoring for BTC and an SPX proxy,
//! with the collectors, lifecycle gate and delivery around it.

pub mod collectors;
pub mod config;
pub mod engine;
pub mod format;
pub mod indicators;
pub mod intelligence;
pub mod journal;
pub mod notifier;
pub mod replay;
pub mod runner;
pub mod state;
pub mod types;

// Re-export main types for convenience
pub use collectors::{BudgetManager, CallBudget, Endpoints, HttpFetcher};
pub use config::Settings;
pub use engine::{AlertEngine, AlertScore, DecisionTrace, ScoreBreakdown, ScoreInput};
pub use journal::{AlertJournal, AlertRecord, Outcome};
pub use notifier::{ConsoleNotifier, Notifier, TelegramNotifier};
pub use runner::{AlertRunner, CycleReport, MarketData};
pub use state::{AlertGate, JsonStateFile, StateBackend};
pub use types::*;
