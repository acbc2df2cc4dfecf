use serde::{Deserialize, Serialize};

/// OHLCV candle. The last element of any window is the bar still forming.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time, unix seconds
    pub ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(ts: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// All bars except the one still forming.
pub fn closed(candles: &[Candle]) -> &[Candle] {
    match candles.len() {
        0 => candles,
        n => &candles[..n - 1],
    }
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Spot price snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub price: f64,
    pub timestamp: i64,
    pub source: String,
    pub healthy: bool,
}

impl PriceSnapshot {
    pub fn new(price: f64, timestamp: i64, source: &str) -> Self {
        Self {
            price,
            timestamp,
            source: source.to_string(),
            healthy: true,
        }
    }

    pub fn unavailable(timestamp: i64) -> Self {
        Self {
            price: 0.0,
            timestamp,
            source: "none".to_string(),
            healthy: false,
        }
    }
}

/// Fear & Greed index reading (0 = extreme fear, 100 = extreme greed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FearGreedSnapshot {
    pub value: u32,
    pub label: String,
    pub source: String,
    pub healthy: bool,
}

impl FearGreedSnapshot {
    pub fn new(value: u32, label: &str) -> Self {
        Self {
            value,
            label: label.to_string(),
            source: "alternative_me".to_string(),
            healthy: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            value: 50,
            label: "Neutral".to_string(),
            source: "none".to_string(),
            healthy: false,
        }
    }
}

/// Perpetual futures context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivativesSnapshot {
    pub funding_rate: f64,
    pub oi_change_pct: f64,
    pub basis_pct: f64,
    pub source: String,
    pub healthy: bool,
}

impl DerivativesSnapshot {
    pub fn unavailable(source: &str) -> Self {
        Self {
            funding_rate: 0.0,
            oi_change_pct: 0.0,
            basis_pct: 0.0,
            source: source.to_string(),
            healthy: false,
        }
    }
}

/// Taker and positioning flow context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub taker_ratio: f64,
    pub long_short_ratio: f64,
    pub crowding_score: f64,
    pub source: String,
    pub healthy: bool,
}

impl FlowSnapshot {
    pub fn from_ratios(taker_ratio: f64, long_short_ratio: f64, source: &str) -> Self {
        Self {
            taker_ratio,
            long_short_ratio,
            crowding_score: (taker_ratio - 1.0) * 12.0 + (long_short_ratio - 1.0) * 10.0,
            source: source.to_string(),
            healthy: true,
        }
    }

    pub fn unavailable(source: &str) -> Self {
        Self {
            taker_ratio: 1.0,
            long_short_ratio: 1.0,
            crowding_score: 0.0,
            source: source.to_string(),
            healthy: false,
        }
    }
}

/// Top-of-book depth, (price, quantity) levels best first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    pub timestamp: i64,
    pub bids: Vec<(f64, f64)>,
    pub asks: Vec<(f64, f64)>,
    pub source: String,
    pub healthy: bool,
    pub message: Option<String>,
}

impl OrderBookSnapshot {
    pub fn unavailable(symbol: &str, timestamp: i64, message: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp,
            bids: Vec::new(),
            asks: Vec::new(),
            source: "none".to_string(),
            healthy: false,
            message: Some(message.to_string()),
        }
    }
}

/// News headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
}

impl Headline {
    pub fn new(title: &str, source: &str) -> Self {
        Self {
            title: title.to_string(),
            source: source.to_string(),
        }
    }
}

/// Cross-asset candles used for risk-on/off context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MacroContext {
    pub spx: Vec<Candle>,
    pub vix: Vec<Candle>,
    pub nq: Vec<Candle>,
    pub dxy: Vec<Candle>,
    pub gold: Vec<Candle>,
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
            Direction::Neutral => "NEUTRAL",
        }
    }

    pub fn sign(&self) -> i32 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
            Direction::Neutral => 0,
        }
    }

    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Direction::Long
        } else if value < 0.0 {
            Direction::Short
        } else {
            Direction::Neutral
        }
    }
}

/// Coarse confidence bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "NO-TRADE")]
    NoTrade,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "A+")]
    APlus,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::NoTrade => "NO-TRADE",
            Tier::B => "B",
            Tier::APlus => "A+",
        }
    }
}

/// Ordering used when comparing a fresh tier to a persisted one.
/// `WATCH` only appears in state written by older builds.
pub fn tier_rank(tier: &str) -> u8 {
    match tier {
        "A+" => 3,
        "B" => 2,
        "WATCH" => 1,
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Trade,
    Watch,
    Skip,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Trade => "TRADE",
            Action::Watch => "WATCH",
            Action::Skip => "SKIP",
        }
    }
}

/// Classified market character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Trend,
    Range,
    VolChop,
    Chop,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Trend => "trend",
            Regime::Range => "range",
            Regime::VolChop => "vol_chop",
            Regime::Chop => "chop",
        }
    }
}

/// Canonical strategy label attached to an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    Breakout,
    MeanReversion,
    TrendContinuation,
    VolatilityExpansion,
    None,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Breakout => "BREAKOUT",
            Strategy::MeanReversion => "MEAN_REVERSION",
            Strategy::TrendContinuation => "TREND_CONTINUATION",
            Strategy::VolatilityExpansion => "VOLATILITY_EXPANSION",
            Strategy::None => "NONE",
        }
    }
}

/// Trading session derived from the latest bar's UTC time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Session {
    Asia,
    Europe,
    Us,
    Weekend,
    Unknown,
}

impl Session {
    pub fn as_str(&self) -> &'static str {
        match self {
            Session::Asia => "asia",
            Session::Europe => "europe",
            Session::Us => "us",
            Session::Weekend => "weekend",
            Session::Unknown => "unknown",
        }
    }
}

/// Error types for the alert engine
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Call budget exhausted for {0}")]
    BudgetExhausted(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for alert engine operations
pub type Result<T> = std::result::Result<T, AlertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_drops_forming_bar() {
        let candles = vec![
            Candle::new(0, 1.0, 2.0, 0.5, 1.5, 10.0),
            Candle::new(300, 1.5, 2.5, 1.0, 2.0, 10.0),
        ];
        assert_eq!(closed(&candles).len(), 1);
        assert!(closed(&[]).is_empty());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&Tier::APlus).unwrap(), "\"A+\"");
        assert_eq!(serde_json::to_string(&Tier::NoTrade).unwrap(), "\"NO-TRADE\"");
        assert_eq!(serde_json::to_string(&Regime::VolChop).unwrap(), "\"vol_chop\"");
        assert_eq!(
            serde_json::to_string(&Strategy::TrendContinuation).unwrap(),
            "\"TREND_CONTINUATION\""
        );
        assert_eq!(serde_json::to_string(&Direction::Long).unwrap(), "\"LONG\"");
    }

    #[test]
    fn test_tier_rank_ordering() {
        assert!(tier_rank("NO-TRADE") < tier_rank("WATCH"));
        assert!(tier_rank("WATCH") < tier_rank("B"));
        assert!(tier_rank("B") < tier_rank("A+"));
    }

    #[test]
    fn test_flow_crowding() {
        let flow = FlowSnapshot::from_ratios(1.5, 1.2, "binance");
        assert!((flow.crowding_score - 8.0).abs() < 1e-9);
    }
}
