//! Alert engine configuration
//!
//! Every tuned threshold lives here as a typed struct with serde defaults.
//! `Settings::load` layers an optional file and `ALERTS__*` environment
//! variables over the defaults, then validates once.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::types::{AlertError, Regime, Result, Session, Strategy, Tier};

/// Timeframes scored every cycle
pub const TIMEFRAMES: [&str; 3] = ["5m", "15m", "1h"];

/// Rule set used when a timeframe has no entry of its own
const FALLBACK_TIMEFRAME: &str = "15m";

/// Top-level settings tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub regime: RegimeThresholds,
    pub detectors: DetectorThresholds,
    pub timeframes: BTreeMap<String, TimeframeRule>,
    pub stale_seconds: BTreeMap<String, i64>,
    pub cooldowns: CooldownSeconds,
    pub http_retry: RetryPolicy,
    pub session_weights: BTreeMap<String, StrategyWeights>,
    pub confluence: ConfluenceRules,
    pub targets: TargetMultipliers,
    pub arbitration: ArbitrationRules,
    pub news: NewsRules,
    pub session_penalties: SessionPenalties,
    pub vix: VixRules,
    pub intelligence: IntelligenceFlags,
    pub sentiment: SentimentConfig,
    pub squeeze: SqueezeConfig,
    pub liquidity: LiquidityConfig,
    pub volume_profile: VolumeProfileConfig,
    pub budgets: BTreeMap<String, BudgetLimit>,
    pub runtime: RuntimeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            regime: RegimeThresholds::default(),
            detectors: DetectorThresholds::default(),
            timeframes: default_timeframes(),
            stale_seconds: default_stale_seconds(),
            cooldowns: CooldownSeconds::default(),
            http_retry: RetryPolicy::default(),
            session_weights: default_session_weights(),
            confluence: ConfluenceRules::default(),
            targets: TargetMultipliers::default(),
            arbitration: ArbitrationRules::default(),
            news: NewsRules::default(),
            session_penalties: SessionPenalties::default(),
            vix: VixRules::default(),
            intelligence: IntelligenceFlags::default(),
            sentiment: SentimentConfig::default(),
            squeeze: SqueezeConfig::default(),
            liquidity: LiquidityConfig::default(),
            volume_profile: VolumeProfileConfig::default(),
            budgets: default_budgets(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Settings {
    /// Load defaults, then an optional config file, then `ALERTS__SECTION__KEY`
    /// environment overrides. Fails fast on invalid thresholds.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let defaults =
            config::Config::try_from(&Settings::default()).context("Failed to serialize default settings")?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ALERTS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check documented invariants once at startup
    pub fn validate(&self) -> Result<()> {
        for (tf, rule) in &self.timeframes {
            if rule.trade_long <= rule.watch_long {
                return Err(invalid(format!("{}: trade_long must be > watch_long", tf)));
            }
            if rule.trade_short >= rule.watch_short {
                return Err(invalid(format!("{}: trade_short must be < watch_short", tf)));
            }
            if rule.watch_short >= rule.watch_long {
                return Err(invalid(format!("{}: watch_short must be < watch_long", tf)));
            }
            if rule.min_rr <= 0.0 {
                return Err(invalid(format!("{}: min_rr must be > 0", tf)));
            }
        }
        for (tf, seconds) in &self.stale_seconds {
            if *seconds <= 0 {
                return Err(invalid(format!("{}: stale seconds must be > 0", tf)));
            }
        }
        if self.confluence.a_plus < self.confluence.b {
            return Err(invalid("confluence: a_plus must be >= b".to_string()));
        }
        for (source, limit) in &self.budgets {
            if limit.window_seconds <= 0.0 {
                return Err(invalid(format!("budget {}: window must be > 0", source)));
            }
        }
        if self.http_retry.attempts == 0 {
            return Err(invalid("http_retry: attempts must be >= 1".to_string()));
        }
        if self.runtime.workers == 0 {
            return Err(invalid("runtime: workers must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Thresholds for a timeframe, falling back to the 15m rule set
    pub fn rule_for(&self, timeframe: &str) -> TimeframeRule {
        self.timeframes
            .get(timeframe)
            .or_else(|| self.timeframes.get(FALLBACK_TIMEFRAME))
            .copied()
            .unwrap_or_default()
    }

    pub fn stale_for(&self, timeframe: &str) -> i64 {
        self.stale_seconds
            .get(timeframe)
            .or_else(|| self.stale_seconds.get(FALLBACK_TIMEFRAME))
            .copied()
            .unwrap_or(35 * 60)
    }

    pub fn weights_for(&self, session: Session) -> StrategyWeights {
        self.session_weights
            .get(session.as_str())
            .copied()
            .unwrap_or_default()
    }
}

fn invalid(message: String) -> AlertError {
    AlertError::Config(message)
}

/// Regime classifier thresholds and point contributions
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    pub adx_period: usize,
    pub adx_trend: f64,
    pub slope_trend: f64,
    pub atr_rank_chop: f64,
    pub adx_chop: f64,
    pub adx_low: f64,
    pub atr_rank_low: f64,
    /// Bars needed before the 3-bar persistence rule applies
    pub persistence_min_bars: usize,
    pub trend_points: f64,
    pub vol_chop_points: f64,
    pub chop_points: f64,
    pub range_points: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            adx_period: 14,
            adx_trend: 24.0,
            slope_trend: 0.003,
            atr_rank_chop: 70.0,
            adx_chop: 20.0,
            adx_low: 20.0,
            atr_rank_low: 30.0,
            persistence_min_bars: 35,
            trend_points: 8.0,
            vol_chop_points: -8.0,
            chop_points: -15.0,
            range_points: -2.0,
        }
    }
}

/// Detector bank thresholds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorThresholds {
    pub donchian_lookback: usize,
    pub zscore_period: usize,
    pub zscore_extreme: f64,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub volume_multiplier: f64,
    pub volume_lookback: usize,
    pub bb_period: usize,
    pub bb_std: f64,
    pub vwap_window: usize,
    pub divergence_lookback: usize,
    pub swing_lookback: usize,
    pub swing_tolerance: f64,
    pub points: DetectorPoints,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            donchian_lookback: 20,
            zscore_period: 20,
            zscore_extreme: 1.8,
            rsi_period: 14,
            rsi_oversold: 35.0,
            rsi_overbought: 65.0,
            volume_multiplier: 1.4,
            volume_lookback: 20,
            bb_period: 20,
            bb_std: 2.0,
            vwap_window: 288,
            divergence_lookback: 30,
            swing_lookback: 60,
            swing_tolerance: 0.002,
            points: DetectorPoints::default(),
        }
    }
}

/// Unsigned point value per detector
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorPoints {
    pub divergence: i32,
    pub pattern: i32,
    pub breakout: i32,
    pub mean_reversion: i32,
    pub trend_continuation: i32,
    pub volatility_expansion: i32,
}

impl Default for DetectorPoints {
    fn default() -> Self {
        Self {
            divergence: 14,
            pattern: 6,
            breakout: 12,
            mean_reversion: 10,
            trend_continuation: 9,
            volatility_expansion: 6,
        }
    }
}

/// Per-timeframe decision thresholds on the 0-100 confidence scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeframeRule {
    pub min_rr: f64,
    pub trade_long: f64,
    pub trade_short: f64,
    pub watch_long: f64,
    pub watch_short: f64,
}

impl Default for TimeframeRule {
    fn default() -> Self {
        Self {
            min_rr: 1.25,
            trade_long: 72.0,
            trade_short: 28.0,
            watch_long: 58.0,
            watch_short: 42.0,
        }
    }
}

fn default_timeframes() -> BTreeMap<String, TimeframeRule> {
    let mut rules = BTreeMap::new();
    rules.insert(
        "5m".to_string(),
        TimeframeRule {
            min_rr: 1.35,
            trade_long: 74.0,
            trade_short: 26.0,
            watch_long: 60.0,
            watch_short: 40.0,
        },
    );
    rules.insert("15m".to_string(), TimeframeRule::default());
    rules.insert(
        "1h".to_string(),
        TimeframeRule {
            min_rr: 1.15,
            trade_long: 68.0,
            trade_short: 32.0,
            watch_long: 56.0,
            watch_short: 44.0,
        },
    );
    rules
}

fn default_stale_seconds() -> BTreeMap<String, i64> {
    BTreeMap::from([
        ("5m".to_string(), 12 * 60),
        ("15m".to_string(), 35 * 60),
        ("1h".to_string(), 130 * 60),
    ])
}

/// Minimum seconds between repeat sends of the same setup
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownSeconds {
    pub a_plus: i64,
    pub b: i64,
    pub no_trade: i64,
}

impl CooldownSeconds {
    pub fn for_tier(&self, tier: Tier) -> i64 {
        match tier {
            Tier::APlus => self.a_plus,
            Tier::B => self.b,
            Tier::NoTrade => self.no_trade,
        }
    }
}

impl Default for CooldownSeconds {
    fn default() -> Self {
        Self {
            a_plus: 10 * 60,
            b: 20 * 60,
            no_trade: 20 * 60,
        }
    }
}

/// Retry policy for collector HTTP calls
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_seconds: f64,
    pub jitter_seconds: f64,
    pub timeout_seconds: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            backoff_seconds: 2.0,
            jitter_seconds: 1.0,
            timeout_seconds: 10.0,
        }
    }
}

/// Session multiplier per canonical strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyWeights {
    pub breakout: f64,
    pub mean_reversion: f64,
    pub trend_continuation: f64,
    pub volatility_expansion: f64,
}

impl StrategyWeights {
    pub fn weight(&self, strategy: Strategy) -> f64 {
        match strategy {
            Strategy::Breakout => self.breakout,
            Strategy::MeanReversion => self.mean_reversion,
            Strategy::TrendContinuation => self.trend_continuation,
            Strategy::VolatilityExpansion => self.volatility_expansion,
            Strategy::None => 1.0,
        }
    }
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            breakout: 1.0,
            mean_reversion: 1.0,
            trend_continuation: 1.0,
            volatility_expansion: 1.0,
        }
    }
}

fn default_session_weights() -> BTreeMap<String, StrategyWeights> {
    let w = |breakout, mean_reversion, trend_continuation, volatility_expansion| StrategyWeights {
        breakout,
        mean_reversion,
        trend_continuation,
        volatility_expansion,
    };
    BTreeMap::from([
        ("asia".to_string(), w(0.5, 1.3, 0.7, 0.6)),
        ("europe".to_string(), w(1.2, 0.9, 1.0, 1.1)),
        ("us".to_string(), w(1.1, 0.8, 1.3, 1.2)),
        ("weekend".to_string(), w(0.6, 1.1, 0.7, 0.5)),
        ("unknown".to_string(), StrategyWeights::default()),
    ])
}

/// Independent confirmations required to keep a tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluenceRules {
    pub a_plus: u32,
    pub b: u32,
}

impl Default for ConfluenceRules {
    fn default() -> Self {
        Self { a_plus: 4, b: 2 }
    }
}

/// ATR multiples for targets and invalidation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelMultipliers {
    pub tp1: f64,
    pub tp2: f64,
    pub inv: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetMultipliers {
    pub trend: LevelMultipliers,
    pub range: LevelMultipliers,
    pub vol_chop: LevelMultipliers,
    pub default: LevelMultipliers,
}

impl TargetMultipliers {
    pub fn for_regime(&self, regime: Regime) -> LevelMultipliers {
        match regime {
            Regime::Trend => self.trend,
            Regime::Range => self.range,
            Regime::VolChop => self.vol_chop,
            Regime::Chop => self.default,
        }
    }
}

impl Default for TargetMultipliers {
    fn default() -> Self {
        Self {
            trend: LevelMultipliers { tp1: 1.8, tp2: 3.0, inv: 1.1 },
            range: LevelMultipliers { tp1: 1.2, tp2: 2.0, inv: 0.9 },
            vol_chop: LevelMultipliers { tp1: 1.0, tp2: 1.6, inv: 0.8 },
            default: LevelMultipliers { tp1: 1.6, tp2: 2.8, inv: 1.1 },
        }
    }
}

/// Penalties applied while resolving competing candidates
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrationRules {
    pub conflict_penalty: f64,
    pub tie_suppress_penalty: f64,
}

impl Default for ArbitrationRules {
    fn default() -> Self {
        Self {
            conflict_penalty: 4.0,
            tie_suppress_penalty: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordWeight {
    pub keyword: String,
    pub weight: f64,
}

fn kw(keyword: &str, weight: f64) -> KeywordWeight {
    KeywordWeight {
        keyword: keyword.to_string(),
        weight,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub name: String,
    pub keywords: Vec<KeywordWeight>,
}

/// Headline keyword scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsRules {
    pub groups: Vec<KeywordGroup>,
    pub max_hits_per_keyword: usize,
    pub first_hit_multiplier: f64,
}

impl Default for NewsRules {
    fn default() -> Self {
        Self {
            groups: vec![
                KeywordGroup {
                    name: "policy".to_string(),
                    keywords: vec![
                        kw("trump", 0.0),
                        kw("bitcoin reserve", 0.7),
                        kw("tariff", -0.4),
                        kw("regulation", -0.3),
                    ],
                },
                KeywordGroup {
                    name: "macro".to_string(),
                    keywords: vec![kw("rate hike", -0.4), kw("rate cut", 0.4), kw("fed", -0.1)],
                },
                KeywordGroup {
                    name: "market".to_string(),
                    keywords: vec![kw("etf", 0.2), kw("hack", -0.6), kw("adoption", 0.4)],
                },
            ],
            max_hits_per_keyword: 2,
            first_hit_multiplier: 2.0,
        }
    }
}

/// Low-liquidity hours and weekend damping
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPenalties {
    /// First UTC hour of the weekday dead zone (inclusive)
    pub dead_zone_start_hour: u32,
    /// Last UTC hour of the weekday dead zone (exclusive)
    pub dead_zone_end_hour: u32,
    pub dead_zone_points: f64,
    pub weekend_points: f64,
}

impl Default for SessionPenalties {
    fn default() -> Self {
        Self {
            dead_zone_start_hour: 21,
            dead_zone_end_hour: 24,
            dead_zone_points: 3.0,
            weekend_points: 2.0,
        }
    }
}

/// Volatility index risk-off penalties
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct VixRules {
    pub extreme_level: f64,
    pub spike_pct: f64,
    pub extreme_points: f64,
    pub spike_points: f64,
}

impl Default for VixRules {
    fn default() -> Self {
        Self {
            extreme_level: 30.0,
            spike_pct: 10.0,
            extreme_points: 6.0,
            spike_points: 4.0,
        }
    }
}

/// Feature flags for the optional intelligence layers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelligenceFlags {
    pub squeeze: bool,
    pub volume_profile: bool,
    pub liquidity: bool,
    pub macro_correlation: bool,
    pub sentiment: bool,
    pub confluence: bool,
}

impl IntelligenceFlags {
    pub fn all_disabled() -> Self {
        Self {
            squeeze: false,
            volume_profile: false,
            liquidity: false,
            macro_correlation: false,
            sentiment: false,
            confluence: false,
        }
    }
}

impl Default for IntelligenceFlags {
    fn default() -> Self {
        Self {
            squeeze: true,
            volume_profile: true,
            liquidity: true,
            macro_correlation: true,
            sentiment: true,
            confluence: true,
        }
    }
}

/// Headline sentiment lexicon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub positive_keywords: Vec<String>,
    pub negative_keywords: Vec<String>,
    pub lexicon: Vec<KeywordWeight>,
    /// Valence of a positive/negative keyword stem hit
    pub keyword_valence: f64,
    pub neutral_band: f64,
    pub positive_news_points: f64,
    pub negative_news_points: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        let words = |list: &[&str]| list.iter().map(|w| w.to_string()).collect::<Vec<_>>();
        Self {
            positive_keywords: words(&[
                "bullish", "breakout", "rally", "surge", "gain", "up", "positive", "grow",
                "strong", "recover", "innovat", "adopt", "partner", "launch", "success",
                "advance", "boom", "explod", "soar",
            ]),
            negative_keywords: words(&[
                "bearish", "dump", "crash", "fall", "down", "negative", "lose", "weak",
                "decline", "hack", "scam", "fraud", "ban", "regul", "restrict", "capitulat",
                "drop", "slump", "dip", "threat",
            ]),
            lexicon: vec![
                kw("btc", 0.8),
                kw("bitcoin", 0.8),
                kw("eth", 0.7),
                kw("ethereum", 0.7),
                kw("crypto", 0.6),
                kw("blockchain", 0.5),
                kw("hodl", 0.7),
                kw("moon", 0.8),
                kw("pump", 0.6),
                kw("bull", 0.6),
                kw("bear", -0.6),
                kw("fud", -0.7),
                kw("scam", -0.8),
                kw("hack", -0.9),
                kw("rug pull", -0.9),
                kw("liquidate", -0.7),
                kw("ath", 0.7),
                kw("all-time high", 0.7),
                kw("atl", -0.7),
                kw("all-time low", -0.7),
                kw("defi", 0.5),
                kw("halving", 0.6),
                kw("staking", 0.5),
                kw("whale", 0.5),
                kw("institutional", 0.6),
                kw("adoption", 0.7),
                kw("regulation", -0.5),
                kw("policy", -0.4),
                kw("stablecoin", 0.2),
                kw("fiat", -0.2),
                kw("bear market", -0.8),
                kw("bull market", 0.8),
                kw("fear", -0.6),
                kw("greed", 0.6),
            ],
            keyword_valence: 1.0,
            neutral_band: 0.05,
            positive_news_points: 3.0,
            negative_news_points: 3.0,
        }
    }
}

/// Bollinger-inside-Keltner compression detector
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SqueezeConfig {
    pub bb_period: usize,
    pub bb_std: f64,
    pub kc_period: usize,
    pub kc_atr_mult: f64,
    pub fire_points: f64,
    pub momentum_lookback: usize,
}

impl Default for SqueezeConfig {
    fn default() -> Self {
        Self {
            bb_period: 20,
            bb_std: 2.0,
            kc_period: 20,
            kc_atr_mult: 1.5,
            fire_points: 8.0,
            momentum_lookback: 14,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityConfig {
    pub depth_pct: f64,
    pub wall_quantity: f64,
    pub imbalance_threshold: f64,
    pub imbalance_points: f64,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            depth_pct: 0.005,
            wall_quantity: 100.0,
            imbalance_threshold: 0.2,
            imbalance_points: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeProfileConfig {
    pub bins: usize,
    pub value_area_pct: f64,
    pub min_candles: usize,
    pub points: f64,
}

impl Default for VolumeProfileConfig {
    fn default() -> Self {
        Self {
            bins: 50,
            value_area_pct: 0.70,
            min_candles: 5,
            points: 3.0,
        }
    }
}

/// Sliding-window call budget for one provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetLimit {
    pub max_calls: u32,
    pub window_seconds: f64,
}

impl Default for BudgetLimit {
    fn default() -> Self {
        Self {
            max_calls: 5,
            window_seconds: 60.0,
        }
    }
}

pub fn default_budgets() -> BTreeMap<String, BudgetLimit> {
    let limit = |max_calls, window_seconds| BudgetLimit {
        max_calls,
        window_seconds,
    };
    BTreeMap::from([
        ("kraken".to_string(), limit(24, 60.0)),
        ("coingecko".to_string(), limit(10, 60.0)),
        ("alternative_me".to_string(), limit(5, 300.0)),
        ("rss".to_string(), limit(20, 300.0)),
        ("llm".to_string(), limit(5, 300.0)),
        ("yahoo".to_string(), limit(10, 300.0)),
        ("bybit".to_string(), limit(24, 60.0)),
        ("okx".to_string(), limit(24, 60.0)),
        ("binance".to_string(), limit(24, 60.0)),
    ])
}

/// Process-level settings: files, cadence, pool size
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub state_path: String,
    pub budget_path: String,
    pub alert_log_path: String,
    pub interval_seconds: u64,
    pub workers: usize,
    pub candle_limit: usize,
    pub news_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            budget_path: default_budget_path(),
            alert_log_path: default_alert_log_path(),
            interval_seconds: 300,
            workers: 8,
            candle_limit: 120,
            news_limit: 20,
        }
    }
}

fn default_state_path() -> String {
    "data/alert_state.json".to_string()
}

fn default_budget_path() -> String {
    "data/budget.json".to_string()
}

fn default_alert_log_path() -> String {
    "logs/alerts.jsonl".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.rule_for("5m").trade_long, 74.0);
        assert_eq!(settings.stale_for("1h"), 7800);
    }

    #[test]
    fn test_rejects_trade_not_stricter_than_watch() {
        let mut settings = Settings::default();
        if let Some(rule) = settings.timeframes.get_mut("5m") {
            rule.trade_long = rule.watch_long;
        }
        assert!(matches!(settings.validate(), Err(AlertError::Config(_))));

        let mut settings = Settings::default();
        if let Some(rule) = settings.timeframes.get_mut("1h") {
            rule.trade_short = rule.watch_short;
        }
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_bounds() {
        let mut settings = Settings::default();
        settings.stale_seconds.insert("5m".to_string(), 0);
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        if let Some(rule) = settings.timeframes.get_mut("15m") {
            rule.min_rr = 0.0;
        }
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_file_override_keeps_other_map_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.toml");
        std::fs::write(
            &path,
            "[stale_seconds]\n5m = 600\n\n[timeframes.1h]\nmin_rr = 1.5\n\n[runtime]\nworkers = 4\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.stale_for("5m"), 600);
        assert_eq!(settings.stale_for("1h"), 7800);
        assert_eq!(settings.rule_for("1h").min_rr, 1.5);
        assert_eq!(settings.rule_for("1h").trade_long, 68.0);
        assert_eq!(settings.rule_for("5m").trade_long, 74.0);
        assert_eq!(settings.budgets["kraken"].max_calls, 24);
        assert_eq!(settings.runtime.workers, 4);
        assert_eq!(settings.runtime.candle_limit, 120);
    }

    #[test]
    fn test_load_without_file_matches_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.timeframes, Settings::default().timeframes);
        assert_eq!(settings.news.groups.len(), 3);
    }

    #[test]
    fn test_unknown_timeframe_falls_back() {
        let settings = Settings::default();
        assert_eq!(settings.rule_for("2m"), settings.rule_for("15m"));
        assert_eq!(settings.stale_for("2m"), 2100);
    }

    #[test]
    fn test_session_weights_lookup() {
        let settings = Settings::default();
        let asia = settings.weights_for(Session::Asia);
        assert_eq!(asia.weight(Strategy::MeanReversion), 1.3);
        assert_eq!(settings.weights_for(Session::Unknown).weight(Strategy::Breakout), 1.0);
        assert_eq!(Settings::default().cooldowns.for_tier(Tier::APlus), 600);
    }
}
