//! Indicator library
//!
//! Pure, deterministic functions over price and candle windows. Each one
//! returns `None` (or an empty/false result) when history is insufficient,
//! so callers pick their own neutral default.

pub mod levels;
pub mod momentum;
pub mod patterns;
pub mod trend;
pub mod volatility;

pub use levels::{donchian_break, swing_levels, volume_delta, SwingLevels};
pub use momentum::{percentile_rank, rsi, rsi_series, zscore};
pub use patterns::{engulfing, pin_bar, rsi_divergence};
pub use trend::{adx, ema, sma, vwap};
pub use volatility::{atr, bollinger, keltner, true_range, Bands};
