//! Market data collectors
//!
//! Every collector has a fallible `try_*` fetch and a public `fetch_*`
//! that never fails: errors are logged and turned into an unhealthy
//! snapshot so scoring can proceed degraded.

use serde_json::Value;

pub mod budget;
pub mod derivatives;
pub mod flows;
pub mod http;
pub mod orderbook;
pub mod price;
pub mod social;

pub use budget::{BudgetManager, CallBudget};
pub use derivatives::fetch_derivatives;
pub use flows::fetch_flows;
pub use http::HttpFetcher;
pub use orderbook::fetch_order_book;
pub use price::{fetch_btc_candles, fetch_btc_price, fetch_macro_context, fetch_spx_candles, SpxCandles};
pub use social::{fetch_fear_greed, fetch_news};

/// Provider base URLs. Overridable so tests can point at a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub kraken: String,
    pub coingecko: String,
    pub yahoo: String,
    pub binance_futures: String,
    pub bybit: String,
    pub alternative_me: String,
    pub rss_feeds: Vec<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            kraken: "https://api.kraken.com".to_string(),
            coingecko: "https://api.coingecko.com".to_string(),
            yahoo: "https://query1.finance.yahoo.com".to_string(),
            binance_futures: "https://fapi.binance.com".to_string(),
            bybit: "https://api.bybit.com".to_string(),
            alternative_me: "https://api.alternative.me".to_string(),
            rss_feeds: vec![
                "https://cointelegraph.com/rss".to_string(),
                "https://www.coindesk.com/arc/outboundfeeds/rss/".to_string(),
            ],
        }
    }
}

impl Endpoints {
    /// Every provider served from one base, feeds under `/rss/{n}`
    pub fn single_host(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            kraken: base.clone(),
            coingecko: base.clone(),
            yahoo: base.clone(),
            binance_futures: base.clone(),
            bybit: base.clone(),
            alternative_me: base.clone(),
            rss_feeds: vec![format!("{}/rss/1", base), format!("{}/rss/2", base)],
        }
    }
}

/// Exchanges send numbers both as JSON numbers and as strings
pub(crate) fn num(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
