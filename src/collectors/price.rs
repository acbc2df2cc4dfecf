//! Spot price and candles: Kraken for BTC, Yahoo for equities and macro

use serde_json::Value;
use tracing::warn;

use super::{num, Endpoints, HttpFetcher};
use crate::types::{AlertError, Candle, MacroContext, PriceSnapshot, Result};

const KRAKEN_PAIR: &str = "XXBTZUSD";

/// Kraken OHLC interval in minutes
fn kraken_interval(timeframe: &str) -> &'static str {
    match timeframe {
        "5m" => "5",
        "1h" => "60",
        _ => "15",
    }
}

/// Yahoo chart (interval, range)
fn yahoo_interval(timeframe: &str) -> (&'static str, &'static str) {
    match timeframe {
        "5m" => ("5m", "5d"),
        "1h" => ("60m", "1mo"),
        _ => ("15m", "5d"),
    }
}

fn kraken_result<'a>(payload: &'a Value, key: &str) -> Result<&'a Value> {
    if let Some(errors) = payload["error"].as_array().filter(|e| !e.is_empty()) {
        return Err(AlertError::InvalidResponse(format!("kraken: {:?}", errors)));
    }
    payload["result"]
        .get(key)
        .ok_or_else(|| AlertError::InvalidResponse(format!("kraken: missing {}", key)))
}

pub async fn try_kraken_price(http: &HttpFetcher, endpoints: &Endpoints, now: i64) -> Result<PriceSnapshot> {
    let url = format!("{}/0/public/Ticker", endpoints.kraken);
    let payload: Value = http.get_json("kraken", &url, &[("pair", KRAKEN_PAIR)]).await?;
    let price = num(&kraken_result(&payload, KRAKEN_PAIR)?["c"][0])
        .ok_or_else(|| AlertError::InvalidResponse("kraken: ticker without last trade".to_string()))?;
    Ok(PriceSnapshot::new(price, now, "kraken"))
}

pub async fn try_coingecko_price(http: &HttpFetcher, endpoints: &Endpoints, now: i64) -> Result<PriceSnapshot> {
    let url = format!("{}/api/v3/simple/price", endpoints.coingecko);
    let payload: Value = http
        .get_json("coingecko", &url, &[("ids", "bitcoin"), ("vs_currencies", "usd")])
        .await?;
    let price = num(&payload["bitcoin"]["usd"])
        .ok_or_else(|| AlertError::InvalidResponse("coingecko: missing bitcoin.usd".to_string()))?;
    Ok(PriceSnapshot::new(price, now, "coingecko"))
}

/// Kraken first, CoinGecko second
pub async fn fetch_btc_price(http: &HttpFetcher, endpoints: &Endpoints, now: i64) -> PriceSnapshot {
    match try_kraken_price(http, endpoints, now).await {
        Ok(snapshot) => return snapshot,
        Err(e) => warn!("Kraken price fetch failed: {}", e),
    }
    match try_coingecko_price(http, endpoints, now).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("CoinGecko price fetch failed: {}", e);
            PriceSnapshot::unavailable(now)
        }
    }
}

pub fn parse_kraken_ohlc(payload: &Value, limit: usize) -> Result<Vec<Candle>> {
    let rows = kraken_result(payload, KRAKEN_PAIR)?
        .as_array()
        .ok_or_else(|| AlertError::InvalidResponse("kraken: OHLC is not an array".to_string()))?;

    let mut candles: Vec<Candle> = rows
        .iter()
        .filter_map(|row| {
            Some(Candle::new(
                row[0].as_i64()?,
                num(&row[1])?,
                num(&row[2])?,
                num(&row[3])?,
                num(&row[4])?,
                num(&row[6])?,
            ))
        })
        .filter(|c| c.high >= c.low)
        .collect();
    let skip = candles.len().saturating_sub(limit);
    candles.drain(..skip);
    Ok(candles)
}

pub async fn try_btc_candles(
    http: &HttpFetcher,
    endpoints: &Endpoints,
    timeframe: &str,
    limit: usize,
) -> Result<Vec<Candle>> {
    let url = format!("{}/0/public/OHLC", endpoints.kraken);
    let payload: Value = http
        .get_json("kraken", &url, &[("pair", KRAKEN_PAIR), ("interval", kraken_interval(timeframe))])
        .await?;
    parse_kraken_ohlc(&payload, limit)
}

pub async fn fetch_btc_candles(http: &HttpFetcher, endpoints: &Endpoints, timeframe: &str, limit: usize) -> Vec<Candle> {
    try_btc_candles(http, endpoints, timeframe, limit)
        .await
        .unwrap_or_else(|e| {
            warn!(timeframe, "Kraken candle fetch failed: {}", e);
            Vec::new()
        })
}

/// Yahoo chart payload to candles, skipping bars with null prices
pub fn parse_yahoo_chart(payload: &Value, limit: usize) -> Result<Vec<Candle>> {
    let result = &payload["chart"]["result"][0];
    let timestamps = result["timestamp"]
        .as_array()
        .ok_or_else(|| AlertError::InvalidResponse("yahoo: missing timestamps".to_string()))?;
    let quote = &result["indicators"]["quote"][0];

    let mut candles = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let (Some(ts), Some(open), Some(high), Some(low), Some(close)) = (
            ts.as_i64(),
            num(&quote["open"][i]),
            num(&quote["high"][i]),
            num(&quote["low"][i]),
            num(&quote["close"][i]),
        ) else {
            continue;
        };
        if high < low {
            continue;
        }
        let volume = num(&quote["volume"][i]).unwrap_or(0.0);
        candles.push(Candle::new(ts, open, high, low, close, volume));
    }
    let skip = candles.len().saturating_sub(limit);
    candles.drain(..skip);
    Ok(candles)
}

pub async fn try_yahoo_candles(
    http: &HttpFetcher,
    endpoints: &Endpoints,
    symbol: &str,
    timeframe: &str,
    limit: usize,
) -> Result<Vec<Candle>> {
    let url = format!("{}/v8/finance/chart/{}", endpoints.yahoo, symbol);
    let (interval, range) = yahoo_interval(timeframe);
    let payload: Value = http
        .get_json("yahoo", &url, &[("interval", interval), ("range", range)])
        .await?;
    parse_yahoo_chart(&payload, limit)
}

async fn yahoo_or_empty(http: &HttpFetcher, endpoints: &Endpoints, symbol: &str, timeframe: &str, limit: usize) -> Vec<Candle> {
    try_yahoo_candles(http, endpoints, symbol, timeframe, limit)
        .await
        .unwrap_or_else(|e| {
            warn!(symbol, timeframe, "Yahoo fetch failed: {}", e);
            Vec::new()
        })
}

/// SPX candles and whether they came from the index or the ETF proxy
#[derive(Debug, Clone, Default)]
pub struct SpxCandles {
    pub candles: Vec<Candle>,
    /// `direct`, `proxy` or `none`
    pub mode: &'static str,
}

/// `^GSPC` first, `SPY` when the index feed is empty
pub async fn fetch_spx_candles(http: &HttpFetcher, endpoints: &Endpoints, timeframe: &str, limit: usize) -> SpxCandles {
    let direct = yahoo_or_empty(http, endpoints, "^GSPC", timeframe, limit).await;
    if !direct.is_empty() {
        return SpxCandles {
            candles: direct,
            mode: "direct",
        };
    }
    let proxy = yahoo_or_empty(http, endpoints, "SPY", timeframe, limit).await;
    let mode = if proxy.is_empty() { "none" } else { "proxy" };
    SpxCandles { candles: proxy, mode }
}

/// 5m cross-asset series for risk-on/off context
pub async fn fetch_macro_context(http: &HttpFetcher, endpoints: &Endpoints, limit: usize) -> MacroContext {
    let (spx, vix, nq, dxy, gold) = tokio::join!(
        yahoo_or_empty(http, endpoints, "^GSPC", "5m", limit),
        yahoo_or_empty(http, endpoints, "^VIX", "5m", limit),
        yahoo_or_empty(http, endpoints, "NQ=F", "5m", limit),
        yahoo_or_empty(http, endpoints, "DX-Y.NYB", "5m", limit),
        yahoo_or_empty(http, endpoints, "GC=F", "5m", limit),
    );
    MacroContext { spx, vix, nq, dxy, gold }
}
