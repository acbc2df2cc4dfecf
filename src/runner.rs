//! Decision cycle and the wall-clock aligned loop

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::collectors::{self, Endpoints, HttpFetcher, SpxCandles};
use crate::config::{Settings, TIMEFRAMES};
use crate::engine::{AlertEngine, AlertScore, ScoreInput, BTC};
use crate::format::{format_alert, ProviderContext};
use crate::journal::{AlertJournal, AlertRecord};
use crate::notifier::Notifier;
use crate::state::{AlertGate, StateBackend};
use crate::types::{
    Candle, DerivativesSnapshot, FearGreedSnapshot, FlowSnapshot, Headline, MacroContext, OrderBookSnapshot,
    PriceSnapshot,
};

pub const SPX_PROXY: &str = "SPX_PROXY";

/// Everything collected for one cycle
#[derive(Debug, Clone)]
pub struct MarketData {
    pub price: PriceSnapshot,
    pub btc: BTreeMap<String, Vec<Candle>>,
    pub spx: BTreeMap<String, SpxCandles>,
    pub macro_ctx: MacroContext,
    pub fear_greed: FearGreedSnapshot,
    pub news: Vec<Headline>,
    pub derivatives: DerivativesSnapshot,
    pub flows: FlowSnapshot,
    pub order_book: OrderBookSnapshot,
}

impl MarketData {
    fn btc_candles(&self, timeframe: &str) -> &[Candle] {
        self.btc.get(timeframe).map(Vec::as_slice).unwrap_or(&[])
    }

    fn spx_candles(&self, timeframe: &str) -> &[Candle] {
        self.spx.get(timeframe).map(|s| s.candles.as_slice()).unwrap_or(&[])
    }

    fn spx_mode(&self) -> &'static str {
        self.spx.get("5m").map(|s| s.mode).unwrap_or("none")
    }

    fn spx_price(&self, now: i64) -> PriceSnapshot {
        match self.spx_candles("5m").last() {
            Some(c) => PriceSnapshot::new(c.close, now, self.spx_mode()),
            None => PriceSnapshot::unavailable(now),
        }
    }

    fn providers(&self) -> ProviderContext {
        ProviderContext {
            price: self.price.source.clone(),
            derivatives: self.derivatives.source.clone(),
            flows: self.flows.source.clone(),
            spx_mode: self.spx_mode().to_string(),
        }
    }
}

/// Outcome of one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub scored: usize,
    pub sent: usize,
    pub resolved: usize,
}

async fn gated<F: Future>(workers: &Semaphore, fut: F) -> F::Output {
    let _permit = workers.acquire().await.ok();
    fut.await
}

pub struct AlertRunner<B: StateBackend> {
    engine: AlertEngine,
    http: HttpFetcher,
    endpoints: Endpoints,
    notifier: Box<dyn Notifier>,
    gate: AlertGate<B>,
    journal: AlertJournal,
    workers: Arc<Semaphore>,
}

impl<B: StateBackend> AlertRunner<B> {
    pub fn new(
        engine: AlertEngine,
        http: HttpFetcher,
        endpoints: Endpoints,
        notifier: Box<dyn Notifier>,
        gate: AlertGate<B>,
        journal: AlertJournal,
    ) -> Self {
        let workers = Arc::new(Semaphore::new(engine.settings().runtime.workers.max(1)));
        Self {
            engine,
            http,
            endpoints,
            notifier,
            gate,
            journal,
            workers,
        }
    }

    fn settings(&self) -> &Settings {
        self.engine.settings()
    }

    /// Run every collector concurrently behind the worker semaphore
    pub async fn collect(&self, now: i64) -> MarketData {
        let http = &self.http;
        let ep = &self.endpoints;
        let w = self.workers.as_ref();
        let limit = self.settings().runtime.candle_limit;
        let news_limit = self.settings().runtime.news_limit;

        let (price, btc_5m, btc_15m, btc_1h, spx_5m, spx_15m, spx_1h) = tokio::join!(
            gated(w, collectors::fetch_btc_price(http, ep, now)),
            gated(w, collectors::fetch_btc_candles(http, ep, "5m", limit)),
            gated(w, collectors::fetch_btc_candles(http, ep, "15m", limit)),
            gated(w, collectors::fetch_btc_candles(http, ep, "1h", limit)),
            gated(w, collectors::fetch_spx_candles(http, ep, "5m", limit)),
            gated(w, collectors::fetch_spx_candles(http, ep, "15m", limit)),
            gated(w, collectors::fetch_spx_candles(http, ep, "1h", limit)),
        );
        let (macro_ctx, fear_greed, news, derivatives, flows, order_book) = tokio::join!(
            gated(w, collectors::fetch_macro_context(http, ep, limit)),
            gated(w, collectors::fetch_fear_greed(http, ep)),
            gated(w, collectors::fetch_news(http, ep, news_limit)),
            gated(w, collectors::fetch_derivatives(http, ep)),
            gated(w, collectors::fetch_flows(http, ep)),
            gated(w, collectors::fetch_order_book(http, ep, now)),
        );

        let btc = BTreeMap::from([
            ("5m".to_string(), btc_5m),
            ("15m".to_string(), btc_15m),
            ("1h".to_string(), btc_1h),
        ]);
        let spx = BTreeMap::from([
            ("5m".to_string(), spx_5m),
            ("15m".to_string(), spx_15m),
            ("1h".to_string(), spx_1h),
        ]);

        info!(
            price = price.healthy,
            price_source = %price.source,
            btc_bars = btc.values().map(Vec::len).sum::<usize>(),
            spx_mode = spx.get("5m").map(|s| s.mode).unwrap_or("none"),
            fear_greed = fear_greed.healthy,
            derivatives = derivatives.healthy,
            flows = flows.healthy,
            order_book = order_book.healthy,
            headlines = news.len(),
            "Collection complete"
        );

        MarketData {
            price,
            btc,
            spx,
            macro_ctx,
            fear_greed,
            news,
            derivatives,
            flows,
            order_book,
        }
    }

    /// Score every (symbol, timeframe) on already collected data
    pub fn score_all(&self, data: &MarketData, now: i64) -> Vec<AlertScore> {
        let spx_price = data.spx_price(now);
        let mut scores = Vec::with_capacity(TIMEFRAMES.len() * 2);

        for symbol in [BTC, SPX_PROXY] {
            for timeframe in TIMEFRAMES {
                let is_btc = symbol == BTC;
                let (price, candles, c15, c1h) = if is_btc {
                    (
                        &data.price,
                        data.btc_candles(timeframe),
                        data.btc_candles("15m"),
                        data.btc_candles("1h"),
                    )
                } else {
                    (
                        &spx_price,
                        data.spx_candles(timeframe),
                        data.spx_candles("15m"),
                        data.spx_candles("1h"),
                    )
                };
                let input = ScoreInput {
                    symbol,
                    timeframe,
                    price,
                    candles,
                    candles_15m: c15,
                    candles_1h: c1h,
                    fear_greed: &data.fear_greed,
                    news: if is_btc { data.news.as_slice() } else { &[] },
                    derivatives: &data.derivatives,
                    flows: &data.flows,
                    macro_ctx: &data.macro_ctx,
                    order_book: is_btc.then_some(&data.order_book),
                    now,
                };
                let score = self.engine.compute_score(&input);
                info!(
                    symbol,
                    timeframe,
                    confidence = score.confidence,
                    tier = score.tier.as_str(),
                    action = score.action.as_str(),
                    direction = score.direction.as_str(),
                    quality = %score.quality,
                    "Scored"
                );
                scores.push(score);
            }
        }
        scores
    }

    /// Gate, notify, persist and journal one score. Returns whether it was sent.
    async fn dispatch(&mut self, score: &AlertScore, providers: &ProviderContext, now: i64) -> bool {
        let price = score.entry_price;
        if !self.gate.should_send(score, price, now) {
            info!(
                symbol = %score.symbol,
                timeframe = %score.timeframe,
                action = score.action.as_str(),
                codes = ?score.reason_codes,
                blockers = ?score.blockers,
                trace = ?score.trace.entries(),
                "Alert filtered"
            );
            return false;
        }

        match format_alert(score, providers) {
            Ok(text) => {
                if let Err(e) = self.notifier.send(&text).await {
                    error!(symbol = %score.symbol, timeframe = %score.timeframe, "Notifier failed: {}", e);
                }
            }
            Err(e) => error!("Failed to render alert: {}", e),
        }

        if let Err(e) = self.gate.record_sent(score, price, now).await {
            error!("Failed to persist alert state: {}", e);
        }
        let record = AlertRecord::from_score(score, Utc::now());
        if let Err(e) = self.journal.append(&record).await {
            error!("Failed to append alert journal: {}", e);
        }
        true
    }

    /// One full cycle: collect, score, dispatch, resolve
    pub async fn run_cycle(&mut self) -> anyhow::Result<CycleReport> {
        let now = Utc::now().timestamp();
        let data = self.collect(now).await;
        let scores = self.score_all(&data, now);
        let providers = data.providers();

        let mut report = CycleReport {
            scored: scores.len(),
            ..CycleReport::default()
        };
        for score in &scores {
            if self.dispatch(score, &providers, now).await {
                report.sent += 1;
            }
        }

        let mut prices = HashMap::new();
        if data.price.healthy {
            prices.insert(BTC.to_string(), data.price.price);
        }
        let spx = data.spx_price(now);
        if spx.healthy {
            prices.insert(SPX_PROXY.to_string(), spx.price);
        }
        report.resolved = self
            .journal
            .resolve_pending(&prices, Utc::now())
            .await
            .context("resolving alert outcomes")?;

        info!(scored = report.scored, sent = report.sent, resolved = report.resolved, "Cycle complete");
        Ok(report)
    }

    /// Cycle on every wall-clock multiple of the interval until Ctrl-C
    pub async fn run_forever(mut self) -> anyhow::Result<()> {
        let interval = self.settings().runtime.interval_seconds.max(1);
        info!(interval, "Alert loop starting");

        loop {
            if let Err(e) = self.run_cycle().await {
                warn!("Cycle failed: {:#}", e);
            }

            let now = Utc::now().timestamp().max(0) as u64;
            let wait = interval - now % interval;
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(wait)) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }
        Ok(())
    }
}
