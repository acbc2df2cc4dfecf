//! Scoring every (symbol, timeframe) from one collected snapshot

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use btc_alerts::collectors::{BudgetManager, Endpoints, HttpFetcher, SpxCandles};
use btc_alerts::config::{default_budgets, RetryPolicy, Settings};
use btc_alerts::notifier::ConsoleNotifier;
use btc_alerts::runner::SPX_PROXY;
use btc_alerts::types::{
    DerivativesSnapshot, FearGreedSnapshot, FlowSnapshot, Headline, MacroContext, OrderBookSnapshot, PriceSnapshot,
};
use btc_alerts::{AlertEngine, AlertGate, AlertJournal, AlertRunner, AlertScore, JsonStateFile, MarketData};
use common::{trend, WEDNESDAY_US};

fn market(news: Vec<Headline>) -> MarketData {
    let btc = trend(120, 60_000.0, 25.0, WEDNESDAY_US);
    let spx = trend(120, 4_700.0, 1.5, WEDNESDAY_US);
    let spx_series = |candles: &Vec<_>| SpxCandles {
        candles: candles.clone(),
        mode: "direct",
    };

    MarketData {
        price: PriceSnapshot::new(btc[119].close, WEDNESDAY_US, "kraken"),
        btc: ["5m", "15m", "1h"].iter().map(|tf| (tf.to_string(), btc.clone())).collect(),
        spx: ["5m", "15m", "1h"].iter().map(|tf| (tf.to_string(), spx_series(&spx))).collect::<BTreeMap<_, _>>(),
        macro_ctx: MacroContext::default(),
        fear_greed: FearGreedSnapshot::new(50, "Neutral"),
        news,
        derivatives: DerivativesSnapshot::unavailable("test"),
        flows: FlowSnapshot::unavailable("test"),
        order_book: OrderBookSnapshot::default(),
    }
}

async fn score(dir: &tempfile::TempDir, data: &MarketData) -> Vec<AlertScore> {
    let policy = RetryPolicy::default();
    let http = HttpFetcher::new(policy, Arc::new(BudgetManager::in_memory(default_budgets()))).unwrap();
    let gate = AlertGate::open(
        JsonStateFile::new(dir.path().join("state.json")),
        Settings::default().cooldowns,
    )
    .await;
    let runner = AlertRunner::new(
        AlertEngine::new(Settings::default()),
        http,
        Endpoints::default(),
        Box::new(ConsoleNotifier),
        gate,
        AlertJournal::new(dir.path().join("alerts.jsonl")),
    );
    runner.score_all(data, WEDNESDAY_US + 60)
}

#[tokio::test]
async fn test_crypto_headlines_only_move_btc() {
    let dir = tempfile::tempdir().unwrap();
    let quiet = score(&dir, &market(Vec::new())).await;
    let noisy = score(
        &dir,
        &market(vec![
            Headline::new("Major exchange hack drains hot wallets", "test"),
            Headline::new("Senate debates bitcoin reserve and ETF rules", "test"),
        ]),
    )
    .await;

    assert_eq!(quiet.len(), 6);
    assert_eq!(noisy.len(), 6);

    for (before, after) in quiet.iter().zip(&noisy) {
        assert_eq!(before.symbol, after.symbol);
        assert_eq!(before.timeframe, after.timeframe);
        if after.symbol == SPX_PROXY {
            assert_eq!(before.confidence, after.confidence, "{} {}", after.symbol, after.timeframe);
            assert!(!after.trace.has_code("NEWS_HACK"));
            assert_eq!(before.intelligence, after.intelligence);
        } else {
            assert!(after.trace.has_code("NEWS_HACK"));
        }
    }
}
