//! Collectors, retry policy and delivery against a mock HTTP server

use std::collections::BTreeMap;
use std::sync::Arc;

use btc_alerts::collectors::{self, BudgetManager, Endpoints, HttpFetcher};
use btc_alerts::config::{default_budgets, BudgetLimit, RetryPolicy, Settings};
use btc_alerts::notifier::{ConsoleNotifier, Notifier, TelegramNotifier};
use btc_alerts::types::AlertError;
use btc_alerts::{AlertEngine, AlertGate, AlertJournal, AlertRunner, JsonStateFile};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        attempts: 4,
        backoff_seconds: 0.0,
        jitter_seconds: 0.0,
        timeout_seconds: 5.0,
    }
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(fast_policy(), Arc::new(BudgetManager::in_memory(default_budgets()))).unwrap()
}

#[tokio::test]
async fn test_client_error_requested_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_string("nope"))
        .expect(1)
        .mount(&server)
        .await;

    let result: Result<Value, _> = fetcher()
        .get_json("kraken", &format!("{}/forbidden", server.uri()), &[])
        .await;
    match result {
        Err(AlertError::Status { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, "nope");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limit_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let result: Result<Value, _> = fetcher()
        .get_json("kraken", &format!("{}/limited", server.uri()), &[])
        .await;
    assert!(matches!(result, Err(AlertError::Status { status: 429, .. })));
}

#[tokio::test]
async fn test_server_error_then_success_takes_two_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let value: Value = fetcher()
        .get_json("kraken", &format!("{}/flaky", server.uri()), &[])
        .await
        .unwrap();
    assert_eq!(value["ok"], true);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_persistent_server_error_exhausts_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let result: Result<Value, _> = fetcher()
        .get_json("kraken", &format!("{}/down", server.uri()), &[])
        .await;
    assert!(matches!(result, Err(AlertError::Status { status: 503, .. })));
}

#[tokio::test]
async fn test_budget_blocks_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let limits = BTreeMap::from([(
        "kraken".to_string(),
        BudgetLimit {
            max_calls: 1,
            window_seconds: 60.0,
        },
    )]);
    let http = HttpFetcher::new(fast_policy(), Arc::new(BudgetManager::in_memory(limits))).unwrap();
    let url = format!("{}/ok", server.uri());

    let first: Result<Value, _> = http.get_json("kraken", &url, &[]).await;
    assert!(first.is_ok());
    let second: Result<Value, _> = http.get_json("kraken", &url, &[]).await;
    assert!(matches!(second, Err(AlertError::BudgetExhausted(source)) if source == "kraken"));
}

#[tokio::test]
async fn test_price_falls_back_to_coingecko() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bitcoin": {"usd": 64_250.5}})))
        .mount(&server)
        .await;

    let endpoints = Endpoints::single_host(&server.uri());
    let snapshot = collectors::fetch_btc_price(&fetcher(), &endpoints, 1_700_000_000).await;
    assert!(snapshot.healthy);
    assert_eq!(snapshot.source, "coingecko");
    assert_eq!(snapshot.price, 64_250.5);
}

#[tokio::test]
async fn test_kraken_candles_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/0/public/OHLC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": [],
            "result": {
                "XXBTZUSD": [
                    [1700000000, "100", "101", "99", "100.5", "100.1", "3.5", 10],
                    [1700000300, "100.5", "102", "100", "101.5", "101.0", "4.5", 12]
                ],
                "last": 1700000300
            }
        })))
        .mount(&server)
        .await;

    let endpoints = Endpoints::single_host(&server.uri());
    let candles = collectors::fetch_btc_candles(&fetcher(), &endpoints, "5m", 120).await;
    assert_eq!(candles.len(), 2);
    assert_eq!(candles[1].close, 101.5);
    assert_eq!(candles[1].volume, 4.5);
}

#[tokio::test]
async fn test_spx_proxy_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/SPY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {"result": [{
                "timestamp": [1700000000, 1700000300],
                "indicators": {"quote": [{
                    "open": [450.0, 451.0],
                    "high": [452.0, 452.5],
                    "low": [449.0, 450.5],
                    "close": [451.0, 452.0],
                    "volume": [1000, 1200]
                }]}
            }]}
        })))
        .mount(&server)
        .await;

    let endpoints = Endpoints::single_host(&server.uri());
    let spx = collectors::fetch_spx_candles(&fetcher(), &endpoints, "5m", 120).await;
    assert_eq!(spx.mode, "proxy");
    assert_eq!(spx.candles.len(), 2);
}

#[tokio::test]
async fn test_binance_derivatives() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/premiumIndex"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "markPrice": "60060.0",
            "indexPrice": "60000.0",
            "lastFundingRate": "0.0001"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/futures/data/openInterestHist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"sumOpenInterest": "1000"},
            {"sumOpenInterest": "1020"}
        ])))
        .mount(&server)
        .await;

    let endpoints = Endpoints::single_host(&server.uri());
    let snapshot = collectors::fetch_derivatives(&fetcher(), &endpoints).await;
    assert!(snapshot.healthy);
    assert_eq!(snapshot.source, "binance");
    assert!((snapshot.basis_pct - 0.1).abs() < 1e-9);
    assert!((snapshot.oi_change_pct - 2.0).abs() < 1e-9);
    assert_eq!(snapshot.funding_rate, 0.0001);
}

#[tokio::test]
async fn test_flows_and_fear_greed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/futures/data/takerlongshortRatio"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"buySellRatio": "1.5"}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/futures/data/globalLongShortAccountRatio"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"longShortRatio": "1.2"}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fng/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"value": "21", "value_classification": "Extreme Fear"}]
        })))
        .mount(&server)
        .await;

    let http = fetcher();
    let endpoints = Endpoints::single_host(&server.uri());

    let flows = collectors::fetch_flows(&http, &endpoints).await;
    assert!(flows.healthy);
    assert!((flows.crowding_score - 8.0).abs() < 1e-9);

    let fear_greed = collectors::fetch_fear_greed(&http, &endpoints).await;
    assert!(fear_greed.healthy);
    assert_eq!(fear_greed.value, 21);
    assert_eq!(fear_greed.label, "Extreme Fear");
}

#[tokio::test]
async fn test_news_skips_failed_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<rss><channel><title>Desk</title><item><title>BTC rallies</title></item>\
             <item><title>Miners capitulate</title></item></channel></rss>",
        ))
        .mount(&server)
        .await;

    let endpoints = Endpoints::single_host(&server.uri());
    let news = collectors::fetch_news(&fetcher(), &endpoints, 20).await;
    let titles: Vec<&str> = news.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles, vec!["BTC rallies", "Miners capitulate"]);
    assert_eq!(news[0].source, "127.0.0.1");
}

#[tokio::test]
async fn test_everything_down_yields_unhealthy_snapshots() {
    let server = MockServer::start().await;
    let endpoints = Endpoints::single_host(&server.uri());
    let http = fetcher();

    assert!(!collectors::fetch_btc_price(&http, &endpoints, 0).await.healthy);
    assert!(!collectors::fetch_derivatives(&http, &endpoints).await.healthy);
    assert!(!collectors::fetch_order_book(&http, &endpoints, 0).await.healthy);
    assert_eq!(collectors::fetch_spx_candles(&http, &endpoints, "1h", 120).await.mode, "none");
}

#[tokio::test]
async fn test_telegram_dedups_repeated_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bottest-token/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_api_base(&server.uri(), "test-token".to_string(), "42".to_string()).unwrap();
    notifier.send("*BTC 5m WATCH (B)*").await.unwrap();
    notifier.send("*BTC 5m WATCH (B)*").await.unwrap();
    notifier.send("*BTC 15m TRADE (A+)*").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["chat_id"], "42");
    assert_eq!(body["parse_mode"], "Markdown");
}

#[tokio::test]
async fn test_telegram_failure_does_not_mark_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let notifier = TelegramNotifier::with_api_base(&server.uri(), "t".to_string(), "1".to_string()).unwrap();
    assert!(notifier.send("same").await.is_err());
    assert!(notifier.send("same").await.is_err());
}

#[tokio::test]
async fn test_cycle_with_all_providers_down_sends_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let mut settings = Settings::default();
    settings.http_retry = fast_policy();
    let gate = AlertGate::open(JsonStateFile::new(dir.path().join("state.json")), settings.cooldowns).await;
    let journal = AlertJournal::new(dir.path().join("alerts.jsonl"));
    let mut runner = AlertRunner::new(
        AlertEngine::new(settings),
        fetcher(),
        Endpoints::single_host(&server.uri()),
        Box::new(ConsoleNotifier),
        gate,
        journal,
    );

    let report = runner.run_cycle().await.unwrap();
    assert_eq!(report.scored, 6);
    assert_eq!(report.sent, 0);
    assert_eq!(report.resolved, 0);
    assert!(!dir.path().join("alerts.jsonl").exists());
}
