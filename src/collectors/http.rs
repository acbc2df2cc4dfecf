//! Shared HTTP fetcher with budget admission and bounded retry

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::budget::CallBudget;
use crate::config::RetryPolicy;
use crate::types::{AlertError, Result};

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/115.0",
];

/// Referer/Origin some providers expect from browser traffic
fn referer_for(host: &str) -> Option<(&'static str, Option<&'static str>)> {
    if host.ends_with("bybit.com") {
        Some(("https://www.bybit.com/", Some("https://www.bybit.com")))
    } else if host.ends_with("okx.com") {
        Some(("https://www.okx.com/", None))
    } else if host.ends_with("yahoo.com") {
        Some(("https://finance.yahoo.com/", None))
    } else {
        None
    }
}

fn retriable(status: StatusCode) -> bool {
    status.is_server_error()
}

pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
    budget: Arc<dyn CallBudget>,
}

impl HttpFetcher {
    pub fn new(policy: RetryPolicy, budget: Arc<dyn CallBudget>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs_f64(policy.timeout_seconds))
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self { client, policy, budget })
    }

    pub fn budget(&self) -> &Arc<dyn CallBudget> {
        &self.budget
    }

    fn headers(&self, url: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let agent = USER_AGENTS[rand::thread_rng().gen_range(0..USER_AGENTS.len())];
        headers.insert(USER_AGENT, HeaderValue::from_static(agent));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let host = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        if let Some((referer, origin)) = referer_for(&host) {
            headers.insert(REFERER, HeaderValue::from_static(referer));
            if let Some(origin) = origin {
                headers.insert("Origin", HeaderValue::from_static(origin));
            }
        }
        headers
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.policy.backoff_seconds * 2f64.powi(attempt as i32);
        let jitter = if self.policy.jitter_seconds > 0.0 {
            rand::thread_rng().gen_range(0.0..self.policy.jitter_seconds)
        } else {
            0.0
        };
        Duration::from_secs_f64((base + jitter).max(0.0))
    }

    fn retry_after(response: &Response) -> Option<Duration> {
        let secs = response
            .headers()
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<f64>()
            .ok()?;
        Some(Duration::from_secs_f64(secs.max(0.0) + 1.0))
    }

    /// GET with retry on transport errors and 5xx. Other failures return at once.
    async fn send(&self, source: &str, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        if !self.budget.try_acquire(source).await {
            return Err(AlertError::BudgetExhausted(source.to_string()));
        }

        let attempts = self.policy.attempts.max(1);
        let mut attempt = 0;
        loop {
            let last = attempt + 1 >= attempts;
            let result = self
                .client
                .get(url)
                .query(query)
                .headers(self.headers(url))
                .send()
                .await;

            let wait = match result {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if !retriable(status) || last {
                        let body = response.text().await.unwrap_or_default();
                        return Err(AlertError::Status {
                            status: status.as_u16(),
                            body: body.chars().take(200).collect(),
                        });
                    }
                    let wait = Self::retry_after(&response).unwrap_or_else(|| self.backoff(attempt));
                    warn!(source, %status, attempt, "Retriable status, backing off {:?}", wait);
                    wait
                }
                Err(e) => {
                    if last {
                        return Err(AlertError::Http(e));
                    }
                    let wait = self.backoff(attempt);
                    warn!(source, attempt, "Request failed, backing off {:?}: {}", wait, e);
                    wait
                }
            };

            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, source: &str, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self.send(source, url, query).await?;
        let body = response.text().await?;
        debug!(source, url, bytes = body.len(), "Fetched");
        serde_json::from_str(&body).map_err(|e| AlertError::InvalidResponse(format!("{}: {}", url, e)))
    }

    pub async fn get_text(&self, source: &str, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let response = self.send(source, url, query).await?;
        Ok(response.text().await?)
    }
}
