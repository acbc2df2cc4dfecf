//! Fear & Greed index and RSS headlines

use futures::future::join_all;
use serde_json::Value;
use tracing::warn;

use super::{num, Endpoints, HttpFetcher};
use crate::types::{AlertError, FearGreedSnapshot, Headline, Result};

pub async fn try_fear_greed(http: &HttpFetcher, endpoints: &Endpoints) -> Result<FearGreedSnapshot> {
    let payload: Value = http
        .get_json(
            "alternative_me",
            &format!("{}/fng/", endpoints.alternative_me),
            &[("limit", "1"), ("format", "json")],
        )
        .await?;
    let entry = &payload["data"][0];
    let value = num(&entry["value"])
        .ok_or_else(|| AlertError::InvalidResponse("alternative.me: missing value".to_string()))?;
    let label = entry["value_classification"].as_str().unwrap_or("Neutral");
    Ok(FearGreedSnapshot::new(value.clamp(0.0, 100.0) as u32, label))
}

pub async fn fetch_fear_greed(http: &HttpFetcher, endpoints: &Endpoints) -> FearGreedSnapshot {
    try_fear_greed(http, endpoints).await.unwrap_or_else(|e| {
        warn!("Fear & Greed fetch failed: {}", e);
        FearGreedSnapshot::unavailable()
    })
}

fn strip_cdata(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(trimmed)
        .trim()
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Titles of `<item>` elements. The channel's own title is skipped.
pub fn parse_rss_titles(xml: &str) -> Vec<String> {
    let mut titles = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<item") {
        rest = &rest[start..];
        let item_end = rest.find("</item>").unwrap_or(rest.len());
        let item = &rest[..item_end];
        if let Some(open) = item.find("<title") {
            let after = &item[open..];
            if let (Some(gt), Some(close)) = (after.find('>'), after.find("</title>")) {
                if gt < close {
                    let title = unescape(strip_cdata(&after[gt + 1..close]));
                    if !title.is_empty() {
                        titles.push(title);
                    }
                }
            }
        }
        rest = &rest[item_end..];
    }
    titles
}

fn feed_host(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Headlines across all feeds, capped at `limit`. A failed feed is skipped.
pub async fn fetch_news(http: &HttpFetcher, endpoints: &Endpoints, limit: usize) -> Vec<Headline> {
    let bodies = join_all(
        endpoints
            .rss_feeds
            .iter()
            .map(|url| async move { (url, http.get_text("rss", url, &[]).await) }),
    )
    .await;

    let mut headlines = Vec::new();
    for (url, body) in bodies {
        match body {
            Ok(body) => {
                let source = feed_host(url);
                headlines.extend(
                    parse_rss_titles(&body)
                        .into_iter()
                        .map(|title| Headline::new(&title, &source)),
                );
            }
            Err(e) => warn!(feed = %url, "RSS fetch failed: {}", e),
        }
    }
    headlines.truncate(limit);
    headlines
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss><channel>
  <title>Crypto Desk</title>
  <item><title><![CDATA[Bitcoin ETF inflows hit record]]></title><link>a</link></item>
  <item><title>Exchange hack &amp; outage</title></item>
  <item><link>no title</link></item>
</channel></rss>"#;

    #[test]
    fn test_parse_rss_titles() {
        assert_eq!(
            parse_rss_titles(FEED),
            vec!["Bitcoin ETF inflows hit record", "Exchange hack & outage"]
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_rss_titles("not xml at all").is_empty());
        assert!(parse_rss_titles("<item><title>unterminated").is_empty());
    }

    #[test]
    fn test_feed_host() {
        assert_eq!(feed_host("https://cointelegraph.com/rss"), "cointelegraph.com");
    }
}
