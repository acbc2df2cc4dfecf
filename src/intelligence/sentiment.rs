//! Headline sentiment
//!
//! A small lexicon scorer: keyword stems plus a weighted crypto lexicon,
//! normalized to a compound score in (-1, 1).

use serde_json::json;

use crate::config::SentimentConfig;
use crate::types::Headline;

use super::{IntelligenceLayer, LayerContext, LayerKind, LayerOutput};

/// Normalization constant for the compound score
const ALPHA: f64 = 15.0;

pub struct LexiconScorer {
    cfg: SentimentConfig,
}

impl LexiconScorer {
    pub fn new(cfg: SentimentConfig) -> Self {
        Self { cfg }
    }

    /// A stem of 4+ chars matches as a prefix, shorter ones match exactly
    fn stem_matches(token: &str, stem: &str) -> bool {
        if stem.len() >= 4 {
            token.starts_with(stem)
        } else {
            token == stem
        }
    }

    /// Raw valence sum for `text`
    pub fn valence(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut sum = 0.0;
        for entry in &self.cfg.lexicon {
            let phrase = entry.keyword.to_lowercase();
            if phrase.contains(' ') || phrase.contains('-') {
                sum += entry.weight * lower.matches(phrase.as_str()).count() as f64;
            }
        }

        for token in tokens {
            let lexicon_hit = self
                .cfg
                .lexicon
                .iter()
                .find(|e| e.keyword.eq_ignore_ascii_case(token));
            if let Some(entry) = lexicon_hit {
                sum += entry.weight;
            } else if self.cfg.positive_keywords.iter().any(|s| Self::stem_matches(token, s)) {
                sum += self.cfg.keyword_valence;
            } else if self.cfg.negative_keywords.iter().any(|s| Self::stem_matches(token, s)) {
                sum -= self.cfg.keyword_valence;
            }
        }
        sum
    }

    pub fn compound(&self, text: &str) -> f64 {
        let s = self.valence(text);
        s / (s * s + ALPHA).sqrt()
    }
}

/// Aggregate reading over a batch of headlines
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentSummary {
    pub composite: f64,
    pub bullish_pct: u32,
    pub bearish_pct: u32,
    pub count: usize,
    pub fallback: bool,
}

pub struct SentimentLayer {
    scorer: LexiconScorer,
    band: f64,
    bull_points: f64,
    bear_points: f64,
}

impl SentimentLayer {
    pub fn new(cfg: SentimentConfig) -> Self {
        Self {
            band: cfg.neutral_band,
            bull_points: cfg.positive_news_points,
            bear_points: cfg.negative_news_points,
            scorer: LexiconScorer::new(cfg),
        }
    }

    pub fn summarize(&self, news: &[Headline]) -> SentimentSummary {
        if news.is_empty() {
            return SentimentSummary {
                composite: 0.0,
                bullish_pct: 0,
                bearish_pct: 0,
                count: 0,
                fallback: true,
            };
        }

        let scores: Vec<f64> = news.iter().map(|h| self.scorer.compound(&h.title)).collect();
        let bullish = scores.iter().filter(|s| **s >= self.band).count();
        let bearish = scores.iter().filter(|s| **s <= -self.band).count();
        let composite = if bullish + bearish > 0 {
            scores.iter().sum::<f64>() / scores.len() as f64
        } else {
            0.0
        };

        SentimentSummary {
            composite: (composite * 1000.0).round() / 1000.0,
            bullish_pct: (bullish * 100 / news.len()) as u32,
            bearish_pct: (bearish * 100 / news.len()) as u32,
            count: news.len(),
            fallback: false,
        }
    }
}

impl IntelligenceLayer for SentimentLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Sentiment
    }

    fn evaluate(&self, ctx: &LayerContext<'_>) -> Option<LayerOutput> {
        let summary = self.summarize(ctx.news);

        let (points, codes) = if summary.composite >= self.band {
            (self.bull_points, vec!["NEWS_SENTIMENT_BULL".to_string()])
        } else if summary.composite <= -self.band {
            (-self.bear_points, vec!["NEWS_SENTIMENT_BEAR".to_string()])
        } else {
            (0.0, Vec::new())
        };

        Some(LayerOutput {
            points,
            codes,
            context: json!({
                "composite": summary.composite,
                "bullish_pct": summary.bullish_pct,
                "bearish_pct": summary.bearish_pct,
                "count": summary.count,
                "fallback": summary.fallback,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> SentimentLayer {
        SentimentLayer::new(SentimentConfig::default())
    }

    #[test]
    fn test_compound_signs() {
        let scorer = LexiconScorer::new(SentimentConfig::default());
        assert!(scorer.compound("Bitcoin ETF adoption surges to record") > 0.05);
        assert!(scorer.compound("Exchange hack triggers crash") < -0.05);
        assert_eq!(scorer.compound("Quarterly report published"), 0.0);
    }

    #[test]
    fn test_short_stems_match_exactly() {
        let scorer = LexiconScorer::new(SentimentConfig::default());
        // "up" must not match "update"
        assert_eq!(scorer.valence("software update"), 0.0);
        assert_eq!(scorer.valence("prices up"), 1.0);
    }

    #[test]
    fn test_phrases_counted() {
        let scorer = LexiconScorer::new(SentimentConfig::default());
        assert!((scorer.valence("new all-time high") - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_summary_and_points() {
        let news = vec![
            Headline::new("Bitcoin rally extends as adoption grows", "rss"),
            Headline::new("Analysts see strong inflows", "rss"),
        ];
        let summary = layer().summarize(&news);
        assert!(summary.composite > 0.05);
        assert_eq!(summary.bullish_pct, 100);

        let output = layer().summarize(&[]);
        assert!(output.fallback);
    }
}
