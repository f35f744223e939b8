// src/classifier.rs
use std::future::Future;

use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ExplorerError, Result};
use crate::http::{self, RetryPolicy};
use crate::models::{Archetype, ClassificationResult, WalletSummary};
use crate::pacing::Pacer;

const MAX_OUTPUT_TOKENS: u32 = 500;

/// Maps wallet scalars to an archetype, a 0-100 reputation score and a short narrative.
pub trait Classifier: Send + Sync {
    fn classify(&self, summary: &WalletSummary) -> impl Future<Output = Result<ClassificationResult>> + Send;
}

/// Threshold rules: Whale beats Trader beats HODLer.
pub fn rule_archetype(summary: &WalletSummary) -> Archetype {
    let volume = summary.total_volume;
    let rate = summary.tx_per_day;

    if volume > Decimal::from(8000) || rate > Decimal::from(50) {
        Archetype::Whale
    } else if (volume >= Decimal::from(1000) && volume <= Decimal::from(8000))
        || (rate >= Decimal::ONE && rate <= Decimal::from(50))
    {
        Archetype::Trader
    } else {
        Archetype::Hodler
    }
}

/// Age earns up to 40 points (3 years), steady activity 30, volume up to 30.
pub fn heuristic_score(summary: &WalletSummary) -> u8 {
    let age = Decimal::from(summary.age_days.min(1095)) * Decimal::from(40) / Decimal::from(1095);

    let activity = if summary.tx_per_day.is_zero() {
        Decimal::ZERO
    } else if summary.tx_per_day <= Decimal::from(50) {
        Decimal::from(30)
    } else {
        Decimal::from(15)
    };

    let volume = summary.total_volume.min(Decimal::from(10_000)) * Decimal::from(30) / Decimal::from(10_000);

    (age + activity + volume)
        .round()
        .to_u8()
        .unwrap_or(100)
        .min(100)
}

/// Deterministic classifier built on the threshold rules alone
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleClassifier;

impl Classifier for RuleClassifier {
    async fn classify(&self, summary: &WalletSummary) -> Result<ClassificationResult> {
        let archetype = rule_archetype(summary);
        let reputation_score = heuristic_score(summary);
        let reason = match archetype {
            Archetype::Hodler => "it moves funds rarely and mostly holds",
            Archetype::Trader => "it trades regularly with moderate amounts",
            Archetype::Whale => "it moves very large amounts or transacts at a very high rate",
        };
        Ok(ClassificationResult {
            archetype,
            reputation_score,
            narrative: format!(
                "This wallet is a {archetype} with a reputation score of {reputation_score}, since {reason}."
            ),
        })
    }
}

/// The fixed instruction template sent to the text-generation model
pub fn build_prompt(summary: &WalletSummary) -> String {
    format!(
        "You are analyzing an Ethereum wallet using the following metrics:
- Wallet age: {age} days
- Average transactions per day: {rate}
- Total ETH volume moved: {volume} ETH

Classify the wallet using the following rules:
- HODLer: Tx/Day < 1
- Trader: Volume between 1000 and 8000 ETH or Tx/Day between 1 and 50
- Whale: Volume > 8000 ETH or Tx/Day > 50

If the metrics fall near the edges of these categories, use your best judgment to decide the most appropriate label based on the overall behavior.

Assign a reputation score from 0 to 100 based on wallet age, activity, and ETH volume.

Answer with exactly this first line:
Type: <HODLer|Trader|Whale> | Score: <0-100>
Then write a concise summary (1-2 sentences) that includes:
- The wallet type
- The reputation score
- A brief explanation of why the wallet was classified that way
Use clear and human-friendly language.
- Don't use bold letters
- Don't repeat the wallet age, the average transactions per day, nor the total ETH volume moved
",
        age = summary.age_days,
        rate = summary.tx_per_day.round_dp(2),
        volume = summary.total_volume.round_dp(2),
    )
}

/// First integer following "score" in the reply, clamped to 0..=100
fn find_score(text: &str) -> Option<u8> {
    let lower = text.to_ascii_lowercase();
    let rest = &lower[lower.find("score")? + "score".len()..];
    let digits: String = rest
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let score: u32 = digits.parse().ok()?;
    Some(score.min(100) as u8)
}

/// Turn a free-form model reply into a result, falling back to the rules for missing parts.
pub fn parse_reply(text: &str, summary: &WalletSummary) -> ClassificationResult {
    let text = text.replace("**", "");
    let text = text.trim();

    let (header, body) = match text.split_once('\n') {
        Some((first, rest)) if first.trim_start().to_ascii_lowercase().starts_with("type") => {
            (Some(first), rest.trim())
        }
        _ if text.to_ascii_lowercase().starts_with("type") => (Some(text), ""),
        _ => (None, text),
    };

    let archetype = header
        .and_then(Archetype::find_in)
        .or_else(|| Archetype::find_in(body))
        .unwrap_or_else(|| {
            warn!("Classifier reply names no archetype, using threshold rules");
            rule_archetype(summary)
        });

    let reputation_score = header
        .and_then(find_score)
        .or_else(|| find_score(body))
        .unwrap_or_else(|| heuristic_score(summary));

    ClassificationResult {
        archetype,
        reputation_score,
        narrative: body.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Gemini `generateContent` classifier, temperature 0
#[derive(Debug)]
pub struct GeminiClassifier {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    pacer: Pacer,
    retry: RetryPolicy,
}

impl GeminiClassifier {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            http: http::build_client(cfg.http_timeout)?,
            base_url: cfg.gemini_url.trim_end_matches('/').to_string(),
            model: cfg.gemini_model.clone(),
            api_key: cfg.gemini_api_key.clone(),
            pacer: Pacer::new(cfg.pace),
            retry: cfg.retry,
        })
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
                "responseMimeType": "text/plain"
            }
        });

        let url = url.as_str();
        let body = &body;
        let reply: GenerateResponse = http::with_retry(self.retry, "generateContent", move || async move {
            self.pacer.wait().await;
            info!("📡 Classifier request model={}", self.model);
            let resp = self
                .http
                .post(url)
                .header("x-goog-api-key", api_key)
                .json(body)
                .send()
                .await?;
            http::read_json(resp).await
        })
        .await?;

        reply
            .text()
            .ok_or_else(|| ExplorerError::Upstream("classifier returned no text".into()))
    }
}

impl Classifier for GeminiClassifier {
    async fn classify(&self, summary: &WalletSummary) -> Result<ClassificationResult> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ExplorerError::MissingCredential("GEMINI_API_KEY"))?;

        let prompt = build_prompt(summary);
        let text = self.generate(api_key, &prompt).await.map_err(|e| match e {
            ExplorerError::Upstream(_) => e,
            other => ExplorerError::Upstream(format!("classifier: {other}")),
        })?;

        Ok(parse_reply(&text, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn summary(age_days: u64, rate: &str, volume: &str) -> WalletSummary {
        WalletSummary {
            age_days,
            tx_per_day: Decimal::from_str(rate).unwrap(),
            total_volume: Decimal::from_str(volume).unwrap(),
        }
    }

    #[test]
    fn rules_match_thresholds() {
        assert_eq!(rule_archetype(&summary(400, "0.2", "50")), Archetype::Hodler);
        assert_eq!(rule_archetype(&summary(400, "60", "50")), Archetype::Whale);
        assert_eq!(rule_archetype(&summary(400, "0.5", "9000")), Archetype::Whale);
        assert_eq!(rule_archetype(&summary(400, "0.5", "1000")), Archetype::Trader);
        assert_eq!(rule_archetype(&summary(400, "1", "10")), Archetype::Trader);
        assert_eq!(rule_archetype(&summary(400, "50", "10")), Archetype::Trader);
    }

    #[test]
    fn heuristic_score_is_bounded_and_rewards_age() {
        let young = heuristic_score(&summary(10, "0.5", "10"));
        let old = heuristic_score(&summary(1000, "0.5", "10"));
        assert!(old > young);
        assert!(heuristic_score(&summary(5000, "10", "99999")) <= 100);
        assert_eq!(heuristic_score(&summary(0, "0", "0")), 0);
    }

    #[tokio::test]
    async fn rule_classifier_labels_hodler_and_whale() {
        let hodler = RuleClassifier.classify(&summary(400, "0.2", "50")).await.unwrap();
        assert_eq!(hodler.archetype, Archetype::Hodler);
        let whale = RuleClassifier.classify(&summary(400, "60", "50")).await.unwrap();
        assert_eq!(whale.archetype, Archetype::Whale);
        assert!(!whale.narrative.contains("400"));
    }

    #[test]
    fn prompt_carries_metrics_and_rules() {
        let prompt = build_prompt(&summary(400, "0.23456", "50"));
        assert!(prompt.contains("Wallet age: 400 days"));
        assert!(prompt.contains("Average transactions per day: 0.23"));
        assert!(prompt.contains("Whale: Volume > 8000 ETH or Tx/Day > 50"));
        assert!(prompt.contains("Type: <HODLer|Trader|Whale> | Score: <0-100>"));
    }

    #[test]
    fn parses_structured_reply() {
        let reply = "Type: Trader | Score: 72\nThis wallet is a **Trader** with a reputation score of 72 thanks to steady activity.";
        let out = parse_reply(reply, &summary(400, "0.2", "50"));
        assert_eq!(out.archetype, Archetype::Trader);
        assert_eq!(out.reputation_score, 72);
        assert_eq!(
            out.narrative,
            "This wallet is a Trader with a reputation score of 72 thanks to steady activity."
        );
    }

    #[test]
    fn parses_free_form_reply() {
        let reply = "This wallet behaves like a Whale; reputation score: 130 given its huge transfers.";
        let out = parse_reply(reply, &summary(400, "0.2", "50"));
        assert_eq!(out.archetype, Archetype::Whale);
        assert_eq!(out.reputation_score, 100);
        assert_eq!(out.narrative, reply);
    }

    #[test]
    fn falls_back_to_rules_when_reply_is_vague() {
        let out = parse_reply("Hard to say.", &summary(400, "60", "50"));
        assert_eq!(out.archetype, Archetype::Whale);
        assert_eq!(out.reputation_score, heuristic_score(&summary(400, "60", "50")));
    }

    #[test]
    fn empty_candidates_have_no_text() {
        let reply: GenerateResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(reply.text().is_none());
        let reply: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Type: Whale | Score: 40\nBig mover." }] } }]
        }))
        .unwrap();
        assert_eq!(reply.text().as_deref(), Some("Type: Whale | Score: 40\nBig mover."));
    }

    #[tokio::test]
    async fn missing_credential_fails_fast() {
        let classifier = GeminiClassifier::new(&Config::default()).unwrap();
        let err = classifier.classify(&summary(1, "1", "1")).await.unwrap_err();
        assert!(matches!(err, ExplorerError::MissingCredential(_)));
    }
}
