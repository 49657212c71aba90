use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use super::SentimentClassifier;
use crate::models::RawPrediction;

/// Offline binary classifier that scores words against a fixed lexicon.
///
/// Deterministic, so it doubles as a reproducible baseline when no hosted
/// model is reachable. A negation flips the polarity of the next scored word.
#[derive(Debug, Clone)]
pub struct LexiconClassifier {
    scores: HashMap<&'static str, f64>,
    negations: HashSet<&'static str>,
}

impl LexiconClassifier {
    pub fn new() -> Self {
        let positive = [
            ("amazing", 0.8),
            ("awesome", 0.75),
            ("best", 0.7),
            ("delicious", 0.8),
            ("excellent", 0.8),
            ("fantastic", 0.8),
            ("fast", 0.4),
            ("fresh", 0.45),
            ("good", 0.5),
            ("great", 0.7),
            ("happy", 0.6),
            ("incredible", 0.85),
            ("love", 0.7),
            ("loved", 0.7),
            ("nice", 0.45),
            ("perfect", 0.85),
            ("pleased", 0.55),
            ("recommend", 0.6),
            ("satisfied", 0.55),
            ("tasty", 0.6),
            ("wonderful", 0.8),
        ];

        let negative = [
            ("awful", -0.8),
            ("bad", -0.6),
            ("broken", -0.7),
            ("cheap", -0.3),
            ("disappointed", -0.7),
            ("disappointing", -0.7),
            ("horrible", -0.85),
            ("late", -0.4),
            ("poor", -0.6),
            ("refund", -0.5),
            ("slow", -0.4),
            ("stale", -0.6),
            ("terrible", -0.8),
            ("waste", -0.7),
            ("worse", -0.7),
            ("worst", -0.85),
        ];

        let scores = positive.into_iter().chain(negative).collect();
        let negations = ["not", "no", "never", "don't", "didn't", "isn't", "wasn't", "nor"]
            .into_iter()
            .collect();

        Self { scores, negations }
    }

    /// Summed polarity of the text, negative for unfavorable wording
    pub fn polarity(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let mut total = 0.0;
        let mut negate = false;

        for token in lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
        {
            if self.negations.contains(token) {
                negate = true;
                continue;
            }

            if let Some(score) = self.scores.get(token) {
                total += if negate { -score } else { *score };
                negate = false;
            }
        }

        total
    }

    pub fn predict(&self, text: &str) -> RawPrediction {
        let polarity = self.polarity(text);
        let confidence = 0.5 + 0.5 * polarity.abs().tanh();
        let label = if polarity < 0.0 { "NEGATIVE" } else { "POSITIVE" };
        RawPrediction::new(label, confidence)
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentClassifier for LexiconClassifier {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn classify(&self, texts: &[String]) -> Result<Vec<RawPrediction>> {
        Ok(texts.iter().map(|text| self.predict(text)).collect())
    }
}
