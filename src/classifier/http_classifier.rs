use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;
use reqwest::Client;

use super::SentimentClassifier;
use crate::config::ClassifierConfig;
use crate::models::RawPrediction;

/// Classifier backed by a hosted model behind an inference endpoint
/// (Hugging Face Inference API request/response shape).
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HttpClassifier {
    pub fn new(endpoint: &str, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(anyhow!("Invalid classifier endpoint: {:?}", endpoint));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build classifier HTTP client")?;

        Ok(HttpClassifier {
            client,
            endpoint: endpoint.to_string(),
            api_token,
        })
    }

    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        Self::new(
            &config.endpoint,
            config.api_token.clone(),
            Duration::from_secs(config.timeout_seconds.max(1)),
        )
    }
}

#[async_trait]
impl SentimentClassifier for HttpClassifier {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn classify(&self, texts: &[String]) -> Result<Vec<RawPrediction>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&json!({ "inputs": texts }));

        if let Some(token) = &self.api_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Classifier request to {} failed", self.endpoint))?;

        if !response.status().is_success() {
            return Err(anyhow!("Classifier HTTP error: {}", response.status()));
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to decode classifier response")?;
        let predictions = parse_predictions(&body)?;
        debug!(
            "Classifier returned {} predictions for {} texts",
            predictions.len(),
            texts.len()
        );

        Ok(predictions)
    }
}

/// Extract one prediction per input from an inference response.
///
/// Accepts a flat `[{label, score}, ...]` list, or a nested list with one
/// inner list of candidate labels per input (highest score wins).
pub fn parse_predictions(body: &Value) -> Result<Vec<RawPrediction>> {
    if let Some(error) = body.get("error").and_then(|e| e.as_str()) {
        return Err(anyhow!("Classifier error: {}", error));
    }

    let items = body
        .as_array()
        .ok_or_else(|| anyhow!("Unexpected classifier response: {}", body))?;

    items
        .iter()
        .map(|item| match item {
            Value::Array(candidates) => candidates
                .iter()
                .filter_map(parse_prediction)
                .max_by(|a, b| a.score.total_cmp(&b.score))
                .ok_or_else(|| anyhow!("Empty candidate list in classifier response")),
            other => parse_prediction(other)
                .ok_or_else(|| anyhow!("Malformed prediction: {}", other)),
        })
        .collect()
}

fn parse_prediction(item: &Value) -> Option<RawPrediction> {
    let label = item.get("label")?.as_str()?;
    let score = item.get("score")?.as_f64()?;
    Some(RawPrediction::new(label, score))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_predictions() {
        let body = json!([
            {"label": "POSITIVE", "score": 0.99},
            {"label": "NEGATIVE", "score": 0.95}
        ]);

        let predictions = parse_predictions(&body).unwrap();
        assert_eq!(
            predictions,
            vec![
                RawPrediction::new("POSITIVE", 0.99),
                RawPrediction::new("NEGATIVE", 0.95)
            ]
        );
    }

    #[test]
    fn test_parse_nested_predictions_picks_top_label() {
        let body = json!([
            [{"label": "NEGATIVE", "score": 0.02}, {"label": "POSITIVE", "score": 0.98}],
            [{"label": "NEGATIVE", "score": 0.91}, {"label": "POSITIVE", "score": 0.09}]
        ]);

        let predictions = parse_predictions(&body).unwrap();
        assert_eq!(predictions[0], RawPrediction::new("POSITIVE", 0.98));
        assert_eq!(predictions[1], RawPrediction::new("NEGATIVE", 0.91));
    }

    #[test]
    fn test_parse_error_responses() {
        assert!(parse_predictions(&json!({"error": "Model is loading"})).is_err());
        assert!(parse_predictions(&json!({"unexpected": true})).is_err());
        assert!(parse_predictions(&json!([{"label": "POSITIVE"}])).is_err());
        assert!(parse_predictions(&json!([[]])).is_err());
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        assert!(HttpClassifier::new("ftp://models", None, Duration::from_secs(5)).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires network access to the inference endpoint
    async fn test_live_inference() {
        let mut config = ClassifierConfig::default();
        config.load_token();
        let classifier = HttpClassifier::from_config(&config).unwrap();

        let predictions = classifier
            .classify(&["I love this product!".to_string()])
            .await
            .unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].label, "POSITIVE");
    }
}
