use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

use crate::models::{AnnotatedReview, Review};

/// Read a JSON array file as loose values.
///
/// A missing, unreadable or non-array file is "no data": it is logged and
/// an empty collection is returned.
pub async fn load_json_array(path: &Path) -> Vec<Value> {
    match try_load_json_array(path).await {
        Ok(items) => items,
        Err(e) => {
            warn!("No data loaded from {}: {:#}", path.display(), e);
            Vec::new()
        }
    }
}

async fn try_load_json_array(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let data: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;

    match data {
        Value::Array(items) => Ok(items),
        other => Err(anyhow!("Expected a JSON array, found {}", type_name(&other))),
    }
}

pub async fn load_reviews(path: &Path) -> Vec<Review> {
    let reviews: Vec<Review> = load_json_array(path)
        .await
        .iter()
        .map(Review::from_value)
        .collect();

    info!("Loaded {} reviews from {}", reviews.len(), path.display());
    reviews
}

pub async fn load_annotated_reviews(path: &Path) -> Vec<AnnotatedReview> {
    let reviews: Vec<AnnotatedReview> = load_json_array(path)
        .await
        .iter()
        .map(AnnotatedReview::from_value)
        .collect();

    info!(
        "Loaded {} analyzed reviews from {}",
        reviews.len(),
        path.display()
    );
    reviews
}

/// Write `value` as pretty-printed JSON, creating parent directories
pub async fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Saved {}", path.display());
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassifierOutput, Sentiment};
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reviews = load_reviews(&dir.path().join("reviews.json")).await;
        assert!(reviews.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_reviews(&path).await.is_empty());

        std::fs::write(&path, r#"{"text": "an object, not an array"}"#).unwrap();
        assert!(load_reviews(&path).await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_records_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.json");
        std::fs::write(
            &path,
            json!([
                {"text": "Great!", "date": "2023-01-05", "rating": 5},
                {"date": "2023-01-06", "rating": 1},
                {"text": "No date"}
            ])
            .to_string(),
        )
        .unwrap();

        let reviews = load_reviews(&path).await;
        assert_eq!(reviews.len(), 3);
        assert_eq!(reviews[1].text, "");
        assert_eq!(reviews[2].date, "");
        assert_eq!(reviews[2].month_key(), None);
    }

    #[tokio::test]
    async fn test_save_and_reload_analyzed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/reviews_analyzed.json");

        let analyzed = vec![
            AnnotatedReview::new(
                Review::new("Great!", "2023-01-05", 5),
                ClassifierOutput {
                    label: Sentiment::Positive,
                    score: 0.99,
                },
            ),
            AnnotatedReview::new(Review::new("Bad.", "2023-01-06", 1), ClassifierOutput::unknown()),
        ];

        save_json(&path, &analyzed).await.unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["sentiment"], json!("POSITIVE"));
        assert_eq!(raw[1]["sentiment"], json!("UNKNOWN"));
        assert_eq!(raw[1]["confidence"], json!(0.0));

        assert_eq!(load_annotated_reviews(&path).await, analyzed);
    }
}
