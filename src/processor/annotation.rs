use std::sync::Arc;
use tracing::{info, warn};

use crate::classifier::SentimentClassifier;
use crate::models::{AnnotatedReview, ClassifierOutput, RawPrediction, Review, Sentiment};

pub const DEFAULT_BATCH_SIZE: usize = 8;
pub const DEFAULT_MAX_CHARS: usize = 512;

/// Runs review texts through a sentiment classifier in fixed-size batches
/// and attaches the verdicts back to the reviews.
///
/// Output always has the same length and order as the input. Batches whose
/// classifier call fails resolve to UNKNOWN with 0.0 confidence; with no
/// classifier at all, every text does.
pub struct AnnotationPipeline {
    classifier: Option<Arc<dyn SentimentClassifier>>,
    batch_size: usize,
    max_chars: usize,
}

impl AnnotationPipeline {
    pub fn new(classifier: Option<Arc<dyn SentimentClassifier>>) -> Self {
        Self {
            classifier,
            batch_size: DEFAULT_BATCH_SIZE,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_some()
    }

    /// Classify every text, one batch at a time
    pub async fn annotate(&self, texts: &[String]) -> Vec<ClassifierOutput> {
        let Some(classifier) = &self.classifier else {
            if !texts.is_empty() {
                warn!(
                    "No sentiment classifier available, marking {} texts UNKNOWN",
                    texts.len()
                );
            }
            return vec![ClassifierOutput::unknown(); texts.len()];
        };

        let mut outputs = Vec::with_capacity(texts.len());
        let mut failed_batches = 0;

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            let truncated: Vec<String> = batch
                .iter()
                .map(|text| truncate_text(text, self.max_chars).to_string())
                .collect();

            match classifier.classify(&truncated).await {
                Ok(predictions) if predictions.len() == batch.len() => {
                    outputs.extend(predictions.iter().map(validate_prediction));
                }
                Ok(predictions) => {
                    failed_batches += 1;
                    warn!(
                        "Batch {} returned {} predictions for {} texts, marking UNKNOWN",
                        batch_index,
                        predictions.len(),
                        batch.len()
                    );
                    outputs.extend(std::iter::repeat_n(ClassifierOutput::unknown(), batch.len()));
                }
                Err(e) => {
                    failed_batches += 1;
                    warn!("Batch {} classification failed: {:#}", batch_index, e);
                    outputs.extend(std::iter::repeat_n(ClassifierOutput::unknown(), batch.len()));
                }
            }
        }

        if failed_batches > 0 {
            warn!(
                "{} of {} batches degraded to UNKNOWN",
                failed_batches,
                texts.len().div_ceil(self.batch_size)
            );
        }

        outputs
    }

    /// Classify the reviews' text and merge the verdicts into the records
    pub async fn annotate_reviews(&self, reviews: Vec<Review>) -> Vec<AnnotatedReview> {
        let texts: Vec<String> = reviews.iter().map(|r| r.text.clone()).collect();
        let outputs = self.annotate(&texts).await;

        let annotated: Vec<AnnotatedReview> = reviews
            .into_iter()
            .zip(outputs)
            .map(|(review, output)| AnnotatedReview::new(review, output))
            .collect();

        info!(
            "Annotated {} reviews in batches of {}",
            annotated.len(),
            self.batch_size
        );

        annotated
    }
}

/// First `max_chars` characters of `text`, cut on a character boundary
pub fn truncate_text(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Clamp to [0, 1] and round to four decimal digits
pub fn round_confidence(score: f64) -> f64 {
    (score.clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0
}

fn validate_prediction(prediction: &RawPrediction) -> ClassifierOutput {
    let label = Sentiment::from_label(&prediction.label);
    if label == Sentiment::Unknown || !prediction.score.is_finite() {
        return ClassifierOutput::unknown();
    }

    // A zero confidence only ever goes with UNKNOWN
    let score = round_confidence(prediction.score);
    if score == 0.0 {
        return ClassifierOutput::unknown();
    }

    ClassifierOutput { label, score }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Deterministic stub: POSITIVE when the text has an even length,
    /// score derived from the length. Records every batch it receives.
    #[derive(Default)]
    struct LengthClassifier {
        batches: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl SentimentClassifier for LengthClassifier {
        fn name(&self) -> &str {
            "length"
        }

        async fn classify(&self, texts: &[String]) -> Result<Vec<RawPrediction>> {
            self.batches.lock().unwrap().push(texts.to_vec());
            Ok(texts
                .iter()
                .map(|t| {
                    let len = t.chars().count();
                    let label = if len % 2 == 0 { "POSITIVE" } else { "NEGATIVE" };
                    RawPrediction::new(label, 0.5 + (len % 50) as f64 / 100.123456)
                })
                .collect())
        }
    }

    /// Replays a fixed list of predictions
    struct FixedClassifier(Vec<RawPrediction>);

    #[async_trait]
    impl SentimentClassifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn classify(&self, _texts: &[String]) -> Result<Vec<RawPrediction>> {
            Ok(self.0.clone())
        }
    }

    /// Fails every call whose batch contains the given text
    struct FailingClassifier {
        poison: Option<String>,
    }

    #[async_trait]
    impl SentimentClassifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn classify(&self, texts: &[String]) -> Result<Vec<RawPrediction>> {
            match &self.poison {
                Some(poison) if !texts.contains(poison) => {
                    Ok(texts.iter().map(|_| RawPrediction::new("POSITIVE", 0.8)).collect())
                }
                _ => Err(anyhow!("model unavailable")),
            }
        }
    }

    fn sample_texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("review {}", "x".repeat(i + 1))).collect()
    }

    #[tokio::test]
    async fn test_output_length_and_order() {
        let stub = Arc::new(LengthClassifier::default());
        let pipeline = AnnotationPipeline::new(Some(stub.clone()));
        let texts = sample_texts(19);

        let outputs = pipeline.annotate(&texts).await;
        assert_eq!(outputs.len(), texts.len());

        for (text, output) in texts.iter().zip(&outputs) {
            let expected = if text.chars().count() % 2 == 0 {
                Sentiment::Positive
            } else {
                Sentiment::Negative
            };
            assert_eq!(output.label, expected);
        }

        let batches = stub.batches.lock().unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![8, 8, 3]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let pipeline = AnnotationPipeline::new(Some(Arc::new(LengthClassifier::default())));
        assert!(pipeline.annotate(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_annotation_is_deterministic() {
        let pipeline = AnnotationPipeline::new(Some(Arc::new(LengthClassifier::default())));
        let texts = sample_texts(5);

        let first = pipeline.annotate(&texts).await;
        let second = pipeline.annotate(&texts).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_long_text_truncated_before_classification() {
        let stub = Arc::new(LengthClassifier::default());
        let pipeline = AnnotationPipeline::new(Some(stub.clone()));

        let long: String = "abcdefghij".repeat(60);
        assert_eq!(long.chars().count(), 600);
        let prefix: String = long.chars().take(512).collect();

        let outputs = pipeline.annotate(&[long, prefix]).await;
        assert_eq!(outputs[0], outputs[1]);

        let batches = stub.batches.lock().unwrap();
        assert!(batches[0].iter().all(|t| t.chars().count() == 512));
    }

    #[tokio::test]
    async fn test_batch_size_invariance() {
        let texts = sample_texts(10);
        let mut results = Vec::new();

        for batch_size in [1, 8, 10] {
            let pipeline = AnnotationPipeline::new(Some(Arc::new(LengthClassifier::default())))
                .with_batch_size(batch_size);
            results.push(pipeline.annotate(&texts).await);
        }

        assert_eq!(results[0], results[1]);
        assert_eq!(results[1], results[2]);
    }

    #[tokio::test]
    async fn test_zero_batch_size_treated_as_one() {
        let stub = Arc::new(LengthClassifier::default());
        let pipeline = AnnotationPipeline::new(Some(stub.clone())).with_batch_size(0);
        assert_eq!(pipeline.batch_size(), 1);

        pipeline.annotate(&sample_texts(3)).await;
        assert_eq!(stub.batches.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_confidence_rounding() {
        let pipeline = AnnotationPipeline::new(Some(Arc::new(FixedClassifier(vec![
            RawPrediction::new("POSITIVE", 0.987654321),
            RawPrediction::new("negative", 1.2),
        ]))));

        let outputs = pipeline
            .annotate(&["a".to_string(), "b".to_string()])
            .await;
        assert_eq!(outputs[0].score, 0.9877);
        assert_eq!(outputs[1].label, Sentiment::Negative);
        assert_eq!(outputs[1].score, 1.0);
    }

    #[tokio::test]
    async fn test_unrecognized_label_and_nan_become_unknown() {
        let pipeline = AnnotationPipeline::new(Some(Arc::new(FixedClassifier(vec![
            RawPrediction::new("LABEL_1", 0.9),
            RawPrediction::new("POSITIVE", f64::NAN),
        ]))));

        let outputs = pipeline
            .annotate(&["a".to_string(), "b".to_string()])
            .await;
        assert_eq!(outputs, vec![ClassifierOutput::unknown(); 2]);
    }

    #[tokio::test]
    async fn test_zero_score_becomes_unknown() {
        let pipeline = AnnotationPipeline::new(Some(Arc::new(FixedClassifier(vec![
            RawPrediction::new("POSITIVE", 0.0),
            RawPrediction::new("NEGATIVE", 0.00004),
            RawPrediction::new("NEGATIVE", 0.00006),
        ]))));

        let outputs = pipeline.annotate(&sample_texts(3)).await;
        assert_eq!(outputs[0], ClassifierOutput::unknown());
        assert_eq!(outputs[1], ClassifierOutput::unknown());
        assert_eq!(outputs[2].label, Sentiment::Negative);
        assert_eq!(outputs[2].score, 0.0001);
    }

    #[tokio::test]
    async fn test_length_mismatch_degrades_batch() {
        let pipeline = AnnotationPipeline::new(Some(Arc::new(FixedClassifier(vec![
            RawPrediction::new("POSITIVE", 0.9),
        ]))));

        let outputs = pipeline.annotate(&sample_texts(3)).await;
        assert_eq!(outputs, vec![ClassifierOutput::unknown(); 3]);
    }

    #[tokio::test]
    async fn test_unavailable_classifier_marks_everything_unknown() {
        let pipeline = AnnotationPipeline::new(None);
        assert!(!pipeline.is_available());

        let outputs = pipeline.annotate(&sample_texts(4)).await;
        assert_eq!(outputs, vec![ClassifierOutput::unknown(); 4]);
    }

    #[tokio::test]
    async fn test_erroring_classifier_marks_everything_unknown() {
        let pipeline = AnnotationPipeline::new(Some(Arc::new(FailingClassifier { poison: None })));

        let outputs = pipeline.annotate(&sample_texts(10)).await;
        assert_eq!(outputs.len(), 10);
        assert!(outputs.iter().all(|o| *o == ClassifierOutput::unknown()));
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_affect_others() {
        let texts = sample_texts(10);
        let pipeline = AnnotationPipeline::new(Some(Arc::new(FailingClassifier {
            poison: Some(texts[9].clone()),
        })));

        let outputs = pipeline.annotate(&texts).await;
        assert!(outputs[..8].iter().all(|o| o.label == Sentiment::Positive && o.score == 0.8));
        assert!(outputs[8..].iter().all(|o| *o == ClassifierOutput::unknown()));
    }

    #[tokio::test]
    async fn test_annotate_reviews_merges_by_position() {
        let pipeline = AnnotationPipeline::new(Some(Arc::new(FixedClassifier(vec![
            RawPrediction::new("POSITIVE", 0.99),
            RawPrediction::new("NEGATIVE", 0.95),
        ]))));

        let reviews = vec![
            Review::new("Great!", "2023-01-05", 5),
            Review::new("Bad.", "2023-01-06", 1),
        ];

        let annotated = pipeline.annotate_reviews(reviews.clone()).await;
        assert_eq!(annotated.len(), 2);
        assert_eq!(annotated[0].review, reviews[0]);
        assert_eq!(annotated[0].sentiment, Sentiment::Positive);
        assert_eq!(annotated[0].confidence, 0.99);
        assert_eq!(annotated[1].sentiment, Sentiment::Negative);
        assert_eq!(annotated[1].confidence, 0.95);
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello", 3), "hel");
        assert_eq!(truncate_text("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_text("", 3), "");
    }

    #[test]
    fn test_round_confidence() {
        assert_eq!(round_confidence(0.123456), 0.1235);
        assert_eq!(round_confidence(-0.1), 0.0);
        assert_eq!(round_confidence(0.99), 0.99);
    }
}
