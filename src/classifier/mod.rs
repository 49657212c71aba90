pub mod http_classifier;
pub mod lexicon_classifier;

pub use http_classifier::*;
pub use lexicon_classifier::*;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ClassifierConfig, ClassifierKind};
use crate::models::RawPrediction;

/// A pretrained binary sentiment model.
///
/// Implementations return exactly one prediction per input text, in input
/// order. Inputs are already truncated by the caller.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, texts: &[String]) -> Result<Vec<RawPrediction>>;
}

/// Construct the configured classifier handle.
///
/// Returns `None` when classification is disabled or the backend cannot be
/// built; the pipeline then marks every review UNKNOWN.
pub fn build_classifier(config: &ClassifierConfig) -> Option<Arc<dyn SentimentClassifier>> {
    let classifier: Arc<dyn SentimentClassifier> = match config.kind {
        ClassifierKind::None => {
            info!("Sentiment classifier disabled by configuration");
            return None;
        }
        ClassifierKind::Lexicon => Arc::new(LexiconClassifier::new()),
        ClassifierKind::Http => match HttpClassifier::from_config(config) {
            Ok(classifier) => Arc::new(classifier),
            Err(e) => {
                warn!("Sentiment classifier unavailable: {:#}", e);
                return None;
            }
        },
    };

    info!("Using sentiment classifier: {}", classifier.name());
    Some(classifier)
}
