use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::classifier::SentimentClassifier;
use crate::config::PipelineConfig;
use crate::models::AnnotatedReview;
use crate::processor::{AnnotationPipeline, MonthlyReport};
use crate::storage::{self, StorageManager};

/// Where a run reads from and writes to
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub reviews: PathBuf,
    pub analyzed: PathBuf,
    pub summary: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
}

impl RunPaths {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            reviews: config.data.reviews_path.clone(),
            analyzed: config.data.analyzed_path.clone(),
            summary: Some(config.data.summary_path.clone()),
            export_dir: config
                .export
                .parquet
                .then(|| config.export.export_dir.clone()),
        }
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub analyzed: Vec<AnnotatedReview>,
    pub report: MonthlyReport,
    pub export_path: Option<PathBuf>,
}

pub fn build_annotation_pipeline(
    config: &PipelineConfig,
    classifier: Option<Arc<dyn SentimentClassifier>>,
) -> AnnotationPipeline {
    AnnotationPipeline::new(classifier)
        .with_batch_size(config.annotation.batch_size)
        .with_max_chars(config.annotation.max_chars)
}

/// Load reviews, annotate them, persist the analyzed collection and its
/// monthly summaries.
///
/// Missing input is treated as an empty collection. Failing to write an
/// output is an error; a failed Parquet export is only logged.
pub async fn run(annotator: &AnnotationPipeline, paths: &RunPaths) -> Result<RunOutcome> {
    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id);
    run_with_id(annotator, paths, run_id).instrument(span).await
}

async fn run_with_id(
    annotator: &AnnotationPipeline,
    paths: &RunPaths,
    run_id: Uuid,
) -> Result<RunOutcome> {
    let reviews = storage::load_reviews(&paths.reviews).await;
    if reviews.is_empty() {
        warn!("No reviews found in {}", paths.reviews.display());
    }

    info!("Running sentiment analysis on {} reviews", reviews.len());
    let analyzed = annotator.annotate_reviews(reviews).await;

    storage::save_json(&paths.analyzed, &analyzed)
        .await
        .context("Failed to save analyzed reviews")?;

    let report = MonthlyReport::from_reviews(&analyzed);
    if let Some(summary_path) = &paths.summary {
        storage::save_json(summary_path, &report)
            .await
            .context("Failed to save monthly summary")?;
    }

    let export_path = match &paths.export_dir {
        Some(dir) => export(dir, &run_id, &analyzed).await,
        None => None,
    };

    Ok(RunOutcome {
        run_id,
        analyzed,
        report,
        export_path,
    })
}

async fn export(dir: &Path, run_id: &Uuid, analyzed: &[AnnotatedReview]) -> Option<PathBuf> {
    let path = StorageManager::generate_export_path(dir, run_id, Utc::now());
    match storage::export_parquet(&path, analyzed).await {
        Ok(()) => Some(path),
        Err(e) => {
            warn!("Parquet export failed: {:#}", e);
            None
        }
    }
}

/// Log the overall and per-month sentiment breakdown
pub fn log_report(report: &MonthlyReport) {
    let overall = &report.overall;
    info!("=== Sentiment Analysis Summary ===");
    info!("Total reviews: {}", overall.total);
    info!(
        "Positive: {} ({:.1}%), avg confidence {:.4}",
        overall.positive_count,
        overall.positive_share() * 100.0,
        overall.positive_avg_confidence
    );
    info!(
        "Negative: {} ({:.1}%), avg confidence {:.4}",
        overall.negative_count,
        overall.negative_share() * 100.0,
        overall.negative_avg_confidence
    );
    if overall.unknown_count() > 0 {
        warn!("Unknown: {}", overall.unknown_count());
    }

    for (month, summary) in &report.months {
        info!(
            "{}: {} reviews, {} positive, {} negative",
            month, summary.total, summary.positive_count, summary.negative_count
        );
    }
}
