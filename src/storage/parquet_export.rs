use anyhow::{Context, Result, anyhow};
use polars::prelude::*;
use std::path::Path;
use tracing::info;

use crate::models::AnnotatedReview;

/// Columnar view of the analyzed reviews for the dashboard
pub fn reviews_to_dataframe(reviews: &[AnnotatedReview]) -> Result<DataFrame> {
    let dates: Vec<String> = reviews.iter().map(|r| r.review.date.clone()).collect();
    let months: Vec<Option<String>> = reviews
        .iter()
        .map(|r| r.month_key().map(str::to_string))
        .collect();
    let texts: Vec<String> = reviews.iter().map(|r| r.review.text.clone()).collect();
    let ratings: Vec<u32> = reviews.iter().map(|r| r.review.rating).collect();
    let sentiments: Vec<String> = reviews
        .iter()
        .map(|r| r.sentiment.as_str().to_string())
        .collect();
    let confidences: Vec<f64> = reviews.iter().map(|r| r.confidence).collect();

    let columns: Vec<Column> = vec![
        Series::new("date".into(), dates).into(),
        Series::new("month".into(), months).into(),
        Series::new("text".into(), texts).into(),
        Series::new("rating".into(), ratings).into(),
        Series::new("sentiment".into(), sentiments).into(),
        Series::new("confidence".into(), confidences).into(),
    ];

    DataFrame::new(columns).map_err(|e| anyhow!("Failed to create DataFrame: {}", e))
}

pub fn encode_parquet(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let writer = ParquetWriter::new(&mut buf);
        writer.finish(df)?;
    }
    Ok(buf)
}

pub async fn export_parquet(path: &Path, reviews: &[AnnotatedReview]) -> Result<()> {
    let mut df = reviews_to_dataframe(reviews)?;
    let buf = encode_parquet(&mut df)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    tokio::fs::write(path, &buf)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(
        "Exported {} rows ({} bytes) to {}",
        df.height(),
        buf.len(),
        path.display()
    );
    Ok(())
}
