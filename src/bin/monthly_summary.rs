use anyhow::{Result, anyhow};
use review_sentiment::config::PipelineConfig;
use review_sentiment::processor::{available_months, filter_by_month, summarize};
use review_sentiment::storage;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    // Usage: monthly_summary [YYYY-MM]
    let config = PipelineConfig::load_or_default("src/configs/pipeline.toml");
    let reviews = storage::load_annotated_reviews(&config.data.analyzed_path).await;

    if reviews.is_empty() {
        println!("No analyzed reviews found in {}", config.data.analyzed_path.display());
        return Ok(());
    }

    let months = available_months(&reviews);
    println!("Available months: {}", months.join(", "));

    let selected: Vec<String> = match env::args().nth(1) {
        Some(month) if months.contains(&month) => vec![month],
        Some(month) => return Err(anyhow!("No reviews for month {}", month)),
        None => months,
    };

    for month in &selected {
        let summary = summarize(&reviews, Some(month.as_str()));
        println!("\n=== {} ===", month);
        println!("Reviews:  {}", summary.total);
        println!(
            "Positive: {} (avg confidence {:.1}%)",
            summary.positive_count,
            summary.positive_avg_confidence * 100.0
        );
        println!(
            "Negative: {} (avg confidence {:.1}%)",
            summary.negative_count,
            summary.negative_avg_confidence * 100.0
        );

        for review in filter_by_month(&reviews, month) {
            println!(
                "  {} [{}★] {} {:.1}%  {}",
                review.review.date,
                review.review.rating,
                review.sentiment,
                review.confidence * 100.0,
                review.review.text.chars().take(80).collect::<String>()
            );
        }
    }

    Ok(())
}
