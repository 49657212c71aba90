use anyhow::{Context, Result};
use review_sentiment::config::{PipelineConfig, ScraperConfig};
use review_sentiment::fetcher::ReviewsFetcher;
use review_sentiment::storage;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    // Usage: scrape_reviews [scraper_config.toml] [output.json]
    let args: Vec<String> = env::args().skip(1).collect();
    let config_path = args
        .first()
        .map(String::as_str)
        .unwrap_or("src/configs/web_scraping_dev.toml");

    let output_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => PipelineConfig::load_or_default("src/configs/pipeline.toml")
            .data
            .reviews_path,
    };

    let config = ScraperConfig::from_file_or_default(config_path)
        .with_context(|| format!("Failed to load scraper config {}", config_path))?;
    info!("Scraping reviews from {}", config.site.name);

    let fetcher = ReviewsFetcher::new(config)?;
    let reviews = fetcher.fetch_all_reviews().await?;

    if reviews.is_empty() {
        warn!("No reviews scraped, nothing written");
        return Ok(());
    }

    storage::save_json(&output_path, &reviews).await?;

    let mut month_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for month in reviews.iter().filter_map(|r| r.month_key()) {
        *month_counts.entry(month).or_default() += 1;
    }

    println!("\nReviews by month:");
    for (month, count) in &month_counts {
        println!("  {}: {} reviews", month, count);
    }
    println!("\nTOTAL REVIEWS EXTRACTED: {}", reviews.len());

    Ok(())
}
