use anyhow::{Context, Result};
use review_sentiment::classifier::build_classifier;
use review_sentiment::config::{PipelineConfig, ScraperConfig};
use review_sentiment::fetcher::{ProductsFetcher, ReviewsFetcher, TestimonialsFetcher};
use review_sentiment::pipeline::{self, RunPaths};
use review_sentiment::storage;
use std::env;
use std::path::Path;
use tracing::{error, info, warn};

const PIPELINE_CONFIG: &str = "src/configs/pipeline.toml";
const SCRAPER_CONFIG: &str = "src/configs/web_scraping_dev.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let scrape_first = env::args().any(|arg| arg == "--scrape" || arg == "-s");

    if scrape_first {
        info!("🚀 Starting Review Sentiment Pipeline (Scraping fresh reviews)");
    } else {
        info!("🚀 Starting Review Sentiment Pipeline (Using stored reviews)");
    }

    let config = PipelineConfig::load_or_default(PIPELINE_CONFIG);
    info!(
        "Loaded pipeline configuration: batch size {}, classifier {:?}",
        config.annotation.batch_size, config.classifier.kind
    );

    if scrape_first {
        // Each failed stage falls back to whatever is already stored
        if let Err(e) = scrape_reviews(&config.data.reviews_path).await {
            error!("❌ Review scraping failed: {:#}", e);
        }
        if let Err(e) = scrape_products(&config.data.products_path).await {
            error!("❌ Product scraping failed: {:#}", e);
        }
        if let Err(e) = scrape_testimonials(&config.data.testimonials_path).await {
            error!("❌ Testimonial scraping failed: {:#}", e);
        }
    }

    let classifier = build_classifier(&config.classifier);
    if classifier.is_none() {
        warn!("⚠️ Sentiment classifier unavailable, all reviews will be marked UNKNOWN");
    }

    let annotator = pipeline::build_annotation_pipeline(&config, classifier);
    let outcome = pipeline::run(&annotator, &RunPaths::from_config(&config)).await?;

    pipeline::log_report(&outcome.report);

    if let Some(path) = &outcome.export_path {
        info!("📊 Parquet export: {}", path.display());
    }

    if outcome.analyzed.is_empty() {
        warn!("⚠️ No reviews were analyzed (run {})", outcome.run_id);
    } else {
        info!(
            "🎉 Analyzed {} reviews (run {})",
            outcome.analyzed.len(),
            outcome.run_id
        );
    }

    Ok(())
}

fn load_scraper_config() -> Result<ScraperConfig> {
    ScraperConfig::from_file_or_default(SCRAPER_CONFIG)
        .with_context(|| format!("Failed to load scraper config {}", SCRAPER_CONFIG))
}

async fn scrape_reviews(reviews_path: &Path) -> Result<()> {
    let fetcher = ReviewsFetcher::new(load_scraper_config()?)?;
    let reviews = fetcher.fetch_all_reviews().await?;

    if reviews.is_empty() {
        warn!("No reviews scraped, keeping existing {}", reviews_path.display());
        return Ok(());
    }

    storage::save_json(reviews_path, &reviews).await?;
    info!("✅ Stored {} scraped reviews", reviews.len());
    Ok(())
}

async fn scrape_products(products_path: &Path) -> Result<()> {
    let fetcher = ProductsFetcher::new(load_scraper_config()?)?;
    let products = fetcher.fetch_all_products().await?;

    if products.is_empty() {
        warn!("No products scraped, keeping existing {}", products_path.display());
        return Ok(());
    }

    storage::save_json(products_path, &products).await?;
    info!("✅ Stored {} scraped products", products.len());
    Ok(())
}

async fn scrape_testimonials(testimonials_path: &Path) -> Result<()> {
    let fetcher = TestimonialsFetcher::new(load_scraper_config()?)?;
    let testimonials = fetcher.fetch_all_testimonials().await?;

    if testimonials.is_empty() {
        warn!(
            "No testimonials scraped, keeping existing {}",
            testimonials_path.display()
        );
        return Ok(());
    }

    storage::save_json(testimonials_path, &testimonials).await?;
    info!("✅ Stored {} scraped testimonials", testimonials.len());
    Ok(())
}
