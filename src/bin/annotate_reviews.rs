use anyhow::Result;
use review_sentiment::classifier::build_classifier;
use review_sentiment::config::PipelineConfig;
use review_sentiment::pipeline::{self, RunPaths};
use std::env;
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    // Usage: annotate_reviews [input.json] [output.json]
    let config = PipelineConfig::load_or_default("src/configs/pipeline.toml");
    let mut paths = RunPaths::from_config(&config);

    let args: Vec<String> = env::args().skip(1).collect();
    if let Some(input) = args.first() {
        paths.reviews = PathBuf::from(input);
    }
    if let Some(output) = args.get(1) {
        paths.analyzed = PathBuf::from(output);
        // Only the analyzed file is wanted when an explicit output is given
        paths.summary = None;
        paths.export_dir = None;
    }

    info!(
        "Annotating {} -> {}",
        paths.reviews.display(),
        paths.analyzed.display()
    );

    let annotator =
        pipeline::build_annotation_pipeline(&config, build_classifier(&config.classifier));
    let outcome = pipeline::run(&annotator, &paths).await?;

    let overall = &outcome.report.overall;
    println!("\n{}", "=".repeat(50));
    println!("SENTIMENT ANALYSIS COMPLETE");
    println!("{}", "=".repeat(50));
    println!("Total reviews: {}", overall.total);
    println!(
        "Positive: {} ({:.1}%)",
        overall.positive_count,
        overall.positive_share() * 100.0
    );
    println!(
        "Negative: {} ({:.1}%)",
        overall.negative_count,
        overall.negative_share() * 100.0
    );
    if overall.unknown_count() > 0 {
        println!("Unknown: {}", overall.unknown_count());
    }

    Ok(())
}
