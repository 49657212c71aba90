use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Prefix for environment overrides, e.g. `REVIEW_SENTIMENT__CLASSIFIER__KIND=lexicon`
pub const ENV_PREFIX: &str = "REVIEW_SENTIMENT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub annotation: AnnotationConfig,
    pub classifier: ClassifierConfig,
    pub export: ExportConfig,
}

/// Flat-file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub reviews_path: PathBuf,
    pub analyzed_path: PathBuf,
    pub summary_path: PathBuf,
    pub products_path: PathBuf,
    pub testimonials_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    pub batch_size: usize,
    pub max_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Hosted model behind an inference endpoint
    Http,
    /// Offline word-list scorer
    Lexicon,
    /// No classifier; every review is UNKNOWN
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,
    pub endpoint: String,
    pub timeout_seconds: u64,
    /// Name of the environment variable holding the API token
    pub token_env: Option<String>,
    #[serde(skip)]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub parquet: bool,
    pub export_dir: PathBuf,
}

impl PipelineConfig {
    /// Layer the TOML file (if present) under `REVIEW_SENTIMENT__*` env vars.
    pub fn load(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read pipeline config: {}", path))?;

        let mut config: PipelineConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse pipeline config: {}", path))?;

        config.classifier.load_token();
        Ok(config)
    }

    /// Like [`PipelineConfig::load`] but never fails; falls back to defaults
    pub fn load_or_default(path: &str) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default pipeline config: {:#}", e);
                let mut config = Self::default();
                config.classifier.load_token();
                config
            }
        }
    }
}

impl ClassifierConfig {
    /// Read the API token from the configured environment variable.
    /// A missing token is not an error; public endpoints accept anonymous calls.
    pub fn load_token(&mut self) {
        let token_var = self.token_env.as_deref().unwrap_or("HF_API_TOKEN");
        self.api_token = env::var(token_var).ok().filter(|t| !t.trim().is_empty());
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            reviews_path: PathBuf::from("data/reviews.json"),
            analyzed_path: PathBuf::from("data/reviews_analyzed.json"),
            summary_path: PathBuf::from("data/monthly_summary.json"),
            products_path: PathBuf::from("data/products.json"),
            testimonials_path: PathBuf::from("data/testimonials.json"),
        }
    }
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            max_chars: 512,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::Http,
            endpoint: "https://api-inference.huggingface.co/models/distilbert-base-uncased-finetuned-sst-2-english".to_string(),
            timeout_seconds: 30,
            token_env: None,
            api_token: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            parquet: false,
            export_dir: PathBuf::from("data/exports"),
        }
    }
}
