use serde::{Deserialize, Serialize};

use crate::fetcher::paginate;

/// Configuration for the site's reviews, products and testimonials pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub site: SiteConfig,
    #[serde(default)]
    pub scraping: ScrapingConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub product_selectors: ProductSelectorConfig,
    #[serde(default)]
    pub testimonial_selectors: TestimonialSelectorConfig,
}

/// Basic site information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub reviews_url: String,
    #[serde(default = "default_products_url")]
    pub products_url: String,
    /// First batch of testimonials, rendered with the page
    #[serde(default = "default_testimonials_url")]
    pub testimonials_url: String,
    /// Endpoint the page's infinite scroll loads further batches from
    #[serde(default = "default_testimonials_api_url")]
    pub testimonials_api_url: String,
    /// Query parameter used for pages after the first
    #[serde(default = "default_page_param")]
    pub page_param: String,
}

/// Scraping behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub delay_between_requests_ms: u64,
    pub max_pages: usize,
    pub max_retries: usize,
    pub timeout_seconds: u64,
    /// Only reviews whose date starts with this prefix are kept
    pub keep_date_prefix: Option<String>,
    /// Reviews with text of this many characters or fewer are dropped
    pub min_text_chars: usize,
}

/// CSS selectors for extracting reviews
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub review: String,
    pub date: String,
    pub text: String,
    pub stars: String,
    pub stars_fallback: String,
}

/// CSS selectors for the product listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSelectorConfig {
    pub product: String,
    /// Link whose text is the name and whose `href` is the product page
    pub name: String,
    pub price: String,
    pub description: String,
    pub image: String,
}

/// CSS selectors for testimonials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestimonialSelectorConfig {
    pub testimonial: String,
    /// Used when `testimonial` matches nothing on a page
    pub testimonial_fallback: String,
    pub text: String,
    pub author: String,
    pub stars: String,
    /// Testimonials with text of this many characters or fewer are dropped
    pub min_text_chars: usize,
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_products_url() -> String {
    "https://web-scraping.dev/products".to_string()
}

fn default_testimonials_url() -> String {
    "https://web-scraping.dev/testimonials".to_string()
}

fn default_testimonials_api_url() -> String {
    "https://web-scraping.dev/api/testimonials".to_string()
}

impl ScraperConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: ScraperConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise use the defaults
    pub fn from_file_or_default(path: &str) -> Result<Self, anyhow::Error> {
        if std::path::Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!("Scraper config not found: {}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// URL of the given 1-based reviews page
    pub fn page_url(&self, page: usize) -> String {
        paginate(&self.site.reviews_url, &self.site.page_param, page)
    }

    /// Products are listed with an explicit page number, the first included
    pub fn products_page_url(&self, page: usize) -> String {
        let base = &self.site.products_url;
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{}{}{}={}", base, separator, self.site.page_param, page.max(1))
    }

    /// The testimonials page itself, then the batches its scroll would load
    pub fn testimonials_page_url(&self, page: usize) -> String {
        if page <= 1 {
            return self.site.testimonials_url.clone();
        }
        paginate(&self.site.testimonials_api_url, &self.site.page_param, page)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig {
                name: "web_scraping_dev".to_string(),
                reviews_url: "https://web-scraping.dev/reviews".to_string(),
                products_url: default_products_url(),
                testimonials_url: default_testimonials_url(),
                testimonials_api_url: default_testimonials_api_url(),
                page_param: default_page_param(),
            },
            scraping: ScrapingConfig::default(),
            selectors: SelectorConfig::default(),
            product_selectors: ProductSelectorConfig::default(),
            testimonial_selectors: TestimonialSelectorConfig::default(),
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            delay_between_requests_ms: 1500,
            max_pages: 10,
            max_retries: 3,
            timeout_seconds: 30,
            keep_date_prefix: Some("2023".to_string()),
            min_text_chars: 10,
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            review: ".review".to_string(),
            date: "[data-testid='review-date']".to_string(),
            text: "[data-testid='review-text'], .review-text, p".to_string(),
            stars: "[data-testid='review-stars'] svg, .review-stars svg".to_string(),
            stars_fallback: "svg".to_string(),
        }
    }
}

impl Default for ProductSelectorConfig {
    fn default() -> Self {
        Self {
            product: ".product".to_string(),
            name: "h3 a".to_string(),
            price: ".price".to_string(),
            description: ".short-description".to_string(),
            image: "img".to_string(),
        }
    }
}

impl Default for TestimonialSelectorConfig {
    fn default() -> Self {
        Self {
            testimonial: ".testimonial".to_string(),
            testimonial_fallback: "[class*='testimonial']".to_string(),
            text: ".text, p.text".to_string(),
            author: ".author, .testimonial-author".to_string(),
            stars: ".rating svg".to_string(),
            min_text_chars: 5,
        }
    }
}
