use anyhow::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{info, warn};

use super::reviews_fetcher::parse_selector;
use super::{HtmlClient, resolve_link};
use crate::config::{ProductSelectorConfig, ScraperConfig};
use crate::models::Product;

/// HTML-based fetcher for the paginated product listing
pub struct ProductsFetcher {
    client: HtmlClient,
    config: ScraperConfig,
    extractor: ProductExtractor,
}

pub struct ProductExtractor {
    product: Selector,
    name: Selector,
    price: Selector,
    description: Selector,
    image: Selector,
    whitespace: Regex,
}

impl ProductsFetcher {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = HtmlClient::new(&config.scraping)?;
        let extractor = ProductExtractor::new(&config.product_selectors)?;

        Ok(ProductsFetcher {
            client,
            config,
            extractor,
        })
    }

    pub async fn fetch_all_products(&self) -> Result<Vec<Product>> {
        let mut all_products = Vec::new();
        let mut seen = HashSet::new();
        let max_pages = self.config.scraping.max_pages.max(1);

        for page in 1..=max_pages {
            let url = self.config.products_page_url(page);
            info!("Scraping products page {}: {}", page, url);

            let html = match self.client.fetch_page_with_retry(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Failed to scrape products page {}: {:#}", page, e);
                    break;
                }
            };

            let products = self.extractor.extract_products(&html, &url);
            if products.is_empty() {
                info!("No products found on page {}, stopping pagination", page);
                break;
            }

            let before = all_products.len();
            for product in products {
                if seen.insert(product.url.clone()) {
                    all_products.push(product);
                }
            }

            if all_products.len() == before {
                info!("Page {} only repeated earlier products, stopping pagination", page);
                break;
            }

            if page < max_pages {
                self.client.pause().await;
            }
        }

        info!("Scraped {} products", all_products.len());
        Ok(all_products)
    }
}

impl ProductExtractor {
    pub fn new(selectors: &ProductSelectorConfig) -> Result<Self> {
        Ok(Self {
            product: parse_selector(&selectors.product)?,
            name: parse_selector(&selectors.name)?,
            price: parse_selector(&selectors.price)?,
            description: parse_selector(&selectors.description)?,
            image: parse_selector(&selectors.image)?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Products on the page in document order. Cards missing a name,
    /// price, description or image are skipped. Links are resolved
    /// against `page_url`.
    pub fn extract_products(&self, html: &str, page_url: &str) -> Vec<Product> {
        let document = Html::parse_document(html);
        let mut products = Vec::new();
        let mut skipped = 0;

        for element in document.select(&self.product) {
            match self.extract_product(element, page_url) {
                Some(product) => products.push(product),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("Skipped {} incomplete product cards", skipped);
        }

        products
    }

    fn extract_product(&self, element: ElementRef, page_url: &str) -> Option<Product> {
        let name_element = element.select(&self.name).next()?;
        let name = self.element_text(name_element);
        let href = name_element.value().attr("href").unwrap_or_default();

        let price = self.element_text(element.select(&self.price).next()?);
        let description = self.element_text(element.select(&self.description).next()?);
        let image = element.select(&self.image).next()?.value().attr("src")?;

        if name.is_empty() || price.is_empty() {
            return None;
        }

        let price = if price.starts_with('$') {
            price
        } else {
            format!("${}", price)
        };

        Some(Product {
            name,
            url: resolve_link(page_url, href),
            price,
            description,
            image: resolve_link(page_url, image),
        })
    }

    fn element_text(&self, element: ElementRef) -> String {
        let joined = element.text().collect::<Vec<_>>().join(" ");
        self.whitespace.replace_all(&joined, " ").trim().to_string()
    }
}
