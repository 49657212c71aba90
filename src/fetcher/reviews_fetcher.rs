use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{info, warn};

use super::HtmlClient;
use crate::config::{ScraperConfig, ScrapingConfig, SelectorConfig};
use crate::models::Review;

/// HTML-based fetcher for the paginated reviews listing
pub struct ReviewsFetcher {
    client: HtmlClient,
    config: ScraperConfig,
    extractor: ReviewExtractor,
}

/// Compiled selectors and patterns for pulling reviews out of a page
pub struct ReviewExtractor {
    review: Selector,
    date: Selector,
    text: Selector,
    stars: Selector,
    stars_fallback: Selector,
    date_pattern: Regex,
    whitespace: Regex,
    min_text_chars: usize,
}

impl ReviewsFetcher {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = HtmlClient::new(&config.scraping)?;
        let extractor = ReviewExtractor::new(&config.selectors, &config.scraping)?;

        Ok(ReviewsFetcher {
            client,
            config,
            extractor,
        })
    }

    /// Scrape every page of the listing and keep the configured date range
    pub async fn fetch_all_reviews(&self) -> Result<Vec<Review>> {
        let mut all_reviews = Vec::new();
        let mut seen = HashSet::new();
        let max_pages = self.config.scraping.max_pages.max(1);

        for page in 1..=max_pages {
            let url = self.config.page_url(page);
            info!("Scraping reviews page {}: {}", page, url);

            let reviews = match self.scrape_page(&url).await {
                Ok(reviews) => reviews,
                Err(e) => {
                    warn!("Failed to scrape page {}: {:#}", page, e);
                    break;
                }
            };

            if reviews.is_empty() {
                info!("No reviews found on page {}, stopping pagination", page);
                break;
            }

            let before = all_reviews.len();
            for review in reviews {
                if seen.insert((review.date.clone(), review.text.clone())) {
                    all_reviews.push(review);
                }
            }

            if all_reviews.len() == before {
                info!("Page {} only repeated earlier reviews, stopping pagination", page);
                break;
            }

            if page < max_pages {
                self.client.pause().await;
            }
        }

        let scraped = all_reviews.len();
        let kept = filter_by_date_prefix(all_reviews, self.config.scraping.keep_date_prefix.as_deref());
        info!("Scraped {} reviews, kept {}", scraped, kept.len());

        Ok(kept)
    }

    async fn scrape_page(&self, url: &str) -> Result<Vec<Review>> {
        let html = self.client.fetch_page_with_retry(url).await?;
        Ok(self.extractor.extract_reviews(&html))
    }
}

impl ReviewExtractor {
    pub fn new(selectors: &SelectorConfig, scraping: &ScrapingConfig) -> Result<Self> {
        Ok(Self {
            review: parse_selector(&selectors.review)?,
            date: parse_selector(&selectors.date)?,
            text: parse_selector(&selectors.text)?,
            stars: parse_selector(&selectors.stars)?,
            stars_fallback: parse_selector(&selectors.stars_fallback)?,
            date_pattern: Regex::new(r"\d{4}-\d{2}-\d{2}")?,
            whitespace: Regex::new(r"\s+")?,
            min_text_chars: scraping.min_text_chars,
        })
    }

    /// Every well-formed review on the page, in document order.
    ///
    /// Elements without a recognizable date, or whose text is too short,
    /// are skipped.
    pub fn extract_reviews(&self, html: &str) -> Vec<Review> {
        let document = Html::parse_document(html);
        let mut reviews = Vec::new();
        let mut skipped = 0;

        for element in document.select(&self.review) {
            match self.extract_review(element) {
                Some(review) => reviews.push(review),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            info!("Skipped {} review elements without date or text", skipped);
        }

        reviews
    }

    fn extract_review(&self, element: ElementRef) -> Option<Review> {
        let full_text = self.element_text(element);

        let date = match element.select(&self.date).next() {
            Some(date_element) => self.element_text(date_element),
            None => self.date_pattern.find(&full_text)?.as_str().to_string(),
        };
        if date.is_empty() {
            return None;
        }

        let text = match element.select(&self.text).next() {
            Some(text_element) => self.element_text(text_element),
            None => {
                let without_date = self.date_pattern.replace_all(&full_text, "");
                self.collapse_whitespace(&without_date)
            }
        };

        if text.chars().count() <= self.min_text_chars {
            return None;
        }

        let mut stars = element.select(&self.stars).count();
        if stars == 0 {
            stars = element.select(&self.stars_fallback).count();
        }
        let rating = if stars == 0 { 5 } else { stars as u32 };

        Some(Review::new(text, normalize_date(&date), rating))
    }

    fn element_text(&self, element: ElementRef) -> String {
        let joined = element.text().collect::<Vec<_>>().join(" ");
        self.collapse_whitespace(&joined)
    }

    fn collapse_whitespace(&self, text: &str) -> String {
        self.whitespace.replace_all(text, " ").trim().to_string()
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Invalid CSS selector {:?}: {:?}", selector, e))
}

/// Normalize to `YYYY-MM-DD`; unparseable dates are kept as scraped
pub fn normalize_date(date: &str) -> String {
    let trimmed = date.trim();
    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(parsed) => parsed.format("%Y-%m-%d").to_string(),
        Err(_) => trimmed.to_string(),
    }
}

pub fn filter_by_date_prefix(reviews: Vec<Review>, prefix: Option<&str>) -> Vec<Review> {
    match prefix {
        Some(prefix) if !prefix.is_empty() => reviews
            .into_iter()
            .filter(|r| r.date.starts_with(prefix))
            .collect(),
        _ => reviews,
    }
}
