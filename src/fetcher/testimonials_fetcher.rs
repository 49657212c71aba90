use anyhow::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{info, warn};

use super::HtmlClient;
use super::reviews_fetcher::parse_selector;
use crate::config::{ScraperConfig, TestimonialSelectorConfig};
use crate::models::{Testimonial, anonymous_author};

/// Fetcher for the testimonials page and the batches its infinite scroll
/// would load
pub struct TestimonialsFetcher {
    client: HtmlClient,
    config: ScraperConfig,
    extractor: TestimonialExtractor,
}

pub struct TestimonialExtractor {
    testimonial: Selector,
    testimonial_fallback: Selector,
    text: Selector,
    author: Selector,
    stars: Selector,
    whitespace: Regex,
    min_text_chars: usize,
}

impl TestimonialsFetcher {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = HtmlClient::new(&config.scraping)?;
        let extractor = TestimonialExtractor::new(&config.testimonial_selectors)?;

        Ok(TestimonialsFetcher {
            client,
            config,
            extractor,
        })
    }

    pub async fn fetch_all_testimonials(&self) -> Result<Vec<Testimonial>> {
        let mut all_testimonials = Vec::new();
        let mut seen = HashSet::new();
        let max_pages = self.config.scraping.max_pages.max(1);

        for page in 1..=max_pages {
            let url = self.config.testimonials_page_url(page);
            info!("Scraping testimonials batch {}: {}", page, url);

            let html = match self.client.fetch_page_with_retry(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Failed to scrape testimonials batch {}: {:#}", page, e);
                    break;
                }
            };

            let testimonials = self.extractor.extract_testimonials(&html);
            if testimonials.is_empty() {
                info!("No testimonials in batch {}, reached the end", page);
                break;
            }

            let before = all_testimonials.len();
            for testimonial in testimonials {
                if seen.insert((testimonial.author.clone(), testimonial.text.clone())) {
                    all_testimonials.push(testimonial);
                }
            }

            if all_testimonials.len() == before {
                info!("Batch {} only repeated earlier testimonials, stopping", page);
                break;
            }

            if page < max_pages {
                self.client.pause().await;
            }
        }

        info!("Scraped {} testimonials", all_testimonials.len());
        Ok(all_testimonials)
    }
}

impl TestimonialExtractor {
    pub fn new(selectors: &TestimonialSelectorConfig) -> Result<Self> {
        Ok(Self {
            testimonial: parse_selector(&selectors.testimonial)?,
            testimonial_fallback: parse_selector(&selectors.testimonial_fallback)?,
            text: parse_selector(&selectors.text)?,
            author: parse_selector(&selectors.author)?,
            stars: parse_selector(&selectors.stars)?,
            whitespace: Regex::new(r"\s+")?,
            min_text_chars: selectors.min_text_chars,
        })
    }

    /// Testimonials in document order.
    ///
    /// Without an author element the author is "Anonymous"; without star
    /// icons the rating is 5.
    pub fn extract_testimonials(&self, html: &str) -> Vec<Testimonial> {
        let document = Html::parse_document(html);

        let mut elements: Vec<ElementRef> = document.select(&self.testimonial).collect();
        if elements.is_empty() {
            elements = document.select(&self.testimonial_fallback).collect();
        }

        elements
            .into_iter()
            .filter_map(|element| self.extract_testimonial(element))
            .collect()
    }

    fn extract_testimonial(&self, element: ElementRef) -> Option<Testimonial> {
        let text = match element.select(&self.text).next() {
            Some(text_element) => self.element_text(text_element),
            None => self.element_text(element),
        };

        if text.chars().count() <= self.min_text_chars {
            return None;
        }

        let author = element
            .select(&self.author)
            .next()
            .map(|author_element| self.element_text(author_element))
            .filter(|author| !author.is_empty())
            .unwrap_or_else(anonymous_author);

        let stars = element.select(&self.stars).count();
        let rating = if stars == 0 { 5 } else { stars as u32 };

        Some(Testimonial {
            text,
            author,
            rating,
        })
    }

    fn element_text(&self, element: ElementRef) -> String {
        let joined = element.text().collect::<Vec<_>>().join(" ");
        self.whitespace.replace_all(&joined, " ").trim().to_string()
    }
}
