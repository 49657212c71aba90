use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Fields owned by the annotation stage. They are dropped from the
/// passthrough map so a re-annotated record never carries them twice.
const ANNOTATION_FIELDS: [&str; 2] = ["sentiment", "confidence"];

/// A scraped customer review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub rating: u32,
    /// Any other fields the scraper attached (author, product, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Review {
    pub fn new(text: impl Into<String>, date: impl Into<String>, rating: u32) -> Self {
        Self {
            text: text.into(),
            date: date.into(),
            rating,
            extra: Map::new(),
        }
    }

    /// Build a review from an arbitrary JSON value without failing.
    ///
    /// Missing or mistyped `text`/`date` become empty strings and a missing
    /// `rating` becomes 0. Non-object values yield an empty review.
    pub fn from_value(item: &Value) -> Self {
        let Some(object) = item.as_object() else {
            return Self::new("", "", 0);
        };

        let get_string = |key: &str| -> String {
            object
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        let rating = object
            .get("rating")
            .and_then(|v| {
                v.as_u64()
                    .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
                    .or_else(|| v.as_str().and_then(|s| s.trim().parse::<u64>().ok()))
            })
            .map(|r| r.min(u32::MAX as u64) as u32)
            .unwrap_or(0);

        let extra = object
            .iter()
            .filter(|(key, _)| {
                !matches!(key.as_str(), "text" | "date" | "rating")
                    && !ANNOTATION_FIELDS.contains(&key.as_str())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            text: get_string("text"),
            date: get_string("date"),
            rating,
            extra,
        }
    }

    /// Year-month grouping key, `None` when the review has no date
    pub fn month_key(&self) -> Option<&str> {
        month_key(&self.date)
    }
}

/// First seven characters of a `YYYY-MM-DD` date.
///
/// Dates shorter than seven characters are used whole.
pub fn month_key(date: &str) -> Option<&str> {
    if date.is_empty() {
        return None;
    }

    match date.char_indices().nth(7) {
        Some((end, _)) => Some(&date[..end]),
        None => Some(date),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Unknown,
}

impl Sentiment {
    /// Map a classifier label onto the enum, case-insensitively.
    /// Anything other than POSITIVE/NEGATIVE is UNKNOWN.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("positive") {
            Sentiment::Positive
        } else if label.eq_ignore_ascii_case("negative") {
            Sentiment::Negative
        } else {
            Sentiment::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "POSITIVE",
            Sentiment::Negative => "NEGATIVE",
            Sentiment::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label and score for a single text as stored by the annotation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    pub label: Sentiment,
    pub score: f64,
}

impl ClassifierOutput {
    pub fn unknown() -> Self {
        Self {
            label: Sentiment::Unknown,
            score: 0.0,
        }
    }
}

/// Raw prediction as returned by a classifier backend, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub label: String,
    pub score: f64,
}

impl RawPrediction {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// A review with the classifier's verdict attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedReview {
    #[serde(flatten)]
    pub review: Review,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub confidence: f64,
}

impl AnnotatedReview {
    pub fn new(review: Review, output: ClassifierOutput) -> Self {
        Self {
            review,
            sentiment: output.label,
            confidence: output.score,
        }
    }

    /// Lenient counterpart of [`Review::from_value`] for analyzed files.
    pub fn from_value(item: &Value) -> Self {
        let review = Review::from_value(item);
        let sentiment = item
            .get("sentiment")
            .and_then(|v| v.as_str())
            .map(Sentiment::from_label)
            .unwrap_or_default();
        let confidence = item
            .get("confidence")
            .and_then(|v| v.as_f64())
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(0.0);

        // A label without a usable confidence is not trusted
        let (sentiment, confidence) = if sentiment == Sentiment::Unknown || confidence == 0.0 {
            (Sentiment::Unknown, 0.0)
        } else {
            (sentiment, confidence)
        };

        Self {
            review,
            sentiment,
            confidence,
        }
    }

    pub fn month_key(&self) -> Option<&str> {
        self.review.month_key()
    }
}

/// A product card from the store listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub url: String,
    pub price: String,
    pub description: String,
    pub image: String,
}

/// A customer testimonial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    pub text: String,
    #[serde(default = "anonymous_author")]
    pub author: String,
    #[serde(default = "default_testimonial_rating")]
    pub rating: u32,
}

pub fn anonymous_author() -> String {
    "Anonymous".to_string()
}

fn default_testimonial_rating() -> u32 {
    5
}
