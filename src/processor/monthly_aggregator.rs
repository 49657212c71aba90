use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{AnnotatedReview, Sentiment};

/// Sentiment counts and mean confidences over a set of reviews.
///
/// UNKNOWN reviews count toward `total` only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub positive_count: usize,
    pub negative_count: usize,
    pub positive_avg_confidence: f64,
    pub negative_avg_confidence: f64,
    pub total: usize,
}

impl SentimentSummary {
    pub fn positive_share(&self) -> f64 {
        share(self.positive_count, self.total)
    }

    pub fn negative_share(&self) -> f64 {
        share(self.negative_count, self.total)
    }

    pub fn unknown_count(&self) -> usize {
        self.total
            .saturating_sub(self.positive_count)
            .saturating_sub(self.negative_count)
    }
}

/// Overall summary plus one summary per month, as handed to the dashboard
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub overall: SentimentSummary,
    pub months: BTreeMap<String, SentimentSummary>,
}

impl MonthlyReport {
    pub fn from_reviews(reviews: &[AnnotatedReview]) -> Self {
        Self {
            overall: summarize(reviews, None),
            months: summarize_by_month(reviews),
        }
    }
}

/// Summarize the reviews, optionally restricted to one `YYYY-MM` month
pub fn summarize(reviews: &[AnnotatedReview], month: Option<&str>) -> SentimentSummary {
    let mut summary = SentimentSummary::default();
    let mut positive_sum = 0.0;
    let mut negative_sum = 0.0;

    let selected = reviews
        .iter()
        .filter(|r| month.is_none_or(|m| r.month_key() == Some(m)));

    for review in selected {
        summary.total += 1;
        match review.sentiment {
            Sentiment::Positive => {
                summary.positive_count += 1;
                positive_sum += review.confidence;
            }
            Sentiment::Negative => {
                summary.negative_count += 1;
                negative_sum += review.confidence;
            }
            Sentiment::Unknown => {}
        }
    }

    summary.positive_avg_confidence = mean(positive_sum, summary.positive_count);
    summary.negative_avg_confidence = mean(negative_sum, summary.negative_count);
    summary
}

/// Distinct months present in the reviews, in chronological order
pub fn available_months(reviews: &[AnnotatedReview]) -> Vec<String> {
    reviews
        .iter()
        .filter_map(|r| r.month_key())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn filter_by_month<'a>(reviews: &'a [AnnotatedReview], month: &str) -> Vec<&'a AnnotatedReview> {
    reviews
        .iter()
        .filter(|r| r.month_key() == Some(month))
        .collect()
}

pub fn summarize_by_month(reviews: &[AnnotatedReview]) -> BTreeMap<String, SentimentSummary> {
    available_months(reviews)
        .into_iter()
        .map(|month| {
            let summary = summarize(reviews, Some(month.as_str()));
            (month, summary)
        })
        .collect()
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { count as f64 / total as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassifierOutput, Review};

    fn annotated(text: &str, date: &str, label: Sentiment, score: f64) -> AnnotatedReview {
        AnnotatedReview::new(Review::new(text, date, 3), ClassifierOutput { label, score })
    }

    fn sample() -> Vec<AnnotatedReview> {
        vec![
            annotated("Great!", "2023-01-05", Sentiment::Positive, 0.99),
            annotated("Bad.", "2023-01-06", Sentiment::Negative, 0.95),
            annotated("Fine", "2023-02-11", Sentiment::Positive, 0.75),
            annotated("Lovely", "2023-02-20", Sentiment::Positive, 0.85),
            annotated("??", "2023-03-01", Sentiment::Unknown, 0.0),
            annotated("No date", "", Sentiment::Negative, 0.6),
        ]
    }

    #[test]
    fn test_two_review_scenario() {
        let reviews = vec![
            annotated("Great!", "2023-01-05", Sentiment::Positive, 0.99),
            annotated("Bad.", "2023-01-06", Sentiment::Negative, 0.95),
        ];

        assert_eq!(
            summarize(&reviews, None),
            SentimentSummary {
                positive_count: 1,
                negative_count: 1,
                positive_avg_confidence: 0.99,
                negative_avg_confidence: 0.95,
                total: 2,
            }
        );
    }

    #[test]
    fn test_empty_collection() {
        assert_eq!(summarize(&[], None), SentimentSummary::default());
        assert_eq!(summarize(&[], Some("2023-01")), SentimentSummary::default());
        assert!(available_months(&[]).is_empty());
    }

    #[test]
    fn test_unknown_excluded_from_counts() {
        let reviews = vec![
            annotated("a", "2023-01-01", Sentiment::Unknown, 0.0),
            annotated("b", "2023-01-02", Sentiment::Unknown, 0.0),
        ];

        let summary = summarize(&reviews, None);
        assert_eq!(summary.positive_count, 0);
        assert_eq!(summary.negative_count, 0);
        assert_eq!(summary.positive_avg_confidence, 0.0);
        assert_eq!(summary.negative_avg_confidence, 0.0);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.unknown_count(), 2);
    }

    #[test]
    fn test_counts_bounded_by_total() {
        let reviews = sample();
        for month in [None, Some("2023-01"), Some("2023-02"), Some("2023-03"), Some("2024-01")] {
            let summary = summarize(&reviews, month);
            assert!(summary.positive_count + summary.negative_count <= summary.total);
            if summary.positive_count == 0 {
                assert_eq!(summary.positive_avg_confidence, 0.0);
            }
            if summary.negative_count == 0 {
                assert_eq!(summary.negative_avg_confidence, 0.0);
            }
        }
    }

    #[test]
    fn test_month_restriction() {
        let reviews = sample();

        let february = summarize(&reviews, Some("2023-02"));
        assert_eq!(february.positive_count, 2);
        assert_eq!(february.negative_count, 0);
        assert!((february.positive_avg_confidence - 0.8).abs() < 1e-12);
        assert_eq!(february.total, 2);

        let overall = summarize(&reviews, None);
        assert_eq!(overall.total, 6);
        assert_eq!(overall.negative_count, 2);
        assert_eq!(overall.unknown_count(), 1);

        assert_eq!(summarize(&reviews, Some("2024-01")).total, 0);
    }

    #[test]
    fn test_available_months_sorted_and_deduplicated() {
        let mut reviews = sample();
        reviews.reverse();
        assert_eq!(
            available_months(&reviews),
            vec!["2023-01", "2023-02", "2023-03"]
        );
    }

    #[test]
    fn test_filter_by_month_keeps_order() {
        let reviews = sample();
        let january = filter_by_month(&reviews, "2023-01");
        assert_eq!(
            january.iter().map(|r| r.review.text.as_str()).collect::<Vec<_>>(),
            vec!["Great!", "Bad."]
        );
        assert!(filter_by_month(&reviews, "").is_empty());
    }

    #[test]
    fn test_summarize_is_pure() {
        let reviews = sample();
        assert_eq!(MonthlyReport::from_reviews(&reviews), MonthlyReport::from_reviews(&reviews));
    }

    #[test]
    fn test_monthly_report() {
        let report = MonthlyReport::from_reviews(&sample());
        assert_eq!(report.months.len(), 3);
        assert_eq!(report.months["2023-01"].total, 2);
        assert_eq!(report.months["2023-03"].unknown_count(), 1);
        assert_eq!(report.overall.total, 6);
        assert!((report.months["2023-01"].positive_share() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_count_on_inconsistent_summary() {
        let summary: SentimentSummary = serde_json::from_str(
            r#"{"positive_count": 3, "negative_count": 2, "positive_avg_confidence": 0.9,
                "negative_avg_confidence": 0.8, "total": 4}"#,
        )
        .unwrap();
        assert_eq!(summary.unknown_count(), 0);
    }
}
