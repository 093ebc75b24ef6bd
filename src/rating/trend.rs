//! Rating trend computation over a company's dated rating history.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::ratings_api::RatingPoint;

const EIGHT_WEEKS_DAYS: i64 = 56;
const ONE_YEAR_DAYS: i64 = 365;

/// One classified trend window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    /// Regression slope projected over the window, one decimal.
    pub delta: f64,
    pub classification: String,
}

impl Trend {
    fn insufficient() -> Self {
        Self {
            delta: 0.0,
            classification: "insufficient data".to_string(),
        }
    }
}

#[derive(Clone, Copy)]
enum Bucket {
    Week,
    Month,
}

impl Bucket {
    fn key(self, date: NaiveDate) -> (i32, u32) {
        match self {
            Bucket::Week => {
                let week = date.iso_week();
                (week.year(), week.week())
            }
            Bucket::Month => (date.year(), date.month()),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Reduce the history to one representative rating per bucket, keeping the
/// latest point in each bucket, returned oldest first.
fn bucketize(
    history: &[RatingPoint],
    today: NaiveDate,
    window_days: i64,
    bucket: Bucket,
) -> Vec<f64> {
    let cutoff = today - Duration::days(window_days);
    let mut latest: Vec<(NaiveDate, (i32, u32), f64)> = Vec::new();

    for point in history {
        let date = match parse_date(&point.rating_date) {
            Some(d) if d >= cutoff && d <= today => d,
            _ => continue,
        };
        let key = bucket.key(date);
        match latest.iter_mut().find(|(_, k, _)| *k == key) {
            Some(entry) if date > entry.0 => *entry = (date, key, point.rating),
            Some(_) => {}
            None => latest.push((date, key, point.rating)),
        }
    }

    latest.sort_by_key(|(date, _, _)| *date);
    latest.into_iter().map(|(_, _, rating)| rating).collect()
}

/// Least-squares slope of ratings over their bucket indices.
fn slope(ratings: &[f64]) -> f64 {
    let n = ratings.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ratings.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in ratings.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

fn classify(delta: f64) -> &'static str {
    if delta >= 40.0 {
        "improving"
    } else if delta >= 20.0 {
        "slightly improving"
    } else if delta <= -40.0 {
        "declining"
    } else if delta <= -20.0 {
        "slightly declining"
    } else {
        "stable"
    }
}

fn trend_over(history: &[RatingPoint], today: NaiveDate, window_days: i64, bucket: Bucket) -> Trend {
    let ratings = bucketize(history, today, window_days, bucket);
    if ratings.len() < 2 {
        return Trend::insufficient();
    }
    let span = (ratings.len() - 1) as f64;
    let delta = (slope(&ratings) * span * 10.0).round() / 10.0;
    Trend {
        delta,
        classification: classify(delta).to_string(),
    }
}

/// 8-week trend: weekly buckets over the last 56 days.
pub fn trend_8_weeks(history: &[RatingPoint], today: NaiveDate) -> Trend {
    trend_over(history, today, EIGHT_WEEKS_DAYS, Bucket::Week)
}

/// 1-year trend: monthly buckets over the last 365 days.
pub fn trend_1_year(history: &[RatingPoint], today: NaiveDate) -> Trend {
    trend_over(history, today, ONE_YEAR_DAYS, Bucket::Month)
}
