//! Rating payload assembly: color, legend, subscription status.

use serde::Serialize;

use crate::findings::TopFindings;
use crate::rating::trend::Trend;
use crate::subscription::CleanupFailure;

const GREEN_THRESHOLD: f64 = 740.0;
const YELLOW_THRESHOLD: f64 = 630.0;

/// Traffic-light color for a rating value.
pub fn rating_color(rating: f64) -> &'static str {
    if rating >= GREEN_THRESHOLD {
        "green"
    } else if rating >= YELLOW_THRESHOLD {
        "yellow"
    } else {
        "red"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentRating {
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegendEntry {
    pub color: &'static str,
    pub range: &'static str,
    pub meaning: &'static str,
}

/// Static rating scale legend embedded in every payload.
pub fn rating_legend() -> Vec<LegendEntry> {
    vec![
        LegendEntry {
            color: "red",
            range: "250-629",
            meaning: "elevated risk",
        },
        LegendEntry {
            color: "yellow",
            range: "630-739",
            meaning: "moderate risk",
        },
        LegendEntry {
            color: "green",
            range: "740-900",
            meaning: "lower risk",
        },
    ]
}

/// How rating access was obtained for this payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Pre-existing subscription; nothing was created or removed.
    AlreadySubscribed,
    /// An ephemeral subscription was created for this call and cleaned up.
    EphemeralCleaned,
}

/// The complete `company.rating` response payload.
#[derive(Debug, Clone, Serialize)]
pub struct RatingPayload {
    pub guid: String,
    pub name: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_rating: Option<CurrentRating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_date: Option<String>,
    pub trend_8_weeks: Trend,
    pub trend_1_year: Trend,
    pub top_findings: TopFindings,
    pub legend: Vec<LegendEntry>,
    pub subscription_status: SubscriptionStatus,
    pub findings_unavailable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cleanup_failures: Vec<CleanupFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_boundaries() {
        assert_eq!(rating_color(900.0), "green");
        assert_eq!(rating_color(740.0), "green");
        assert_eq!(rating_color(739.0), "yellow");
        assert_eq!(rating_color(630.0), "yellow");
        assert_eq!(rating_color(629.0), "red");
        assert_eq!(rating_color(250.0), "red");
    }

    #[test]
    fn test_legend_covers_full_scale() {
        let legend = rating_legend();
        assert_eq!(legend.len(), 3);
        assert_eq!(legend[0].range, "250-629");
        assert_eq!(legend[2].range, "740-900");
    }

    #[test]
    fn test_payload_serialization_skips_empty_cleanup_failures() {
        let payload = RatingPayload {
            guid: "g-1".to_string(),
            name: "Acme".to_string(),
            domain: "acme.example".to_string(),
            current_rating: Some(CurrentRating {
                value: 700.0,
                color: rating_color(700.0).to_string(),
            }),
            rating_date: None,
            trend_8_weeks: Trend {
                delta: 0.0,
                classification: "stable".to_string(),
            },
            trend_1_year: Trend {
                delta: 0.0,
                classification: "stable".to_string(),
            },
            top_findings: TopFindings::unavailable(10),
            legend: rating_legend(),
            subscription_status: SubscriptionStatus::EphemeralCleaned,
            findings_unavailable: true,
            cleanup_failures: Vec::new(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("cleanup_failures").is_none());
        assert!(json.get("rating_date").is_none());
        assert_eq!(json["subscription_status"], "ephemeral_cleaned");
        assert_eq!(json["current_rating"]["color"], "yellow");
        assert_eq!(json["findings_unavailable"], true);
    }
}
