//! Severity-ranked findings selection.
//!
//! Implements the cascading relaxed filter: start with severe/material
//! findings, widen to moderate when the pool is thin, then supplement with
//! web application security findings (and finally anything left) until the
//! minimum count is reached. Pure: no I/O, deterministic for equal inputs.

use serde::Serialize;

use crate::ratings_api::FindingRecord;

use super::normalize;

/// Minimum number of findings before the filter relaxes to the next stage.
pub const SELECTION_THRESHOLD: usize = 3;

/// Category supplemented in the final cascade stage.
pub const WEB_APPSEC_VECTOR: &str = "web_appsec";

const SEVERITY_RANK_SEVERE: i32 = 4;
const SEVERITY_RANK_MATERIAL: i32 = 3;
const SEVERITY_RANK_MODERATE: i32 = 2;
const SEVERITY_RANK_UNKNOWN: i32 = -1;

const SEVERITY_SCORE_UNKNOWN: f64 = -1.0;
const TIMESTAMP_INVALID: i64 = i64::MIN;

/// One presentation-ready finding.
#[derive(Debug, Clone, Serialize)]
pub struct TopFinding {
    /// 1-based rank within the selection.
    pub top: usize,
    pub finding: Option<String>,
    pub details: Option<String>,
    pub asset: Option<String>,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
}

/// Which cascade stage produced the selection.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FilterPolicy {
    /// Minimum severity included ("material" or "moderate"); severe is
    /// always included.
    pub severity_floor: String,
    /// Vectors appended by the supplement stage, if any.
    pub supplements: Vec<String>,
    pub max_items: usize,
    /// "strict" | "relaxed" | "relaxed+web_appsec" | "unavailable".
    pub profile: String,
}

/// The bounded, ordered findings block attached to a rating payload.
#[derive(Debug, Clone, Serialize)]
pub struct TopFindings {
    pub policy: FilterPolicy,
    pub count: usize,
    pub findings: Vec<TopFinding>,
}

impl TopFindings {
    /// Placeholder block used when the findings fetch failed.
    pub fn unavailable(max_items: usize) -> Self {
        Self {
            policy: FilterPolicy {
                severity_floor: "material".to_string(),
                supplements: Vec::new(),
                max_items,
                profile: "unavailable".to_string(),
            },
            count: 0,
            findings: Vec::new(),
        }
    }
}

/// Ordinal rank of a severity category slug. Unknown slugs rank below
/// informational so malformed data never displaces real findings.
fn severity_rank(category: Option<&str>) -> i32 {
    match category.map(str::to_lowercase).as_deref() {
        Some("severe") => SEVERITY_RANK_SEVERE,
        Some("material") => SEVERITY_RANK_MATERIAL,
        Some("moderate") => SEVERITY_RANK_MODERATE,
        Some("minor") | Some("low") => 1,
        Some("informational") | Some("info") => 0,
        _ => SEVERITY_RANK_UNKNOWN,
    }
}

/// Numeric severity tiebreak inside equal categories: the finding's own
/// severity number, else details severity/grade, else the CVSS base score.
fn severity_score(record: &FindingRecord) -> f64 {
    record
        .severity
        .or(record.details.severity)
        .or(record.details.grade)
        .or_else(|| record.details.cvss.as_ref().and_then(|c| c.base))
        .unwrap_or(SEVERITY_SCORE_UNKNOWN)
}

fn asset_importance(record: &FindingRecord) -> f64 {
    record
        .assets
        .as_ref()
        .and_then(|a| a.combined_importance.or(a.importance))
        .unwrap_or(0.0)
}

/// Parse a last-seen timestamp into epoch seconds for ordering. Accepts the
/// date and datetime shapes the API emits; anything else sorts last.
fn timestamp_secs(value: Option<&str>) -> i64 {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return TIMESTAMP_INVALID,
    };
    if let Ok(date) = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return dt.and_utc().timestamp();
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return dt.timestamp();
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(value, format) {
            return dt.and_utc().timestamp();
        }
    }
    TIMESTAMP_INVALID
}

fn compare_findings(a: &FindingRecord, b: &FindingRecord) -> std::cmp::Ordering {
    severity_rank(b.severity_category.as_deref())
        .cmp(&severity_rank(a.severity_category.as_deref()))
        .then_with(|| severity_score(b).total_cmp(&severity_score(a)))
        .then_with(|| asset_importance(b).total_cmp(&asset_importance(a)))
        .then_with(|| {
            timestamp_secs(b.last_seen.as_deref()).cmp(&timestamp_secs(a.last_seen.as_deref()))
        })
        .then_with(|| a.risk_vector.cmp(&b.risk_vector))
}

/// Select, order and normalize the top findings from a raw findings set.
pub fn rank(findings: &[FindingRecord], max_findings: usize) -> TopFindings {
    let mut severity_floor = "material";
    let mut profile = "strict";
    let mut supplements: Vec<String> = Vec::new();

    // Stage 1: severe and material only.
    let mut pool: Vec<&FindingRecord> = findings
        .iter()
        .filter(|f| severity_rank(f.severity_category.as_deref()) >= SEVERITY_RANK_MATERIAL)
        .collect();

    // Stage 2: widen to moderate.
    if pool.len() < SELECTION_THRESHOLD {
        severity_floor = "moderate";
        profile = "relaxed";
        pool.extend(
            findings
                .iter()
                .filter(|f| severity_rank(f.severity_category.as_deref()) == SEVERITY_RANK_MODERATE),
        );
    }

    // Stage 3: supplement with web_appsec findings regardless of severity,
    // then with whatever remains, until the threshold is met or the set is
    // exhausted. Moderate and web_appsec candidates take priority over
    // arbitrary leftovers.
    if pool.len() < SELECTION_THRESHOLD {
        profile = "relaxed+web_appsec";
        supplements.push(WEB_APPSEC_VECTOR.to_string());
        let mut remainder: Vec<&FindingRecord> = Vec::new();
        for finding in findings {
            if pool.iter().any(|p| std::ptr::eq(*p, finding)) {
                continue;
            }
            if finding.risk_vector == WEB_APPSEC_VECTOR {
                if pool.len() < SELECTION_THRESHOLD {
                    pool.push(finding);
                }
            } else {
                remainder.push(finding);
            }
        }
        for finding in remainder {
            if pool.len() >= SELECTION_THRESHOLD {
                break;
            }
            pool.push(finding);
        }
    }

    pool.sort_by(|a, b| compare_findings(a, b));
    pool.truncate(max_findings);

    let selected: Vec<TopFinding> = pool
        .iter()
        .enumerate()
        .map(|(idx, record)| TopFinding {
            top: idx + 1,
            finding: normalize::finding_label(record),
            details: normalize::detection_text(record),
            asset: normalize::primary_asset(record),
            first_seen: record.first_seen.clone(),
            last_seen: record.last_seen.clone(),
        })
        .collect();

    TopFindings {
        policy: FilterPolicy {
            severity_floor: severity_floor.to_string(),
            supplements,
            max_items: max_findings,
            profile: profile.to_string(),
        },
        count: selected.len(),
        findings: selected,
    }
}
