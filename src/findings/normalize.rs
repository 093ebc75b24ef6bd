//! Narrative normalization for raw findings.
//!
//! The upstream API returns sparse, heterogeneous detail blocks; this module
//! turns one raw finding into the compact label/details/asset summary shape
//! used in rating payloads.

use crate::ratings_api::{FindingDetails, FindingRecord};

/// Risk vectors whose infection narrative takes precedence when available.
pub const INFECTION_RISK_VECTORS: [&str; 5] = [
    "botnet_infections",
    "spam_propagation",
    "malware_servers",
    "unsolicited_comm",
    "potentially_exploited",
];

/// Collapse internal whitespace runs and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Choose a finding label: details.name, then details.display_name, then
/// the risk vector label, then the raw risk vector slug.
pub fn finding_label(record: &FindingRecord) -> Option<String> {
    let details = &record.details;
    details
        .name
        .clone()
        .or_else(|| details.display_name.clone())
        .or_else(|| record.risk_vector_label.clone())
        .or_else(|| {
            if record.risk_vector.is_empty() {
                None
            } else {
                Some(record.risk_vector.clone())
            }
        })
}

fn base_details_text(details: &FindingDetails) -> Option<String> {
    match (&details.display_name, &details.description) {
        (Some(display_name), Some(description)) => {
            return Some(format!("{} — {}", display_name, description))
        }
        (None, Some(description)) => return Some(description.clone()),
        (Some(display_name), None) => return Some(display_name.clone()),
        (None, None) => {}
    }
    if let Some(searchable) = &details.searchable_details {
        return Some(searchable.clone());
    }
    if let Some(infection) = &details.infection {
        if let Some(family) = &infection.family {
            return Some(format!("Infection: {}", family));
        }
    }
    None
}

fn first_remediation_text(details: &FindingDetails) -> Option<String> {
    details.remediations.iter().find_map(|rem| {
        rem.help_text
            .clone()
            .or_else(|| rem.remediation_tip.clone())
            .or_else(|| rem.message.clone())
            .filter(|t| !t.is_empty())
    })
}

/// Rewrite "Detected service: X, ..." text into "Detected service: X — hint",
/// keeping the service name and dropping trailing detail.
fn rewrite_detected_service(text: &str, hint: &str) -> String {
    match text.split_once(':') {
        Some((_, after)) => {
            let service = after.split(',').next().unwrap_or(after).trim();
            format!("Detected service: {} — {}", service, hint)
        }
        None if text.contains(hint) => text.to_string(),
        None => format!("{} — {}", text, hint),
    }
}

/// Append a remediation hint, preserving existing sentence punctuation and
/// avoiding duplication.
fn append_remediation_hint(text: Option<String>, hint: Option<&str>) -> Option<String> {
    let hint = match hint {
        Some(h) => h,
        None => return text,
    };
    match text {
        Some(text) if text.contains(hint) => Some(text),
        Some(text) if text.ends_with(['.', '!', '?']) => Some(format!("{} {}", text, hint)),
        Some(text) => Some(format!("{}. {}", text, hint)),
        None => Some(hint.to_string()),
    }
}

/// Prefer the infection narrative for infection-style vectors.
fn apply_infection_preference(text: Option<String>, record: &FindingRecord) -> Option<String> {
    if !INFECTION_RISK_VECTORS.contains(&record.risk_vector.as_str()) {
        return text;
    }
    let infection = match &record.details.infection {
        Some(i) => i,
        None => return text,
    };
    let family = infection.family.as_deref();
    let description = infection
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    match (family, description) {
        (Some(family), Some(description)) => {
            Some(format!("Infection: {} — {}", family, description))
        }
        (_, Some(description)) => match text {
            Some(text) if text.contains(description) => Some(text),
            Some(text) => Some(format!("{} — {}", text, description)),
            None => Some(description.to_string()),
        },
        _ => text,
    }
}

/// Build the normalized detection text for a finding.
pub fn detection_text(record: &FindingRecord) -> Option<String> {
    let text = base_details_text(&record.details);
    let remediation = first_remediation_text(&record.details);

    let text = match (&text, &remediation) {
        (Some(t), Some(hint)) if t.starts_with("Detected service:") => {
            Some(rewrite_detected_service(t, hint))
        }
        _ => append_remediation_hint(text, remediation.as_deref()),
    };

    apply_infection_preference(text, record).map(|t| collapse_whitespace(&t))
}

fn primary_port(details: &FindingDetails) -> Option<u16> {
    details.dest_port.or_else(|| details.port_list.first().copied())
}

/// Choose the primary asset: evidence key, then the first detail asset
/// (with port when known), then the first observed IP.
pub fn primary_asset(record: &FindingRecord) -> Option<String> {
    if let Some(evidence_key) = &record.evidence_key {
        if !evidence_key.is_empty() {
            return Some(evidence_key.clone());
        }
    }
    if let Some(first) = record.details.assets.first() {
        if let Some(asset) = &first.asset {
            return Some(match primary_port(&record.details) {
                Some(port) => format!("{}:{}", asset, port),
                None => asset.clone(),
            });
        }
    }
    record.details.observed_ips.first().cloned()
}
