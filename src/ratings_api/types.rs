//! Wire types for the ratings API.
//!
//! The upstream service returns loosely structured JSON; everything is
//! deserialized into these explicit shapes at the client boundary so the
//! rest of the crate never inspects raw `serde_json::Value` payloads.

use serde::{Deserialize, Serialize};

/// One entry from a company search response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompanyCandidate {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub primary_domain: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub employee_count: Option<u64>,
}

/// Detailed company record, including the dated ratings series.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompanyDetail {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub primary_domain: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub people_count: Option<u64>,
    #[serde(default)]
    pub current_rating: Option<f64>,
    #[serde(default)]
    pub ratings: Vec<RatingPoint>,
    #[serde(default)]
    pub subscription_type: Option<String>,
    #[serde(default)]
    pub in_spm_portfolio: bool,
    #[serde(default)]
    pub subscription_end_date: Option<String>,
}

/// One dated point of a company's rating history.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RatingPoint {
    /// Date in `YYYY-MM-DD` form.
    pub rating_date: String,
    pub rating: f64,
}

/// A subscription folder ("portfolio").
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Folder {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub name: String,
    /// Guids of the companies currently filed under this folder.
    #[serde(default)]
    pub companies: Vec<String>,
}

/// One raw finding as returned by the findings endpoint.
///
/// Most fields are optional in the upstream schema; the ranking and
/// normalization code treats absence as "unknown" rather than an error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FindingRecord {
    /// Severity category slug: severe, material, moderate, minor, informational.
    #[serde(default)]
    pub severity_category: Option<String>,
    /// Numeric severity, when the API reports one directly.
    #[serde(default)]
    pub severity: Option<f64>,
    #[serde(default)]
    pub risk_vector: String,
    #[serde(default)]
    pub risk_vector_label: Option<String>,
    #[serde(default)]
    pub evidence_key: Option<String>,
    #[serde(default)]
    pub assets: Option<AssetImportance>,
    #[serde(default)]
    pub details: FindingDetails,
    #[serde(default)]
    pub first_seen: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
}

/// Importance summary attached to a finding's affected assets.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AssetImportance {
    #[serde(default)]
    pub combined_importance: Option<f64>,
    #[serde(default)]
    pub importance: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FindingDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub searchable_details: Option<String>,
    #[serde(default)]
    pub severity: Option<f64>,
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub cvss: Option<Cvss>,
    #[serde(default)]
    pub infection: Option<Infection>,
    #[serde(default)]
    pub remediations: Vec<Remediation>,
    #[serde(default)]
    pub assets: Vec<AssetRef>,
    #[serde(default)]
    pub observed_ips: Vec<String>,
    #[serde(default)]
    pub dest_port: Option<u16>,
    #[serde(default)]
    pub port_list: Vec<u16>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Cvss {
    #[serde(default)]
    pub base: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Infection {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Remediation {
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub remediation_tip: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AssetRef {
    #[serde(default)]
    pub asset: Option<String>,
}

/// Query parameters for the findings endpoint.
#[derive(Debug, Clone)]
pub struct FindingsQuery {
    pub affects_rating: bool,
    /// Comma-joined risk vector slugs.
    pub risk_vector: String,
    /// Explicit fields list requested from the API.
    pub fields: String,
    /// Page size cap.
    pub limit: usize,
}

/// Per-guid change summary from a bulk subscription call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BulkChanges {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub deleted: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub errors: Vec<BulkError>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BulkError {
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl BulkChanges {
    /// Find the error message reported for a specific guid, if any.
    pub fn error_for(&self, guid: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.guid.as_deref() == Some(guid) || e.guid.is_none())
            .map(|e| e.message.as_str())
    }
}

/// A pending company onboarding request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompanyRequest {
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub requested_at: Option<String>,
}

/// Payload for a bulk company onboarding submission.
#[derive(Debug, Clone, Serialize)]
pub struct BulkRequestSubmission {
    /// CSV body: header row plus one `domain,company_name` row.
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
}

/// Snapshot of the authenticated account, used by the startup check.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccountSnapshot {
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}
