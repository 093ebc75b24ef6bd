//! End-to-end rating, search, subscription-management and onboarding flows.

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{FindingsSettings, SubscriptionSettings};
use crate::findings::{self, TopFindings};
use crate::rating::payload::{
    rating_color, rating_legend, CurrentRating, RatingPayload, SubscriptionStatus,
};
use crate::rating::trend::{trend_1_year, trend_8_weeks};
use crate::ratings_api::{
    ApiError, BulkRequestSubmission, CompanyDetail, FindingsQuery, RatingsApi, SubscribeError,
};
use crate::subscription::{
    BulkMode, BulkOutcome, BulkSubscriptionManager, CleanupFailure, FolderResolver,
    SubscriptionLedger,
};

/// Fields requested from the findings endpoint.
const FINDINGS_FIELDS: &str =
    "severity,severity_category,risk_vector,risk_vector_label,evidence_key,assets,details,\
     first_seen,last_seen";

/// Page size for the findings fetch; ranking happens locally.
const FINDINGS_PAGE_LIMIT: usize = 1000;

/// Errors surfaced by the orchestrated operations.
#[derive(Debug, Error)]
pub enum RatingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Subscription quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    /// The rating fetch itself failed. Cleanup has already run; any cleanup
    /// failures ride along so the caller sees both problems.
    #[error("Rating fetch failed: {message}")]
    RatingFetchFailed {
        message: String,
        cleanup_failures: Vec<CleanupFailure>,
    },

    #[error("API request failed: {0}")]
    Api(#[from] ApiError),
}

/// Normalized bulk action after alias resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Subscribe,
    Unsubscribe,
}

/// Resolve an action alias. Accepted: add/create/subscribe/subscription and
/// remove/delete/unsubscribe.
pub fn normalize_action(raw: &str) -> Result<BulkAction, RatingError> {
    match raw.trim().to_lowercase().as_str() {
        "add" | "create" | "subscribe" | "subscription" => Ok(BulkAction::Subscribe),
        "remove" | "delete" | "unsubscribe" => Ok(BulkAction::Unsubscribe),
        other => Err(RatingError::Validation(format!(
            "unknown action '{}'; accepted values: subscribe (add, create, subscription), \
             unsubscribe (remove, delete)",
            other
        ))),
    }
}

/// Coerce guid input from either a JSON array of strings or a single
/// comma-separated string. Entries are trimmed, empties dropped.
pub fn coerce_guid_list(value: &Value) -> Result<Vec<String>, RatingError> {
    let raw: Vec<String> = match value {
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(RatingError::Validation(format!(
                    "guids must be strings, got: {}",
                    other
                ))),
            })
            .collect::<Result<_, _>>()?,
        other => {
            return Err(RatingError::Validation(format!(
                "guids must be an array or comma-separated string, got: {}",
                other
            )))
        }
    };

    let guids: Vec<String> = raw
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();
    if guids.is_empty() {
        return Err(RatingError::Validation(
            "no company guids provided".to_string(),
        ));
    }
    Ok(guids)
}

/// Per-candidate subscription snapshot in search results.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSnapshot {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
    pub folders: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    /// Display label: "Name (guid)".
    pub label: String,
    pub guid: String,
    pub name: String,
    pub primary_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u64>,
    pub subscription: SubscriptionSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub count: usize,
    pub results: Vec<CandidateSummary>,
    pub search_term: String,
    /// More candidates existed than were enriched with detail fetches.
    pub truncated: bool,
    pub guidance: Vec<String>,
}

/// Composes subscription lifecycle, rating retrieval and findings ranking
/// into the caller-facing operations.
pub struct RatingOrchestrator {
    api: Arc<dyn RatingsApi>,
    subscriptions: SubscriptionSettings,
    findings: FindingsSettings,
}

impl RatingOrchestrator {
    pub fn new(
        api: Arc<dyn RatingsApi>,
        subscriptions: SubscriptionSettings,
        findings: FindingsSettings,
    ) -> Self {
        Self {
            api,
            subscriptions,
            findings,
        }
    }

    fn findings_query(&self) -> FindingsQuery {
        let mut vectors = self.findings.risk_vector_filter.clone();
        if !vectors.iter().any(|v| v == findings::WEB_APPSEC_VECTOR) {
            vectors.push(findings::WEB_APPSEC_VECTOR.to_string());
        }
        FindingsQuery {
            affects_rating: true,
            risk_vector: vectors.join(","),
            fields: FINDINGS_FIELDS.to_string(),
            limit: FINDINGS_PAGE_LIMIT,
        }
    }

    /// Retrieve a company's rating with ranked findings, creating and
    /// cleaning up an ephemeral subscription when needed.
    pub async fn get_company_rating(&self, guid: &str) -> Result<RatingPayload, RatingError> {
        let guid = guid.trim();
        if guid.is_empty() {
            return Err(RatingError::Validation(
                "company guid must not be empty".to_string(),
            ));
        }

        let mut ledger = SubscriptionLedger::new(
            self.api.clone(),
            self.subscriptions.default_folder.clone(),
            self.subscriptions.default_subscription_type.clone(),
        );
        let was_already = ledger.ensure_subscribed(guid).await.map_err(|e| match e {
            SubscribeError::QuotaExceeded(msg) => RatingError::QuotaExceeded(msg),
            SubscribeError::Failed(msg) => RatingError::SubscriptionFailed(msg),
        })?;

        // Fallible middle section; cleanup runs after it on every path.
        let company = self.api.get_company(guid).await;
        let raw_findings = match &company {
            Ok(_) => Some(self.api.get_findings(guid, &self.findings_query()).await),
            Err(_) => None,
        };

        let cleanup = ledger.cleanup().await;

        let company = match company {
            Ok(detail) => detail,
            Err(e) => {
                return Err(RatingError::RatingFetchFailed {
                    message: e.to_string(),
                    cleanup_failures: cleanup.failures,
                })
            }
        };

        let (top_findings, findings_unavailable) = match raw_findings {
            Some(Ok(records)) => (
                findings::rank(&records, self.findings.max_findings),
                false,
            ),
            Some(Err(e)) => {
                warn!(guid, error = %e, "Findings fetch failed, degrading to empty list");
                (TopFindings::unavailable(self.findings.max_findings), true)
            }
            None => (TopFindings::unavailable(self.findings.max_findings), true),
        };

        let today = Utc::now().date_naive();
        let payload = RatingPayload {
            guid: guid.to_string(),
            name: company.name.clone(),
            domain: company.primary_domain.clone(),
            current_rating: company.current_rating.map(|value| CurrentRating {
                value,
                color: rating_color(value).to_string(),
            }),
            rating_date: company.ratings.first().map(|p| p.rating_date.clone()),
            trend_8_weeks: trend_8_weeks(&company.ratings, today),
            trend_1_year: trend_1_year(&company.ratings, today),
            top_findings,
            legend: rating_legend(),
            subscription_status: if was_already {
                SubscriptionStatus::AlreadySubscribed
            } else {
                SubscriptionStatus::EphemeralCleaned
            },
            findings_unavailable,
            cleanup_failures: cleanup.failures,
        };

        info!(
            guid,
            rating = ?payload.current_rating.as_ref().map(|r| r.value),
            findings = payload.top_findings.count,
            "Assembled rating payload"
        );
        Ok(payload)
    }

    /// Search companies and enrich each candidate with detail and folder
    /// membership, degrading per candidate on detail failures.
    ///
    /// Detail fetches need an active subscription, so each one runs inside
    /// an ephemeral subscription that is cleaned up immediately afterwards.
    /// Candidates whose subscription cannot be established keep their search
    /// data. At most `max_findings` candidates are enriched.
    pub async fn search_companies_interactive(
        &self,
        name: Option<&str>,
        domain: Option<&str>,
    ) -> Result<SearchResponse, RatingError> {
        let name = name.map(str::trim).filter(|s| !s.is_empty());
        let domain = domain.map(str::trim).filter(|s| !s.is_empty());
        if name.is_none() && domain.is_none() {
            return Err(RatingError::Validation(
                "provide a company name or domain to search for".to_string(),
            ));
        }
        let search_term = domain.or(name).unwrap_or_default().to_string();

        let candidates = self.api.search_companies(name, domain).await?;
        let detail_limit = self.findings.max_findings;
        let truncated = candidates.len() > detail_limit;

        let folders = self.api.list_folders().await.unwrap_or_else(|e| {
            warn!(error = %e, "Folder listing failed during search, memberships omitted");
            Vec::new()
        });
        let memberships = |guid: &str| -> Vec<String> {
            folders
                .iter()
                .filter(|f| f.companies.iter().any(|c| c == guid))
                .map(|f| f.name.clone())
                .collect()
        };

        let mut results = Vec::new();
        for candidate in candidates.into_iter().take(detail_limit) {
            let folders = memberships(&candidate.guid);
            let summary = match self.fetch_candidate_detail(&candidate.guid).await {
                Some(detail) => candidate_from_detail(&detail, folders),
                None => CandidateSummary {
                    label: format!("{} ({})", candidate.name, candidate.guid),
                    guid: candidate.guid.clone(),
                    name: candidate.name.clone(),
                    primary_domain: candidate.primary_domain.clone(),
                    website: candidate.website.clone(),
                    description: candidate.description.clone(),
                    employee_count: candidate.employee_count,
                    subscription: SubscriptionSnapshot {
                        active: !folders.is_empty(),
                        subscription_type: None,
                        folders,
                        subscription_end_date: None,
                    },
                },
            };
            results.push(summary);
        }

        let mut guidance = Vec::new();
        if results.is_empty() {
            guidance.push(
                "No companies matched; refine the name or domain, or use company.request to \
                 onboard a new company."
                    .to_string(),
            );
        } else {
            guidance
                .push("Use company.rating with one of the returned guids to fetch a rating.".to_string());
        }
        if let (Some(folder), Some(sub_type)) = (
            &self.subscriptions.default_folder,
            &self.subscriptions.default_subscription_type,
        ) {
            guidance.push(format!(
                "New subscriptions default to folder '{}' with type '{}'.",
                folder, sub_type
            ));
        }

        Ok(SearchResponse {
            count: results.len(),
            results,
            search_term,
            truncated,
            guidance,
        })
    }

    /// Fetch one candidate's detail under an ephemeral subscription,
    /// cleaning up afterwards. Returns `None` when the subscription or the
    /// fetch fails; the caller falls back to search data.
    async fn fetch_candidate_detail(&self, guid: &str) -> Option<CompanyDetail> {
        let mut ledger = SubscriptionLedger::new(
            self.api.clone(),
            self.subscriptions.default_folder.clone(),
            self.subscriptions.default_subscription_type.clone(),
        );
        if let Err(e) = ledger.ensure_subscribed(guid).await {
            warn!(guid, error = %e, "Subscription unavailable, skipping detail enrichment");
            return None;
        }

        let detail = self.api.get_company(guid).await;
        let cleanup = ledger.cleanup().await;
        if !cleanup.is_clean() {
            warn!(guid, "Ephemeral subscription cleanup failed during search");
        }

        match detail {
            Ok(detail) => Some(detail),
            Err(e) => {
                warn!(guid, error = %e, "Detail fetch failed, using search data only");
                None
            }
        }
    }

    /// Apply an explicit bulk subscription change. Subscriptions created
    /// here are persistent and owned by the caller.
    pub async fn manage_subscriptions(
        &self,
        action: &str,
        guids: &Value,
        folder: Option<&str>,
        dry_run: bool,
    ) -> Result<BulkOutcome, RatingError> {
        let action = normalize_action(action)?;
        let guids = coerce_guid_list(guids)?;
        let mode = BulkMode::from_dry_run(dry_run);
        let manager = BulkSubscriptionManager::new(self.api.clone());

        match action {
            BulkAction::Subscribe => {
                let folder = folder
                    .map(str::to_string)
                    .or_else(|| self.subscriptions.default_folder.clone())
                    .ok_or_else(|| {
                        RatingError::Validation(
                            "no folder given and [subscriptions].default_folder is not configured"
                                .to_string(),
                        )
                    })?;
                let sub_type = self
                    .subscriptions
                    .default_subscription_type
                    .clone()
                    .ok_or_else(|| {
                        RatingError::Validation(
                            "[subscriptions].default_subscription_type is not configured"
                                .to_string(),
                        )
                    })?;
                Ok(manager.subscribe(&guids, &folder, &sub_type, mode).await?)
            }
            BulkAction::Unsubscribe => Ok(manager.unsubscribe(&guids, mode).await?),
        }
    }

    /// Submit a company onboarding request for a domain not yet covered by
    /// the ratings service.
    pub async fn request_company(
        &self,
        domain: &str,
        company_name: Option<&str>,
        folder: Option<&str>,
        dry_run: bool,
    ) -> Result<Value, RatingError> {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() {
            return Err(RatingError::Validation(
                "domain must not be empty".to_string(),
            ));
        }

        let folder_name = folder
            .map(str::to_string)
            .or_else(|| self.subscriptions.default_folder.clone())
            .ok_or_else(|| {
                RatingError::Validation(
                    "no folder given and [subscriptions].default_folder is not configured"
                        .to_string(),
                )
            })?;
        let resolver = FolderResolver::new(self.api.clone());
        let folder = resolver.resolve(&folder_name).await?.ok_or_else(|| {
            RatingError::Validation(format!(
                "folder '{}' does not exist; check the name with company.search first",
                folder_name
            ))
        })?;

        let pending = self.api.list_company_requests(&domain).await?;
        if !pending.is_empty() {
            return Ok(json!({
                "status": "already_requested",
                "domain": domain,
                "requests": pending,
            }));
        }

        let name = company_name.map(str::trim).unwrap_or("");
        let submission = BulkRequestSubmission {
            file: format!("domain,company_name\n{},{}\n", domain, name),
            folder_guid: Some(folder.guid.clone()),
            subscription_type: self.subscriptions.default_subscription_type.clone(),
        };

        if dry_run {
            return Ok(json!({
                "status": "dry_run",
                "domain": domain,
                "folder": folder.name,
                "payload": submission,
            }));
        }

        match self.api.create_company_request_bulk(&submission).await {
            Ok(ack) => Ok(json!({
                "status": "submitted",
                "domain": domain,
                "folder": folder.name,
                "response": ack,
            })),
            Err(bulk_err) => {
                warn!(error = %bulk_err, "Bulk company request failed, falling back to single request");
                let ack = self
                    .api
                    .create_company_request(
                        &domain,
                        self.subscriptions.default_subscription_type.as_deref(),
                    )
                    .await?;
                Ok(json!({
                    "status": "submitted_without_folder",
                    "domain": domain,
                    "warning": format!(
                        "bulk request failed ({}); submitted a single request instead, which \
                         cannot be attached to folder '{}'",
                        bulk_err, folder.name
                    ),
                    "response": ack,
                }))
            }
        }
    }
}

fn candidate_from_detail(detail: &CompanyDetail, folders: Vec<String>) -> CandidateSummary {
    CandidateSummary {
        label: format!("{} ({})", detail.name, detail.guid),
        guid: detail.guid.clone(),
        name: detail.name.clone(),
        primary_domain: detail.primary_domain.clone(),
        website: detail.homepage.clone(),
        description: detail.description.clone(),
        employee_count: detail.people_count,
        subscription: SubscriptionSnapshot {
            active: detail.in_spm_portfolio || !folders.is_empty(),
            subscription_type: detail.subscription_type.clone(),
            folders,
            subscription_end_date: detail.subscription_end_date.clone(),
        },
    }
}
