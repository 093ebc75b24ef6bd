//! Ratings API client trait definition.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::types::{
    AccountSnapshot, BulkChanges, BulkRequestSubmission, CompanyCandidate, CompanyDetail,
    CompanyRequest, FindingRecord, FindingsQuery, Folder,
};

/// Errors that can occur when calling the ratings API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found")]
    NotFound,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from the subscribe path, kept separate so callers can
/// distinguish quota exhaustion (abort, no retry) from other failures.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("Subscription quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("Subscription request failed: {0}")]
    Failed(String),
}

impl From<ApiError> for SubscribeError {
    fn from(e: ApiError) -> Self {
        SubscribeError::Failed(e.to_string())
    }
}

/// Outcome of a single subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A new subscription was created by this call.
    Created,
    /// The API reported the subscription already existed.
    AlreadyExisted,
}

/// Trait for the ratings service collaborator.
///
/// All business logic depends on this trait rather than a concrete HTTP
/// client, so tests can substitute a scripted in-memory implementation.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait RatingsApi: Send + Sync {
    /// Search companies by name and/or domain. An empty result list is a
    /// normal response, not an error.
    async fn search_companies(
        &self,
        name: Option<&str>,
        domain: Option<&str>,
    ) -> Result<Vec<CompanyCandidate>, ApiError>;

    /// Fetch the detailed company record, including the ratings series.
    async fn get_company(&self, guid: &str) -> Result<CompanyDetail, ApiError>;

    /// Whether the account currently holds an active subscription for the
    /// company. Snapshot semantics: taken fresh, never cached.
    async fn get_subscription_status(&self, guid: &str) -> Result<bool, ApiError>;

    /// Subscribe a single company under the given folder and type.
    async fn subscribe(
        &self,
        guid: &str,
        folder: &str,
        subscription_type: &str,
    ) -> Result<SubscribeOutcome, SubscribeError>;

    /// Remove the subscription for a single company.
    async fn unsubscribe(&self, guid: &str) -> Result<(), ApiError>;

    /// Subscribe a batch of companies in one call. Per-guid failures are
    /// reported inside the returned change summary.
    async fn bulk_subscribe(
        &self,
        guids: &[String],
        folder: &str,
        subscription_type: &str,
    ) -> Result<BulkChanges, ApiError>;

    /// Unsubscribe a batch of companies in one call.
    async fn bulk_unsubscribe(&self, guids: &[String]) -> Result<BulkChanges, ApiError>;

    /// Fetch raw findings for a company.
    async fn get_findings(
        &self,
        guid: &str,
        query: &FindingsQuery,
    ) -> Result<Vec<FindingRecord>, ApiError>;

    /// List all subscription folders.
    async fn list_folders(&self) -> Result<Vec<Folder>, ApiError>;

    /// Create a new folder with the given name.
    async fn create_folder(&self, name: &str) -> Result<Folder, ApiError>;

    /// List pending onboarding requests for a domain.
    async fn list_company_requests(&self, domain: &str) -> Result<Vec<CompanyRequest>, ApiError>;

    /// Submit a bulk onboarding request (CSV payload, optional folder).
    async fn create_company_request_bulk(
        &self,
        submission: &BulkRequestSubmission,
    ) -> Result<Value, ApiError>;

    /// Submit a single onboarding request. The folder cannot be attached
    /// on this path.
    async fn create_company_request(
        &self,
        domain: &str,
        subscription_type: Option<&str>,
    ) -> Result<Value, ApiError>;

    /// Fetch the authenticated account snapshot (startup check only).
    async fn current_user(&self) -> Result<AccountSnapshot, ApiError>;
}
