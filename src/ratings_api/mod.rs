//! Client boundary for the third-party security-rating REST API.

mod api;
mod http;
mod types;

pub use api::{ApiError, RatingsApi, SubscribeError, SubscribeOutcome};
#[cfg(feature = "mock")]
pub use api::MockRatingsApi;
pub use http::HttpRatingsApi;
pub use types::{
    AccountSnapshot, AssetImportance, AssetRef, BulkChanges, BulkError, BulkRequestSubmission,
    CompanyCandidate, CompanyDetail, CompanyRequest, Cvss, FindingDetails, FindingRecord,
    FindingsQuery, Folder, Infection, RatingPoint, Remediation,
};
