//! Per-operation subscription ledger.
//!
//! One ledger instance lives for exactly one logical operation. It records
//! which companies were already accessible and which were granted access
//! ephemerally, and guarantees the latter are removed before the operation
//! returns. Nothing here is cached across operations.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::ratings_api::{RatingsApi, SubscribeError, SubscribeOutcome};

/// Per-guid subscription state for the current operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    NotSubscribed,
    /// Pre-existing subscription, externally owned; cleanup never touches it.
    AlreadySubscribed,
    /// Created by this operation; must be removed before the operation ends.
    EphemerallySubscribed,
    /// Terminal: the ephemeral subscription was removed.
    CleanedUp,
}

/// One unsubscribe failure from a cleanup pass.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupFailure {
    pub guid: String,
    pub message: String,
}

/// Outcome of a cleanup pass. A lingering ephemeral subscription is a
/// correctness issue, so failures are reported even on otherwise
/// successful operations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Tracks ephemeral subscription ownership for one operation.
pub struct SubscriptionLedger {
    api: Arc<dyn RatingsApi>,
    default_folder: Option<String>,
    default_type: Option<String>,
    entries: HashMap<String, SubscriptionState>,
}

impl SubscriptionLedger {
    pub fn new(
        api: Arc<dyn RatingsApi>,
        default_folder: Option<String>,
        default_type: Option<String>,
    ) -> Self {
        Self {
            api,
            default_folder,
            default_type,
            entries: HashMap::new(),
        }
    }

    /// Current ledger state for a guid.
    pub fn state(&self, guid: &str) -> SubscriptionState {
        self.entries
            .get(guid)
            .copied()
            .unwrap_or(SubscriptionState::NotSubscribed)
    }

    /// Guarantee the company is subscribed before data retrieval. Returns
    /// whether the subscription already existed.
    ///
    /// On quota exhaustion or any subscribe failure nothing was created, so
    /// the entry stays `NotSubscribed` and no cleanup is required.
    pub async fn ensure_subscribed(&mut self, guid: &str) -> Result<bool, SubscribeError> {
        let already = self
            .api
            .get_subscription_status(guid)
            .await
            .map_err(SubscribeError::from)?;
        if already {
            self.entries
                .insert(guid.to_string(), SubscriptionState::AlreadySubscribed);
            return Ok(true);
        }

        let folder = self.default_folder.as_deref().ok_or_else(|| {
            SubscribeError::Failed(
                "default_folder is not configured; set [subscriptions].default_folder".to_string(),
            )
        })?;
        let subscription_type = self.default_type.as_deref().ok_or_else(|| {
            SubscribeError::Failed(
                "default_subscription_type is not configured; set \
                 [subscriptions].default_subscription_type"
                    .to_string(),
            )
        })?;

        match self.api.subscribe(guid, folder, subscription_type).await? {
            SubscribeOutcome::Created => {
                info!(guid, "Created ephemeral subscription");
                self.entries
                    .insert(guid.to_string(), SubscriptionState::EphemerallySubscribed);
                Ok(false)
            }
            // Race between the status check and the subscribe call: the
            // subscription exists, we do not own it.
            SubscribeOutcome::AlreadyExisted => {
                self.entries
                    .insert(guid.to_string(), SubscriptionState::AlreadySubscribed);
                Ok(true)
            }
        }
    }

    /// Remove every ephemeral subscription this operation created.
    ///
    /// Idempotent: already cleaned or pre-existing entries are untouched. A
    /// failed unsubscribe leaves the entry `EphemerallySubscribed` and is
    /// reported, not swallowed.
    pub async fn cleanup(&mut self) -> CleanupReport {
        let ephemeral: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, state)| **state == SubscriptionState::EphemerallySubscribed)
            .map(|(guid, _)| guid.clone())
            .collect();

        let mut report = CleanupReport::default();
        for guid in ephemeral {
            match self.api.unsubscribe(&guid).await {
                Ok(()) => {
                    info!(guid, "Removed ephemeral subscription");
                    self.entries.insert(guid, SubscriptionState::CleanedUp);
                }
                Err(e) => {
                    warn!(guid, error = %e, "Failed to remove ephemeral subscription");
                    report.failures.push(CleanupFailure {
                        guid,
                        message: e.to_string(),
                    });
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratings_api::ApiError;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Minimal scripted collaborator for ledger tests.
    struct FakeApi {
        subscribed: Vec<String>,
        subscribe_result: Mutex<Option<Result<SubscribeOutcome, SubscribeError>>>,
        unsubscribe_fails: bool,
        subscribe_calls: AtomicUsize,
        unsubscribe_calls: AtomicUsize,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                subscribed: Vec::new(),
                subscribe_result: Mutex::new(Some(Ok(SubscribeOutcome::Created))),
                unsubscribe_fails: false,
                subscribe_calls: AtomicUsize::new(0),
                unsubscribe_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RatingsApi for FakeApi {
        async fn search_companies(
            &self,
            _: Option<&str>,
            _: Option<&str>,
        ) -> Result<Vec<crate::ratings_api::CompanyCandidate>, ApiError> {
            unimplemented!()
        }
        async fn get_company(
            &self,
            _: &str,
        ) -> Result<crate::ratings_api::CompanyDetail, ApiError> {
            unimplemented!()
        }
        async fn get_subscription_status(&self, guid: &str) -> Result<bool, ApiError> {
            Ok(self.subscribed.iter().any(|g| g == guid))
        }
        async fn subscribe(
            &self,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<SubscribeOutcome, SubscribeError> {
            self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
            self.subscribe_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Ok(SubscribeOutcome::Created))
        }
        async fn unsubscribe(&self, _: &str) -> Result<(), ApiError> {
            self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
            if self.unsubscribe_fails {
                Err(ApiError::Api {
                    status: 500,
                    message: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }
        async fn bulk_subscribe(
            &self,
            _: &[String],
            _: &str,
            _: &str,
        ) -> Result<crate::ratings_api::BulkChanges, ApiError> {
            unimplemented!()
        }
        async fn bulk_unsubscribe(
            &self,
            _: &[String],
        ) -> Result<crate::ratings_api::BulkChanges, ApiError> {
            unimplemented!()
        }
        async fn get_findings(
            &self,
            _: &str,
            _: &crate::ratings_api::FindingsQuery,
        ) -> Result<Vec<crate::ratings_api::FindingRecord>, ApiError> {
            unimplemented!()
        }
        async fn list_folders(&self) -> Result<Vec<crate::ratings_api::Folder>, ApiError> {
            unimplemented!()
        }
        async fn create_folder(&self, _: &str) -> Result<crate::ratings_api::Folder, ApiError> {
            unimplemented!()
        }
        async fn list_company_requests(
            &self,
            _: &str,
        ) -> Result<Vec<crate::ratings_api::CompanyRequest>, ApiError> {
            unimplemented!()
        }
        async fn create_company_request_bulk(
            &self,
            _: &crate::ratings_api::BulkRequestSubmission,
        ) -> Result<Value, ApiError> {
            unimplemented!()
        }
        async fn create_company_request(
            &self,
            _: &str,
            _: Option<&str>,
        ) -> Result<Value, ApiError> {
            unimplemented!()
        }
        async fn current_user(&self) -> Result<crate::ratings_api::AccountSnapshot, ApiError> {
            unimplemented!()
        }
    }

    fn ledger(api: Arc<FakeApi>) -> SubscriptionLedger {
        SubscriptionLedger::new(
            api,
            Some("Vendors".to_string()),
            Some("continuous_monitoring".to_string()),
        )
    }

    #[tokio::test]
    async fn test_ensure_subscribed_creates_ephemeral() {
        let api = Arc::new(FakeApi::new());
        let mut ledger = ledger(api.clone());

        let already = ledger.ensure_subscribed("g-1").await.unwrap();
        assert!(!already);
        assert_eq!(ledger.state("g-1"), SubscriptionState::EphemerallySubscribed);
        assert_eq!(api.subscribe_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ensure_subscribed_preexisting_never_subscribes() {
        let mut api = FakeApi::new();
        api.subscribed = vec!["g-2".to_string()];
        let api = Arc::new(api);
        let mut ledger = ledger(api.clone());

        let already = ledger.ensure_subscribed("g-2").await.unwrap();
        assert!(already);
        assert_eq!(ledger.state("g-2"), SubscriptionState::AlreadySubscribed);
        assert_eq!(api.subscribe_calls.load(Ordering::SeqCst), 0);

        // Cleanup is a no-op for pre-existing subscriptions.
        let report = ledger.cleanup().await;
        assert!(report.is_clean());
        assert_eq!(api.unsubscribe_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.state("g-2"), SubscriptionState::AlreadySubscribed);
    }

    #[tokio::test]
    async fn test_subscribe_race_already_existed() {
        let api = FakeApi::new();
        *api.subscribe_result.lock().unwrap() = Some(Ok(SubscribeOutcome::AlreadyExisted));
        let api = Arc::new(api);
        let mut ledger = ledger(api.clone());

        let already = ledger.ensure_subscribed("g-3").await.unwrap();
        assert!(already);
        assert_eq!(ledger.state("g-3"), SubscriptionState::AlreadySubscribed);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_leaves_not_subscribed() {
        let api = FakeApi::new();
        *api.subscribe_result.lock().unwrap() =
            Some(Err(SubscribeError::QuotaExceeded("quota reached".to_string())));
        let api = Arc::new(api);
        let mut ledger = ledger(api.clone());

        let err = ledger.ensure_subscribed("g-4").await.unwrap_err();
        assert!(matches!(err, SubscribeError::QuotaExceeded(_)));
        assert_eq!(ledger.state("g-4"), SubscriptionState::NotSubscribed);

        // Nothing was created, so cleanup has nothing to do.
        let report = ledger.cleanup().await;
        assert!(report.is_clean());
        assert_eq!(api.unsubscribe_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let api = Arc::new(FakeApi::new());
        let mut ledger = ledger(api.clone());

        ledger.ensure_subscribed("g-5").await.unwrap();
        let report = ledger.cleanup().await;
        assert!(report.is_clean());
        assert_eq!(ledger.state("g-5"), SubscriptionState::CleanedUp);
        assert_eq!(api.unsubscribe_calls.load(Ordering::SeqCst), 1);

        // Second pass issues no further calls.
        let report = ledger.cleanup().await;
        assert!(report.is_clean());
        assert_eq!(api.unsubscribe_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cleanup_failure_is_reported_and_state_kept() {
        let mut api = FakeApi::new();
        api.unsubscribe_fails = true;
        let api = Arc::new(api);
        let mut ledger = ledger(api.clone());

        ledger.ensure_subscribed("g-6").await.unwrap();
        let report = ledger.cleanup().await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].guid, "g-6");
        // Entry stays ephemeral so a later pass could retry.
        assert_eq!(ledger.state("g-6"), SubscriptionState::EphemerallySubscribed);
    }

    #[tokio::test]
    async fn test_missing_defaults_fail_only_when_subscribe_needed() {
        let api = Arc::new(FakeApi::new());
        let mut ledger = SubscriptionLedger::new(api.clone(), None, None);

        let err = ledger.ensure_subscribed("g-7").await.unwrap_err();
        assert!(matches!(err, SubscribeError::Failed(_)));
        assert_eq!(api.subscribe_calls.load(Ordering::SeqCst), 0);

        // A pre-existing subscription does not need the defaults.
        let mut api = FakeApi::new();
        api.subscribed = vec!["g-8".to_string()];
        let mut ledger = SubscriptionLedger::new(Arc::new(api), None, None);
        assert!(ledger.ensure_subscribed("g-8").await.unwrap());
    }
}
