//! Shared scripted ratings-API fake and data builders for integration tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use pagella_server::ratings_api::{
    AccountSnapshot, ApiError, BulkChanges, BulkError, BulkRequestSubmission, CompanyCandidate,
    CompanyDetail, CompanyRequest, FindingRecord, FindingsQuery, Folder, RatingPoint, RatingsApi,
    SubscribeError, SubscribeOutcome,
};

/// Scripted in-memory collaborator. State is mutated the way the real
/// service would, failure switches inject specific fault modes, and call
/// counters support interaction assertions.
#[derive(Default)]
pub struct ScriptedApi {
    pub subscribed: Mutex<HashSet<String>>,
    pub companies: Mutex<HashMap<String, CompanyDetail>>,
    pub findings: Mutex<HashMap<String, Vec<FindingRecord>>>,
    pub folders: Mutex<Vec<Folder>>,
    pub candidates: Mutex<Vec<CompanyCandidate>>,
    pub pending_requests: Mutex<Vec<CompanyRequest>>,
    pub bulk_errors: Mutex<Vec<BulkError>>,

    pub quota_exhausted: AtomicBool,
    pub fail_get_company: AtomicBool,
    pub fail_findings: AtomicBool,
    pub fail_unsubscribe: AtomicBool,
    pub fail_bulk_request: AtomicBool,

    pub status_calls: AtomicUsize,
    pub subscribe_calls: AtomicUsize,
    pub unsubscribe_calls: AtomicUsize,
    pub bulk_subscribe_calls: AtomicUsize,
    pub bulk_unsubscribe_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_company(self, detail: CompanyDetail) -> Self {
        self.companies
            .lock()
            .unwrap()
            .insert(detail.guid.clone(), detail);
        self
    }

    pub fn with_subscription(self, guid: &str) -> Self {
        self.subscribed.lock().unwrap().insert(guid.to_string());
        self
    }

    pub fn with_findings(self, guid: &str, findings: Vec<FindingRecord>) -> Self {
        self.findings
            .lock()
            .unwrap()
            .insert(guid.to_string(), findings);
        self
    }

    pub fn with_candidate(self, guid: &str, name: &str) -> Self {
        self.candidates.lock().unwrap().push(CompanyCandidate {
            guid: guid.to_string(),
            name: name.to_string(),
            primary_domain: format!("{}.example", name.to_lowercase()),
            ..Default::default()
        });
        self
    }

    pub fn with_folder(self, guid: &str, name: &str) -> Self {
        self.folders.lock().unwrap().push(Folder {
            guid: guid.to_string(),
            name: name.to_string(),
            companies: Vec::new(),
        });
        self
    }
}

#[async_trait]
impl RatingsApi for ScriptedApi {
    async fn search_companies(
        &self,
        _name: Option<&str>,
        _domain: Option<&str>,
    ) -> Result<Vec<CompanyCandidate>, ApiError> {
        Ok(self.candidates.lock().unwrap().clone())
    }

    async fn get_company(&self, guid: &str) -> Result<CompanyDetail, ApiError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get_company.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        self.companies
            .lock()
            .unwrap()
            .get(guid)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn get_subscription_status(&self, guid: &str) -> Result<bool, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.subscribed.lock().unwrap().contains(guid))
    }

    async fn subscribe(
        &self,
        guid: &str,
        _folder: &str,
        _subscription_type: &str,
    ) -> Result<SubscribeOutcome, SubscribeError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.quota_exhausted.load(Ordering::SeqCst) {
            return Err(SubscribeError::QuotaExceeded(
                "subscription quota reached".to_string(),
            ));
        }
        if self.subscribed.lock().unwrap().insert(guid.to_string()) {
            Ok(SubscribeOutcome::Created)
        } else {
            Ok(SubscribeOutcome::AlreadyExisted)
        }
    }

    async fn unsubscribe(&self, guid: &str) -> Result<(), ApiError> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_unsubscribe.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 500,
                message: "unsubscribe rejected".to_string(),
            });
        }
        self.subscribed.lock().unwrap().remove(guid);
        Ok(())
    }

    async fn bulk_subscribe(
        &self,
        guids: &[String],
        _folder: &str,
        _subscription_type: &str,
    ) -> Result<BulkChanges, ApiError> {
        self.bulk_subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let errors = self.bulk_errors.lock().unwrap().clone();
        let failed: HashSet<&str> = errors
            .iter()
            .filter_map(|e| e.guid.as_deref())
            .collect();
        let mut subscribed = self.subscribed.lock().unwrap();
        let mut added = Vec::new();
        let mut modified = Vec::new();
        for guid in guids {
            if failed.contains(guid.as_str()) {
                continue;
            }
            if subscribed.insert(guid.clone()) {
                added.push(guid.clone());
            } else {
                modified.push(guid.clone());
            }
        }
        Ok(BulkChanges {
            added,
            deleted: Vec::new(),
            modified,
            errors,
        })
    }

    async fn bulk_unsubscribe(&self, guids: &[String]) -> Result<BulkChanges, ApiError> {
        self.bulk_unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        let mut subscribed = self.subscribed.lock().unwrap();
        let deleted: Vec<String> = guids
            .iter()
            .filter(|g| subscribed.remove(g.as_str()))
            .cloned()
            .collect();
        Ok(BulkChanges {
            added: Vec::new(),
            deleted,
            modified: Vec::new(),
            errors: Vec::new(),
        })
    }

    async fn get_findings(
        &self,
        guid: &str,
        _query: &FindingsQuery,
    ) -> Result<Vec<FindingRecord>, ApiError> {
        if self.fail_findings.load(Ordering::SeqCst) {
            return Err(ApiError::Connection("connection reset".to_string()));
        }
        Ok(self
            .findings
            .lock()
            .unwrap()
            .get(guid)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, ApiError> {
        Ok(self.folders.lock().unwrap().clone())
    }

    async fn create_folder(&self, name: &str) -> Result<Folder, ApiError> {
        let folder = Folder {
            guid: format!("folder-{}", name.to_lowercase().replace(' ', "-")),
            name: name.to_string(),
            companies: Vec::new(),
        };
        self.folders.lock().unwrap().push(folder.clone());
        Ok(folder)
    }

    async fn list_company_requests(&self, domain: &str) -> Result<Vec<CompanyRequest>, ApiError> {
        Ok(self
            .pending_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.domain.as_deref() == Some(domain))
            .cloned()
            .collect())
    }

    async fn create_company_request_bulk(
        &self,
        submission: &BulkRequestSubmission,
    ) -> Result<Value, ApiError> {
        if self.fail_bulk_request.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 400,
                message: "bulk endpoint unavailable".to_string(),
            });
        }
        Ok(json!({"accepted": true, "file": submission.file}))
    }

    async fn create_company_request(
        &self,
        domain: &str,
        _subscription_type: Option<&str>,
    ) -> Result<Value, ApiError> {
        Ok(json!({"accepted": true, "domain": domain}))
    }

    async fn current_user(&self) -> Result<AccountSnapshot, ApiError> {
        Ok(AccountSnapshot::default())
    }
}

/// Build a company detail with a flat recent rating history.
pub fn company(guid: &str, name: &str, rating: f64) -> CompanyDetail {
    CompanyDetail {
        guid: guid.to_string(),
        name: name.to_string(),
        primary_domain: format!("{}.example", name.to_lowercase()),
        current_rating: Some(rating),
        ratings: vec![
            RatingPoint {
                rating_date: "2026-08-21".to_string(),
                rating,
            },
            RatingPoint {
                rating_date: "2026-08-14".to_string(),
                rating,
            },
        ],
        ..Default::default()
    }
}

/// Build a raw finding with the fields the ranker keys on.
pub fn finding(severity: &str, vector: &str, last_seen: &str) -> FindingRecord {
    FindingRecord {
        severity_category: Some(severity.to_string()),
        risk_vector: vector.to_string(),
        risk_vector_label: Some(vector.replace('_', " ")),
        last_seen: Some(last_seen.to_string()),
        first_seen: Some("2026-01-01".to_string()),
        ..Default::default()
    }
}
