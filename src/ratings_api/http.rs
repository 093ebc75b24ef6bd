//! HTTP implementation of the ratings API client.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::ApiSettings;

use super::api::{ApiError, RatingsApi, SubscribeError, SubscribeOutcome};
use super::types::{
    AccountSnapshot, BulkChanges, BulkRequestSubmission, CompanyCandidate, CompanyDetail,
    CompanyRequest, FindingRecord, FindingsQuery, Folder,
};

/// Ratings API client over reqwest.
///
/// Authentication is HTTP basic with the API key as username and an empty
/// password. Timeouts and TLS options come from the resolved configuration;
/// retry policy is deliberately absent here (the caller treats any failure
/// as a typed error).
pub struct HttpRatingsApi {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, serde::Deserialize)]
struct ResultsEnvelope<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

impl HttpRatingsApi {
    pub fn new(settings: &ApiSettings) -> anyhow::Result<Self> {
        let mut builder = Client::builder().danger_accept_invalid_certs(settings.allow_insecure_tls);
        if let Some(path) = &settings.ca_bundle_path {
            let pem = std::fs::read(path)?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .basic_auth(&self.api_key, Some(""))
            .header("Accept", "application/json")
            .timeout(self.timeout)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path).query(query)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::POST, path).json(body)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// One bulk subscription call. Subscribe/unsubscribe and their bulk
    /// variants all route through this endpoint upstream.
    async fn manage_subscriptions(&self, payload: Value) -> Result<BulkChanges, ApiError> {
        debug!(payload = %payload, "Sending bulk subscription request");
        self.post_json("/ratings/v1/subscriptions/bulk", &payload).await
    }
}

fn subscribe_entries(guids: &[String], folder: &str, subscription_type: &str) -> Value {
    let entries: Vec<Value> = guids
        .iter()
        .map(|guid| {
            json!({
                "guid": guid,
                "type": subscription_type,
                "folder": [folder],
            })
        })
        .collect();
    json!({ "add": entries })
}

fn delete_entries(guids: &[String]) -> Value {
    let entries: Vec<Value> = guids.iter().map(|guid| json!({ "guid": guid })).collect();
    json!({ "delete": entries })
}

#[async_trait]
impl RatingsApi for HttpRatingsApi {
    async fn search_companies(
        &self,
        name: Option<&str>,
        domain: Option<&str>,
    ) -> Result<Vec<CompanyCandidate>, ApiError> {
        let mut query: Vec<(&str, String)> =
            vec![("expand", "details.employee_count".to_string())];
        if let Some(domain) = domain {
            query.push(("domain", domain.to_string()));
        }
        if let Some(name) = name {
            query.push(("name", name.to_string()));
        }
        let envelope: ResultsEnvelope<CompanyCandidate> =
            self.get_json("/ratings/v1/companies/search", &query).await?;
        Ok(envelope.results)
    }

    async fn get_company(&self, guid: &str) -> Result<CompanyDetail, ApiError> {
        self.get_json(&format!("/ratings/v1/companies/{}", guid), &[])
            .await
    }

    async fn get_subscription_status(&self, guid: &str) -> Result<bool, ApiError> {
        let detail: CompanyDetail = self
            .get_json(
                &format!("/ratings/v1/companies/{}", guid),
                &[("fields", "guid,in_spm_portfolio,subscription_type".to_string())],
            )
            .await?;
        Ok(detail.in_spm_portfolio || detail.subscription_type.is_some())
    }

    async fn subscribe(
        &self,
        guid: &str,
        folder: &str,
        subscription_type: &str,
    ) -> Result<SubscribeOutcome, SubscribeError> {
        let payload = subscribe_entries(&[guid.to_string()], folder, subscription_type);
        let changes = self.manage_subscriptions(payload).await?;

        if changes.added.iter().any(|g| g == guid) {
            return Ok(SubscribeOutcome::Created);
        }
        if let Some(message) = changes.error_for(guid) {
            let lowered = message.to_lowercase();
            if lowered.contains("already exists") {
                return Ok(SubscribeOutcome::AlreadyExisted);
            }
            if lowered.contains("quota") {
                return Err(SubscribeError::QuotaExceeded(message.to_string()));
            }
            return Err(SubscribeError::Failed(message.to_string()));
        }
        // No add, no error: the subscription was already active (reported
        // as modified or as a silent no-op).
        Ok(SubscribeOutcome::AlreadyExisted)
    }

    async fn unsubscribe(&self, guid: &str) -> Result<(), ApiError> {
        let changes = self
            .manage_subscriptions(delete_entries(&[guid.to_string()]))
            .await?;
        if let Some(message) = changes.error_for(guid) {
            return Err(ApiError::InvalidResponse(message.to_string()));
        }
        Ok(())
    }

    async fn bulk_subscribe(
        &self,
        guids: &[String],
        folder: &str,
        subscription_type: &str,
    ) -> Result<BulkChanges, ApiError> {
        self.manage_subscriptions(subscribe_entries(guids, folder, subscription_type))
            .await
    }

    async fn bulk_unsubscribe(&self, guids: &[String]) -> Result<BulkChanges, ApiError> {
        self.manage_subscriptions(delete_entries(guids)).await
    }

    async fn get_findings(
        &self,
        guid: &str,
        query: &FindingsQuery,
    ) -> Result<Vec<FindingRecord>, ApiError> {
        let params: Vec<(&str, String)> = vec![
            ("affects_rating", query.affects_rating.to_string()),
            ("risk_vector", query.risk_vector.clone()),
            ("fields", query.fields.clone()),
            ("limit", query.limit.to_string()),
        ];
        let envelope: ResultsEnvelope<FindingRecord> = self
            .get_json(&format!("/ratings/v1/companies/{}/findings", guid), &params)
            .await?;
        Ok(envelope.results)
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, ApiError> {
        self.get_json("/ratings/v1/folders", &[]).await
    }

    async fn create_folder(&self, name: &str) -> Result<Folder, ApiError> {
        self.post_json("/ratings/v1/folders", &json!({ "name": name }))
            .await
    }

    async fn list_company_requests(&self, domain: &str) -> Result<Vec<CompanyRequest>, ApiError> {
        let envelope: ResultsEnvelope<CompanyRequest> = self
            .get_json(
                "/ratings/v2/company-requests",
                &[("domain", domain.to_string()), ("limit", "5".to_string())],
            )
            .await?;
        Ok(envelope.results)
    }

    async fn create_company_request_bulk(
        &self,
        submission: &BulkRequestSubmission,
    ) -> Result<Value, ApiError> {
        let body = serde_json::to_value(submission)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        self.post_json("/ratings/v2/company-requests/bulk", &body).await
    }

    async fn create_company_request(
        &self,
        domain: &str,
        subscription_type: Option<&str>,
    ) -> Result<Value, ApiError> {
        let mut request = json!({ "domain": domain });
        if let Some(subscription_type) = subscription_type {
            request["subscription_type"] = json!(subscription_type);
        }
        self.post_json(
            "/ratings/v2/company-requests",
            &json!({ "company_request": request }),
        )
        .await
    }

    async fn current_user(&self) -> Result<AccountSnapshot, ApiError> {
        self.get_json("/ratings/v1/users/current", &[]).await
    }
}
