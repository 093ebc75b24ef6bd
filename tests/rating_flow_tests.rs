//! End-to-end tests of the rating flow: ephemeral subscription lifecycle,
//! findings ranking, degradation and cleanup reporting.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use pagella_server::config::{FindingsSettings, SubscriptionSettings};
use pagella_server::rating::{RatingError, RatingOrchestrator, SubscriptionStatus};

use common::{company, finding, ScriptedApi};

fn settings() -> SubscriptionSettings {
    SubscriptionSettings {
        default_folder: Some("Vendors".to_string()),
        default_subscription_type: Some("continuous_monitoring".to_string()),
    }
}

fn orchestrator(api: Arc<ScriptedApi>) -> RatingOrchestrator {
    RatingOrchestrator::new(api, settings(), FindingsSettings::default())
}

#[tokio::test]
async fn test_rating_with_ephemeral_subscription_cleans_up() {
    // Scenario: no pre-existing subscription.
    let api = Arc::new(
        ScriptedApi::new()
            .with_company(company("ACME-1", "Acme", 780.0))
            .with_findings(
                "ACME-1",
                vec![
                    finding("severe", "open_ports", "2026-08-20"),
                    finding("material", "patching_cadence", "2026-08-19"),
                    finding("material", "insecure_systems", "2026-08-18"),
                ],
            ),
    );

    let payload = orchestrator(api.clone())
        .get_company_rating("ACME-1")
        .await
        .unwrap();

    assert_eq!(payload.subscription_status, SubscriptionStatus::EphemeralCleaned);
    assert_eq!(api.subscribe_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.unsubscribe_calls.load(Ordering::SeqCst), 1);
    // The ephemeral subscription is gone afterwards.
    assert!(!api.subscribed.lock().unwrap().contains("ACME-1"));

    assert_eq!(payload.current_rating.as_ref().unwrap().value, 780.0);
    assert_eq!(payload.current_rating.as_ref().unwrap().color, "green");
    assert_eq!(payload.top_findings.count, 3);
    assert_eq!(payload.top_findings.policy.profile, "strict");
    assert!(!payload.findings_unavailable);
    assert!(payload.cleanup_failures.is_empty());
    assert_eq!(payload.legend.len(), 3);
}

#[tokio::test]
async fn test_preexisting_subscription_is_never_touched() {
    // Scenario: already subscribed.
    let api = Arc::new(
        ScriptedApi::new()
            .with_company(company("ACME-2", "Acme", 650.0))
            .with_subscription("ACME-2"),
    );

    let payload = orchestrator(api.clone())
        .get_company_rating("ACME-2")
        .await
        .unwrap();

    assert_eq!(payload.subscription_status, SubscriptionStatus::AlreadySubscribed);
    assert_eq!(api.subscribe_calls.load(Ordering::SeqCst), 0);
    assert_eq!(api.unsubscribe_calls.load(Ordering::SeqCst), 0);
    assert!(api.subscribed.lock().unwrap().contains("ACME-2"));
    assert_eq!(payload.current_rating.as_ref().unwrap().color, "yellow");
}

#[tokio::test]
async fn test_findings_failure_degrades_but_still_cleans_up() {
    // Scenario: findings fetch fails with a transport error.
    let api = Arc::new(ScriptedApi::new().with_company(company("ACME-3", "Acme", 540.0)));
    api.fail_findings.store(true, Ordering::SeqCst);

    let payload = orchestrator(api.clone())
        .get_company_rating("ACME-3")
        .await
        .unwrap();

    assert!(payload.findings_unavailable);
    assert_eq!(payload.top_findings.count, 0);
    assert_eq!(payload.top_findings.policy.profile, "unavailable");
    assert_eq!(payload.current_rating.as_ref().unwrap().color, "red");
    // Cleanup still ran.
    assert_eq!(api.unsubscribe_calls.load(Ordering::SeqCst), 1);
    assert!(!api.subscribed.lock().unwrap().contains("ACME-3"));
}

#[tokio::test]
async fn test_quota_exhaustion_aborts_without_cleanup() {
    let api = Arc::new(ScriptedApi::new().with_company(company("ACME-4", "Acme", 700.0)));
    api.quota_exhausted.store(true, Ordering::SeqCst);

    let err = orchestrator(api.clone())
        .get_company_rating("ACME-4")
        .await
        .unwrap_err();

    assert!(matches!(err, RatingError::QuotaExceeded(_)));
    // Nothing was created, so nothing to clean up and no fetches happened.
    assert_eq!(api.unsubscribe_calls.load(Ordering::SeqCst), 0);
    assert_eq!(api.detail_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_guid_fails_fast_with_no_side_effects() {
    let api = Arc::new(ScriptedApi::new());

    let err = orchestrator(api.clone())
        .get_company_rating("   ")
        .await
        .unwrap_err();

    assert!(matches!(err, RatingError::Validation(_)));
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 0);
    assert_eq!(api.subscribe_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rating_fetch_failure_still_cleans_up() {
    let api = Arc::new(ScriptedApi::new());
    api.fail_get_company.store(true, Ordering::SeqCst);

    let err = orchestrator(api.clone())
        .get_company_rating("ACME-5")
        .await
        .unwrap_err();

    match err {
        RatingError::RatingFetchFailed {
            cleanup_failures, ..
        } => assert!(cleanup_failures.is_empty()),
        other => panic!("expected RatingFetchFailed, got {:?}", other),
    }
    assert_eq!(api.subscribe_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.unsubscribe_calls.load(Ordering::SeqCst), 1);
    assert!(!api.subscribed.lock().unwrap().contains("ACME-5"));
}

#[tokio::test]
async fn test_cleanup_failure_is_reported_on_success_path() {
    let api = Arc::new(ScriptedApi::new().with_company(company("ACME-6", "Acme", 760.0)));
    api.fail_unsubscribe.store(true, Ordering::SeqCst);

    let payload = orchestrator(api.clone())
        .get_company_rating("ACME-6")
        .await
        .unwrap();

    assert_eq!(payload.cleanup_failures.len(), 1);
    assert_eq!(payload.cleanup_failures[0].guid, "ACME-6");
    // The subscription is still lingering; the report says so.
    assert!(api.subscribed.lock().unwrap().contains("ACME-6"));
}

#[tokio::test]
async fn test_cascade_relaxes_when_material_findings_are_scarce() {
    let api = Arc::new(
        ScriptedApi::new()
            .with_company(company("ACME-7", "Acme", 710.0))
            .with_findings(
                "ACME-7",
                vec![
                    finding("severe", "open_ports", "2026-08-20"),
                    finding("moderate", "server_software", "2026-08-19"),
                    finding("moderate", "patching_cadence", "2026-08-18"),
                ],
            ),
    );

    let payload = orchestrator(api.clone())
        .get_company_rating("ACME-7")
        .await
        .unwrap();

    assert_eq!(payload.top_findings.policy.profile, "relaxed");
    assert_eq!(payload.top_findings.policy.severity_floor, "moderate");
    assert_eq!(payload.top_findings.count, 3);
    // Severity ordering holds across the relaxed pool.
    assert_eq!(
        payload.top_findings.findings[0].finding.as_deref(),
        Some("open ports")
    );
}
