//! Explicit bulk subscribe/unsubscribe with dry-run planning.
//!
//! Unlike the ephemeral ledger, subscriptions managed here are deliberate
//! and persistent: the caller asked for them and owns them afterwards.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::ratings_api::{ApiError, RatingsApi};
use crate::subscription::folders::FolderResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkMode {
    /// Report what would happen without issuing any mutating call.
    DryRun,
    Live,
}

impl BulkMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            BulkMode::DryRun
        } else {
            BulkMode::Live
        }
    }
}

/// Per-guid result of a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum GuidOutcome {
    Created,
    AlreadySubscribed,
    Removed,
    NotSubscribed,
    /// Dry-run placeholder: the operation was not performed.
    Planned,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct GuidResult {
    pub guid: String,
    #[serde(flatten)]
    pub outcome: GuidOutcome,
}

/// Aggregate outcome of one bulk subscribe or unsubscribe call.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub action: String,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_note: Option<String>,
    pub results: Vec<GuidResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkOutcome {
    fn new(action: &str, dry_run: bool) -> Self {
        Self {
            action: action.to_string(),
            dry_run,
            folder: None,
            folder_note: None,
            results: Vec::new(),
            succeeded: 0,
            failed: 0,
        }
    }

    fn push(&mut self, guid: &str, outcome: GuidOutcome) {
        match outcome {
            GuidOutcome::Failed(_) => self.failed += 1,
            _ => self.succeeded += 1,
        }
        self.results.push(GuidResult {
            guid: guid.to_string(),
            outcome,
        });
    }
}

/// Runs explicit bulk subscription changes against the ratings API.
pub struct BulkSubscriptionManager {
    api: Arc<dyn RatingsApi>,
}

impl BulkSubscriptionManager {
    pub fn new(api: Arc<dyn RatingsApi>) -> Self {
        Self { api }
    }

    /// Subscribe every guid into the named folder.
    ///
    /// Already-subscribed companies are reported as such and excluded from
    /// the bulk call. In dry-run mode the folder is only resolved, never
    /// created, and per-guid outcomes are previewed via read-only status
    /// checks without subscribing anything.
    pub async fn subscribe(
        &self,
        guids: &[String],
        folder_name: &str,
        subscription_type: &str,
        mode: BulkMode,
    ) -> Result<BulkOutcome, ApiError> {
        let resolver = FolderResolver::new(self.api.clone());
        let mut outcome = BulkOutcome::new("subscribe", mode == BulkMode::DryRun);

        if mode == BulkMode::DryRun {
            match resolver.resolve(folder_name).await? {
                Some(folder) => outcome.folder = Some(folder.name),
                None => {
                    outcome.folder = Some(folder_name.trim().to_string());
                    outcome.folder_note =
                        Some(format!("folder '{}' would be created", folder_name.trim()));
                }
            }
            for guid in guids {
                let result = if self.api.get_subscription_status(guid).await? {
                    GuidOutcome::AlreadySubscribed
                } else {
                    GuidOutcome::Planned
                };
                outcome.push(guid, result);
            }
            return Ok(outcome);
        }

        let folder = resolver.resolve_or_create(folder_name).await?;
        outcome.folder = Some(folder.name.clone());

        let mut pending = Vec::new();
        for guid in guids {
            if self.api.get_subscription_status(guid).await? {
                outcome.push(guid, GuidOutcome::AlreadySubscribed);
            } else {
                pending.push(guid.clone());
            }
        }

        if !pending.is_empty() {
            let changes = self
                .api
                .bulk_subscribe(&pending, &folder.guid, subscription_type)
                .await?;
            for guid in &pending {
                let result = if changes.added.iter().any(|g| g == guid) {
                    GuidOutcome::Created
                } else if let Some(message) = changes.error_for(guid) {
                    GuidOutcome::Failed(message.to_string())
                } else {
                    // Raced into existence between the status check and the
                    // bulk call.
                    GuidOutcome::AlreadySubscribed
                };
                outcome.push(guid, result);
            }
        }

        info!(
            folder = %folder.name,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "Bulk subscribe completed"
        );
        Ok(outcome)
    }

    /// Unsubscribe every guid. Dry-run issues no API calls at all.
    pub async fn unsubscribe(
        &self,
        guids: &[String],
        mode: BulkMode,
    ) -> Result<BulkOutcome, ApiError> {
        let mut outcome = BulkOutcome::new("unsubscribe", mode == BulkMode::DryRun);

        if mode == BulkMode::DryRun {
            for guid in guids {
                outcome.push(guid, GuidOutcome::Planned);
            }
            return Ok(outcome);
        }

        let changes = self.api.bulk_unsubscribe(guids).await?;
        for guid in guids {
            let result = if changes.deleted.iter().any(|g| g == guid) {
                GuidOutcome::Removed
            } else if let Some(message) = changes.error_for(guid) {
                GuidOutcome::Failed(message.to_string())
            } else {
                GuidOutcome::NotSubscribed
            };
            outcome.push(guid, result);
        }

        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "Bulk unsubscribe completed"
        );
        Ok(outcome)
    }
}
