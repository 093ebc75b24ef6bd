//! Subscription lifecycle management.
//!
//! Two distinct ownership models live here: the [`ledger::SubscriptionLedger`]
//! creates short-lived subscriptions it must clean up, while
//! [`bulk::BulkSubscriptionManager`] applies deliberate, persistent changes
//! the caller asked for.

pub mod bulk;
pub mod folders;
pub mod ledger;

pub use bulk::{BulkMode, BulkOutcome, BulkSubscriptionManager, GuidOutcome, GuidResult};
pub use folders::FolderResolver;
pub use ledger::{CleanupFailure, CleanupReport, SubscriptionLedger, SubscriptionState};
