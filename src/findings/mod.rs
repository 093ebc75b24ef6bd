//! Findings ranking and narrative normalization.

pub mod normalize;
pub mod rank;

pub use rank::{rank, FilterPolicy, TopFinding, TopFindings, SELECTION_THRESHOLD, WEB_APPSEC_VECTOR};
