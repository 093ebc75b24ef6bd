//! Rating orchestration, payload assembly and trend computation.

pub mod orchestrator;
pub mod payload;
pub mod trend;

pub use orchestrator::{
    coerce_guid_list, normalize_action, BulkAction, RatingError, RatingOrchestrator,
    SearchResponse,
};
pub use payload::{rating_color, rating_legend, RatingPayload, SubscriptionStatus};
pub use trend::{trend_1_year, trend_8_weeks, Trend};
