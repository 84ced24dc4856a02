//! Intel engine: HTTP client for the ingestion backend and effect execution.
mod client;
mod engine;
mod types;

pub use client::{ApiClient, ApiSettings, ReqwestApiClient};
pub use engine::{EngineEvents, EngineHandle};
pub use types::{
    ApiError, ApiOutcome, ApiRequest, EngineEvent, FailureKind, ItemQuery, RefreshReceipt,
    Summary, Tag,
};
