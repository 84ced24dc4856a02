use std::fmt;

use intel_core::{ItemId, ItemPage, Job, Source, SourceId};

/// Caller-chosen token echoed back with a completed call.
pub type Tag = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus { status: u16, body: String },
    Timeout,
    Network,
    Decode,
    TooLarge { max_bytes: u64, actual: Option<u64> },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus { status, .. } => write!(f, "http status {status}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FailureKind::HttpStatus { status, .. } => Some(status),
            _ => None,
        }
    }

    /// The FastAPI `detail` field of an error body, or the raw body.
    pub fn detail(&self) -> Option<String> {
        let FailureKind::HttpStatus { body, .. } = &self.kind else {
            return None;
        };
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| match value.get("detail") {
                Some(serde_json::Value::String(text)) => Some(text.clone()),
                Some(other) => Some(other.to_string()),
                None => None,
            });
        Some(detail.unwrap_or_else(|| body.clone()))
    }
}

/// Reply to `POST /api/channels/{id}/fetch`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RefreshReceipt {
    pub enqueued: bool,
    #[serde(default)]
    pub resolved: bool,
    #[serde(rename = "channel_id")]
    pub source_id: SourceId,
}

/// Reply to `POST /api/posts/{id}/summarize`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Summary {
    #[serde(rename = "post_id")]
    pub item_id: ItemId,
    pub summary: String,
    #[serde(default)]
    pub cached: bool,
}

/// Parameters of an item page request. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub query: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    ListSources,
    CreateSource { address: String },
    DeleteSource { source_id: SourceId },
    TriggerRefresh { source_id: SourceId },
    ListItems { source_id: SourceId, query: ItemQuery },
    LatestJob { source_id: SourceId },
    Summarize { item_id: ItemId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome {
    Sources(Result<Vec<Source>, ApiError>),
    Created(Result<Source, ApiError>),
    Deleted {
        source_id: SourceId,
        result: Result<(), ApiError>,
    },
    RefreshTriggered {
        source_id: SourceId,
        result: Result<RefreshReceipt, ApiError>,
    },
    Items {
        source_id: SourceId,
        result: Result<ItemPage, ApiError>,
    },
    LatestJob {
        source_id: SourceId,
        result: Result<Option<Job>, ApiError>,
    },
    Summary {
        item_id: ItemId,
        result: Result<Summary, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Completed { tag: Tag, outcome: ApiOutcome },
    /// A named poll timer fired.
    PollTick { name: &'static str, timer: u64 },
}
