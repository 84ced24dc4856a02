use std::time::Duration;

use url::Url;

use crate::record::{ItemId, SourceId};
use crate::state::{RequestId, TimerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEffect {
    ArmPoll { timer: TimerId, interval: Duration },
    DisarmPoll { timer: TimerId },
    FetchSources { request: RequestId },
    CreateSource { address: String },
    TriggerRefresh { source_id: SourceId },
    DeleteSource { source_id: SourceId },
    /// Switch to the item view of a source.
    Navigate { source_id: SourceId },
    OpenExternal { url: Url },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEffect {
    ArmPoll { timer: TimerId, interval: Duration },
    DisarmPoll { timer: TimerId },
    FetchItems {
        request: RequestId,
        source_id: SourceId,
        query: Option<String>,
        page: u32,
        page_size: u32,
    },
    FetchLatestJob { request: RequestId, source_id: SourceId },
    Summarize { item_id: ItemId },
}
