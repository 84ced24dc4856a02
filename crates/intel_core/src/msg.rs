use crate::record::{ItemId, ItemPage, Job, Source, SourceId};
use crate::state::{FetchFailure, RequestId, TimerId};

/// Inputs to the source list controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListMsg {
    /// The list view became visible.
    Mounted,
    /// The list view went away; nothing arriving afterwards is applied.
    Unmounted,
    /// Periodic re-poll from the timer armed at mount.
    PollTick { timer: TimerId },
    /// User asked for an immediate reload.
    ReloadRequested,
    /// User edited the "new source" input.
    InputChanged(String),
    /// User submitted the "new source" input.
    SubmitClicked,
    RefreshRequested(SourceId),
    DeleteRequested(SourceId),
    OpenRequested(SourceId),
    OpenExternalRequested(SourceId),
    NoticeDismissed,
    SourcesLoaded {
        request: RequestId,
        result: Result<Vec<Source>, FetchFailure>,
    },
    SourceCreated {
        result: Result<Source, FetchFailure>,
    },
    RefreshTriggered {
        source_id: SourceId,
        result: Result<(), FetchFailure>,
    },
    SourceDeleted {
        source_id: SourceId,
        result: Result<(), FetchFailure>,
    },
    NoOp,
}

/// Inputs to the item feed controller of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMsg {
    Mounted { source_id: SourceId },
    /// The feed now follows a different source.
    SourceChanged(SourceId),
    Unmounted,
    PollTick { timer: TimerId },
    ReloadRequested,
    /// New search text; returns to page 1.
    QueryChanged(String),
    /// 1-based page number.
    PageChanged(u32),
    SummarizeRequested(ItemId),
    ItemsLoaded {
        source_id: SourceId,
        request: RequestId,
        result: Result<ItemPage, FetchFailure>,
    },
    JobLoaded {
        source_id: SourceId,
        request: RequestId,
        result: Result<Option<Job>, FetchFailure>,
    },
    SummaryLoaded {
        item_id: ItemId,
        result: Result<String, FetchFailure>,
    },
    NoOp,
}
