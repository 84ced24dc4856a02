use std::collections::BTreeMap;
use std::fmt;

use crate::config::{ResponseOrdering, SyncConfig};
use crate::record::{Item, ItemId, Job, Source, SourceId};
use crate::table::page_count;
use crate::view_model::{FeedViewModel, JobPanel, ListViewModel, SyncSnapshot};

/// Sequence number attached to every fetch so late responses can be told
/// apart from current ones.
pub type RequestId = u64;
pub type TimerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// A failed remote call, reduced to what the views need to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// HTTP status, or `None` for transport failures.
    pub status: Option<u16>,
    /// Response body for HTTP failures, transport message otherwise.
    pub detail: String,
}

impl FetchFailure {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            detail: body.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            detail: message.into(),
        }
    }

    /// Message for a failed list or item fetch.
    pub fn fetch_message(&self) -> String {
        match self.status {
            Some(status) => format!("HTTP {status}"),
            None => self.detail.clone(),
        }
    }

    /// Message for a failed mutation; includes the response body if any.
    pub fn mutation_message(&self) -> String {
        match self.status {
            Some(status) if self.detail.trim().is_empty() => format!("HTTP {status}"),
            Some(status) => format!("HTTP {status}: {}", self.detail.trim()),
            None => self.detail.clone(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mutation_message())
    }
}

/// Issues request ids and decides which responses are still wanted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct RequestLedger {
    issued: RequestId,
    applied: RequestId,
    // Nothing at or below this id is admitted again.
    fenced: RequestId,
}

impl RequestLedger {
    pub(crate) fn issue(&mut self) -> RequestId {
        self.issued += 1;
        self.issued
    }

    /// Whether the response to `request` may be applied. Records it as
    /// applied if so.
    pub(crate) fn admit(&mut self, request: RequestId, ordering: ResponseOrdering) -> bool {
        if request <= self.fenced || request > self.issued {
            return false;
        }
        let admitted = match ordering {
            ResponseOrdering::IssueOrder => request > self.applied,
            ResponseOrdering::ArrivalOrder => true,
        };
        if admitted {
            self.applied = self.applied.max(request);
        }
        admitted
    }

    /// Refuses every response to a request issued so far, whatever the
    /// ordering. Used when a view is mounted again or retargeted.
    pub(crate) fn fence(&mut self) {
        self.fenced = self.issued;
        self.applied = self.issued;
    }

    pub(crate) fn latest(&self) -> RequestId {
        self.issued
    }
}

/// Tracks the single poll timer a view may have armed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct TimerLedger {
    last: TimerId,
    active: Option<TimerId>,
}

impl TimerLedger {
    pub(crate) fn arm(&mut self) -> TimerId {
        self.last += 1;
        self.active = Some(self.last);
        self.last
    }

    pub(crate) fn disarm(&mut self) -> Option<TimerId> {
        self.active.take()
    }

    pub(crate) fn is_active(&self, timer: TimerId) -> bool {
        self.active == Some(timer)
    }
}

/// Source list controller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState {
    pub(crate) config: SyncConfig,
    pub(crate) mounted: bool,
    pub(crate) status: SyncStatus,
    pub(crate) error: Option<String>,
    pub(crate) notice: Option<String>,
    pub(crate) sources: Vec<Source>,
    pub(crate) input: String,
    pub(crate) requests: RequestLedger,
    pub(crate) timers: TimerLedger,
    pub(crate) dirty: bool,
}

impl Default for ListState {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

impl ListState {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            mounted: false,
            status: SyncStatus::Idle,
            error: None,
            notice: None,
            sources: Vec::new(),
            input: String::new(),
            requests: RequestLedger::default(),
            timers: TimerLedger::default(),
            dirty: false,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Authoritative collection from the last successful fetch.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn source(&self, id: SourceId) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            status: self.status,
            error: self.error.clone(),
            job: None,
        }
    }

    pub fn view(&self) -> ListViewModel {
        ListViewModel {
            status: self.status,
            error: self.error.clone(),
            notice: self.notice.clone(),
            input: self.input.clone(),
            can_submit: !self.input.trim().is_empty(),
            source_count: self.sources.len(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and resets.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

/// Item feed controller state for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedState {
    pub(crate) config: SyncConfig,
    pub(crate) mounted: bool,
    pub(crate) source_id: Option<SourceId>,
    pub(crate) query: String,
    pub(crate) page: u32,
    pub(crate) status: SyncStatus,
    pub(crate) error: Option<String>,
    pub(crate) items: Vec<Item>,
    pub(crate) total: u64,
    pub(crate) job: Option<Job>,
    pub(crate) summaries: BTreeMap<ItemId, String>,
    pub(crate) item_requests: RequestLedger,
    pub(crate) job_requests: RequestLedger,
    pub(crate) timers: TimerLedger,
    pub(crate) dirty: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

impl FeedState {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            mounted: false,
            source_id: None,
            query: String::new(),
            page: 1,
            status: SyncStatus::Idle,
            error: None,
            items: Vec::new(),
            total: 0,
            job: None,
            summaries: BTreeMap::new(),
            item_requests: RequestLedger::default(),
            job_requests: RequestLedger::default(),
            timers: TimerLedger::default(),
            dirty: false,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn source_id(&self) -> Option<SourceId> {
        self.source_id
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Authoritative items of the current server page.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn summary(&self, item_id: ItemId) -> Option<&str> {
        self.summaries.get(&item_id).map(String::as_str)
    }

    pub fn page_count(&self) -> u32 {
        page_count(self.total as usize, self.config.page_size as usize) as u32
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            status: self.status,
            error: self.error.clone(),
            job: self.job.clone(),
        }
    }

    pub fn view(&self) -> FeedViewModel {
        FeedViewModel {
            source_id: self.source_id,
            status: self.status,
            error: self.error.clone(),
            job: self.job.as_ref().map(JobPanel::from),
            query: self.query.clone(),
            page: self.page,
            page_count: self.page_count(),
            total: self.total,
            item_count: self.items.len(),
            summaries: self.summaries.clone(),
            dirty: self.dirty,
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
