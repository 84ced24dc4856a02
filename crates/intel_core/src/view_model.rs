use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::record::{ItemId, Job, JobStatus, Source, SourceId};
use crate::state::SyncStatus;

/// The `{status, error, job}` tuple exposed to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncSnapshot {
    pub status: SyncStatus,
    pub error: Option<String>,
    pub job: Option<Job>,
}

impl SyncSnapshot {
    pub fn is_loading(&self) -> bool {
        self.status == SyncStatus::Loading
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListViewModel {
    pub status: SyncStatus,
    pub error: Option<String>,
    /// Transient message from the last failed mutation.
    pub notice: Option<String>,
    pub input: String,
    pub can_submit: bool,
    pub source_count: usize,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedViewModel {
    pub source_id: Option<SourceId>,
    pub status: SyncStatus,
    pub error: Option<String>,
    pub job: Option<JobPanel>,
    pub query: String,
    /// 1-based.
    pub page: u32,
    pub page_count: u32,
    pub total: u64,
    pub item_count: usize,
    pub summaries: BTreeMap<ItemId, String>,
    pub dirty: bool,
}

/// What the job banner above the item table shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPanel {
    pub status: JobStatus,
    pub error: Option<String>,
    pub inserted: Option<u64>,
}

impl JobPanel {
    pub fn headline(&self) -> String {
        match (self.status, self.inserted, self.error.as_deref()) {
            (JobStatus::Completed, Some(inserted), _) => {
                format!("completed, {inserted} new items")
            }
            (JobStatus::Failed, _, Some(error)) => format!("failed: {error}"),
            (status, _, _) => status.label().to_string(),
        }
    }
}

impl From<&Job> for JobPanel {
    fn from(job: &Job) -> Self {
        Self {
            status: job.status,
            error: job.error.clone(),
            inserted: job.stats.as_ref().and_then(|stats| stats.inserted),
        }
    }
}

/// Counters shown above the source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSummary {
    pub total: usize,
    pub active: usize,
    pub added_today: usize,
}

pub fn summarize_sources(sources: &[Source], today: NaiveDate) -> SourceSummary {
    SourceSummary {
        total: sources.len(),
        active: sources.iter().filter(|s| s.is_active()).count(),
        added_today: sources
            .iter()
            .filter(|s| s.created_at.date_naive() == today)
            .count(),
    }
}
