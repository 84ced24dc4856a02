use std::time::Duration;

use url::Url;

use crate::table::DEFAULT_PAGE_SIZE;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// How overlapping fetch cycles are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseOrdering {
    /// Responses are applied in the order their requests were issued. One
    /// that arrives after a later-issued response is dropped.
    #[default]
    IssueOrder,
    /// Whatever arrives last wins, regardless of when it was issued.
    ArrivalOrder,
}

/// Settings handed to a controller when it is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub page_size: u32,
    pub poll_interval: Duration,
    pub base_url: Url,
    pub ordering: ResponseOrdering,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE as u32,
            poll_interval: DEFAULT_POLL_INTERVAL,
            base_url: default_base_url(),
            ordering: ResponseOrdering::default(),
        }
    }
}

fn default_base_url() -> Url {
    match Url::parse(DEFAULT_BASE_URL) {
        Ok(url) => url,
        Err(_) => unreachable!("default base url is a valid literal"),
    }
}
