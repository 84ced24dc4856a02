//! Intel core: table derivation, column schemas and the pure sync controllers.
mod actions;
mod column;
mod config;
mod effect;
mod msg;
mod record;
mod schemas;
mod state;
mod table;
mod update;
mod view_model;

pub use actions::{RowAction, RowActions};
pub use column::{CellValue, Column, ColumnKind, Schema, SchemaError, ABSENT_PLACEHOLDER};
pub use config::{ResponseOrdering, SyncConfig, DEFAULT_BASE_URL, DEFAULT_POLL_INTERVAL};
pub use effect::{FeedEffect, ListEffect};
pub use msg::{FeedMsg, ListMsg};
pub use record::{Item, ItemId, ItemPage, Job, JobId, JobStats, JobStatus, Source, SourceId};
pub use schemas::{
    item_columns, source_columns, EngagementTier, NO_DATE_PLACEHOLDER, NO_TEXT_PLACEHOLDER,
};
pub use state::{FeedState, FetchFailure, ListState, RequestId, SyncStatus, TimerId};
pub use table::{
    derive_view, page_count, SortDirection, SortKey, TableEngine, TableError, TableState,
    TableView, ViewColumn, ViewRow, DEFAULT_PAGE_SIZE,
};
pub use update::{update_feed, update_list};
pub use view_model::{
    summarize_sources, FeedViewModel, JobPanel, ListViewModel, SourceSummary, SyncSnapshot,
};
