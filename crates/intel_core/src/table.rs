//! Tabular data engine: turns a record slice plus a column schema into a
//! filtered, sorted and paginated view.
//!
//! The derivation itself is the pure function [`derive_view`]. [`TableEngine`]
//! owns nothing but the recomputable view state (sort, filters, visibility,
//! page cursor) and validates requests against its schema.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::column::{Column, Schema};

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TableError {
    #[error("unknown column {0:?}")]
    UnknownColumn(String),
    #[error("column {0:?} cannot be sorted")]
    NotSortable(String),
    #[error("column {0:?} cannot be filtered")]
    NotFilterable(String),
}

/// Derived view state. Empty `sort` means insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    sort: Vec<SortKey>,
    column_filters: BTreeMap<String, String>,
    global_filter: String,
    visibility: BTreeMap<String, bool>,
    page_index: usize,
    page_size: usize,
}

impl Default for TableState {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl TableState {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            sort: Vec::new(),
            column_filters: BTreeMap::new(),
            global_filter: String::new(),
            visibility: BTreeMap::new(),
            page_index: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn sort_direction(&self, column: &str) -> Option<SortDirection> {
        self.sort
            .iter()
            .find(|key| key.column == column)
            .map(|key| key.direction)
    }

    pub fn column_filter(&self, column: &str) -> Option<&str> {
        self.column_filters.get(column).map(String::as_str)
    }

    pub fn column_filters(&self) -> &BTreeMap<String, String> {
        &self.column_filters
    }

    pub fn global_filter(&self) -> &str {
        &self.global_filter
    }

    pub fn is_visible(&self, column: &str) -> bool {
        self.visibility.get(column).copied().unwrap_or(true)
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

/// One visible column as presented to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewColumn {
    pub key: String,
    pub label: String,
    pub sortable: bool,
    pub filterable: bool,
    pub sort: Option<SortDirection>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow<'r, R> {
    /// Position of the record in the slice handed to the engine.
    pub source_index: usize,
    pub record: &'r R,
    /// Rendered text for each visible column, in column order.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableView<'r, R> {
    pub columns: Vec<ViewColumn>,
    pub rows: Vec<ViewRow<'r, R>>,
    pub total_count: usize,
    pub filtered_count: usize,
    pub page_index: usize,
    pub page_count: usize,
    pub page_size: usize,
}

impl<R> TableView<'_, R> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn has_next(&self) -> bool {
        self.page_index + 1 < self.page_count
    }
}

/// Number of pages for `count` rows. Never zero, so an empty result is still
/// "page 0 of 1".
pub fn page_count(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

/// Filters, sorts and paginates `records`, in that order.
pub fn derive_view<'r, R: 'static>(
    records: &'r [R],
    schema: &Schema<R>,
    state: &TableState,
) -> TableView<'r, R> {
    let column_filters: Vec<(&Column<R>, String)> = state
        .column_filters
        .iter()
        .filter_map(|(key, text)| {
            let column = schema.column(key)?;
            (column.is_filterable() && !text.is_empty()).then(|| (column, text.to_lowercase()))
        })
        .collect();
    let global = state.global_filter.to_lowercase();
    let searchable: Vec<&Column<R>> = schema
        .columns()
        .iter()
        .filter(|c| c.is_filterable())
        .collect();

    let mut order: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| {
            let columns_pass = column_filters
                .iter()
                .all(|(column, needle)| contains_ci(&column.render(record), needle));
            columns_pass
                && (global.is_empty()
                    || searchable
                        .iter()
                        .any(|column| contains_ci(&column.render(record), &global)))
        })
        .map(|(index, _)| index)
        .collect();

    let sort_keys: Vec<(&Column<R>, SortDirection)> = state
        .sort
        .iter()
        .filter_map(|key| {
            let column = schema.column(&key.column)?;
            column.is_sortable().then_some((column, key.direction))
        })
        .collect();
    if !sort_keys.is_empty() {
        // `sort_by` is stable, so ties keep their filtered order.
        order.sort_by(|&a, &b| {
            sort_keys
                .iter()
                .map(|(column, direction)| {
                    let ordering = column.compare(&records[a], &records[b]);
                    match direction {
                        SortDirection::Ascending => ordering,
                        SortDirection::Descending => ordering.reverse(),
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    let filtered_count = order.len();
    let page_size = state.page_size.max(1);
    let page_count = page_count(filtered_count, page_size);
    let page_index = state.page_index.min(page_count - 1);

    let visible: Vec<&Column<R>> = schema
        .columns()
        .iter()
        .filter(|c| state.is_visible(c.key()))
        .collect();

    let rows = order
        .iter()
        .skip(page_index * page_size)
        .take(page_size)
        .map(|&index| {
            let record = &records[index];
            ViewRow {
                source_index: index,
                record,
                cells: visible.iter().map(|c| c.render(record)).collect(),
            }
        })
        .collect();

    let columns = visible
        .iter()
        .map(|c| ViewColumn {
            key: c.key().to_string(),
            label: c.label().to_string(),
            sortable: c.is_sortable(),
            filterable: c.is_filterable(),
            sort: state.sort_direction(c.key()),
            filter: state.column_filter(c.key()).map(str::to_string),
        })
        .collect();

    TableView {
        columns,
        rows,
        total_count: records.len(),
        filtered_count,
        page_index,
        page_count,
        page_size,
    }
}

fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

/// Schema plus view state. Holds no records.
#[derive(Debug, Clone)]
pub struct TableEngine<R> {
    schema: Schema<R>,
    state: TableState,
}

impl<R: 'static> TableEngine<R> {
    pub fn new(schema: Schema<R>) -> Self {
        Self::with_page_size(schema, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(schema: Schema<R>, page_size: usize) -> Self {
        Self {
            schema,
            state: TableState::with_page_size(page_size),
        }
    }

    pub fn schema(&self) -> &Schema<R> {
        &self.schema
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    /// Replaces the global filter and returns to the first page.
    pub fn set_global_filter(&mut self, text: impl Into<String>) {
        self.state.global_filter = text.into();
        self.state.page_index = 0;
    }

    /// Sets or (with empty text) clears a column filter and returns to the
    /// first page.
    pub fn set_column_filter(&mut self, key: &str, text: impl Into<String>) -> Result<(), TableError> {
        let column = self.lookup(key)?;
        if !column.is_filterable() {
            return Err(TableError::NotFilterable(key.to_string()));
        }
        let text = text.into();
        if text.is_empty() {
            self.state.column_filters.remove(key);
        } else {
            self.state.column_filters.insert(key.to_string(), text);
        }
        self.state.page_index = 0;
        Ok(())
    }

    /// Cycles `key` through unsorted, ascending, descending and back.
    /// Any sort on another column is dropped. The page cursor is kept.
    pub fn set_sort(&mut self, key: &str) -> Result<Option<SortDirection>, TableError> {
        let column = self.lookup(key)?;
        if !column.is_sortable() {
            return Err(TableError::NotSortable(key.to_string()));
        }
        let next = match self.state.sort_direction(key) {
            None => Some(SortDirection::Ascending),
            Some(SortDirection::Ascending) => Some(SortDirection::Descending),
            Some(SortDirection::Descending) => None,
        };
        self.state.sort = next
            .map(|direction| SortKey {
                column: key.to_string(),
                direction,
            })
            .into_iter()
            .collect();
        Ok(next)
    }

    /// Moves the page cursor. Out of range values are clamped when the view
    /// is derived.
    pub fn set_page(&mut self, index: usize) {
        self.state.page_index = index;
    }

    pub fn next_page(&mut self) {
        self.state.page_index = self.state.page_index.saturating_add(1);
    }

    pub fn previous_page(&mut self) {
        self.state.page_index = self.state.page_index.saturating_sub(1);
    }

    /// Shows or hides a column. Hiding a non-hideable column is ignored.
    pub fn set_column_visibility(&mut self, key: &str, visible: bool) -> Result<(), TableError> {
        let column = self.lookup(key)?;
        if visible {
            self.state.visibility.remove(key);
        } else if column.is_hideable() {
            self.state.visibility.insert(key.to_string(), false);
        }
        Ok(())
    }

    /// Derives the current view and writes the clamped page cursor back.
    pub fn view<'r>(&mut self, records: &'r [R]) -> TableView<'r, R> {
        let view = derive_view(records, &self.schema, &self.state);
        self.state.page_index = view.page_index;
        view
    }

    fn lookup(&self, key: &str) -> Result<&Column<R>, TableError> {
        self.schema
            .column(key)
            .ok_or_else(|| TableError::UnknownColumn(key.to_string()))
    }
}
