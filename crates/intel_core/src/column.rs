//! Declarative column descriptors: how to read, render, sort and filter one
//! field of a record type.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Rendered in place of a value the record does not carry.
pub const ABSENT_PLACEHOLDER: &str = "-";

/// A field value as read from a record, ordered by its natural type.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Absent,
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl CellValue {
    fn rank(&self) -> u8 {
        match self {
            CellValue::Absent => 0,
            CellValue::Integer(_) | CellValue::Float(_) => 1,
            CellValue::Text(_) => 2,
            CellValue::Timestamp(_) => 3,
        }
    }

    /// Natural ordering: absent first, then numeric, lexicographic or
    /// chronological within a type.
    pub fn natural_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Integer(a), CellValue::Integer(b)) => a.cmp(b),
            (CellValue::Integer(a), CellValue::Float(b)) => (*a as f64).total_cmp(b),
            (CellValue::Float(a), CellValue::Integer(b)) => a.total_cmp(&(*b as f64)),
            (CellValue::Float(a), CellValue::Float(b)) => a.total_cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Timestamp(a), CellValue::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Absent => f.write_str(ABSENT_PLACEHOLDER),
            CellValue::Integer(v) => write!(f, "{v}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(v) => f.write_str(v),
            CellValue::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(value: DateTime<Utc>) -> Self {
        CellValue::Timestamp(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Absent, Into::into)
    }
}

type Accessor<R> = Arc<dyn Fn(&R) -> CellValue + Send + Sync>;
type Renderer<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;
type Comparator<R> = Arc<dyn Fn(&R, &R) -> Ordering + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Reads a field that exists on the record.
    Field,
    /// Computed from several fields, or purely presentational.
    Derived,
}

pub struct Column<R> {
    key: String,
    label: String,
    kind: ColumnKind,
    sortable: bool,
    filterable: bool,
    hideable: bool,
    value: Accessor<R>,
    render: Renderer<R>,
    compare: Option<Comparator<R>>,
}

impl<R: 'static> Column<R> {
    /// A column over a record field. Renders the value's natural text and
    /// sorts by its natural ordering unless overridden.
    pub fn field<F>(key: impl Into<String>, label: impl Into<String>, value: F) -> Self
    where
        F: Fn(&R) -> CellValue + Send + Sync + 'static,
    {
        let value: Accessor<R> = Arc::new(value);
        let render_value = value.clone();
        Self {
            key: key.into(),
            label: label.into(),
            kind: ColumnKind::Field,
            sortable: true,
            filterable: true,
            hideable: true,
            value,
            render: Arc::new(move |record: &R| render_value(record).to_string()),
            compare: None,
        }
    }

    /// A computed column. It has no field of its own, so it must bring the
    /// comparator used for sorting.
    pub fn derived<V, C>(key: impl Into<String>, label: impl Into<String>, value: V, compare: C) -> Self
    where
        V: Fn(&R) -> CellValue + Send + Sync + 'static,
        C: Fn(&R, &R) -> Ordering + Send + Sync + 'static,
    {
        let mut column = Self::field(key, label, value);
        column.kind = ColumnKind::Derived;
        column.compare = Some(Arc::new(compare));
        column
    }

    /// A presentational column (for example row actions) that can neither be
    /// sorted nor filtered.
    pub fn display<F>(key: impl Into<String>, label: impl Into<String>, render: F) -> Self
    where
        F: Fn(&R) -> String + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            label: label.into(),
            kind: ColumnKind::Derived,
            sortable: false,
            filterable: false,
            hideable: false,
            value: Arc::new(|_: &R| CellValue::Absent),
            render: Arc::new(render),
            compare: None,
        }
    }

    pub fn render_with<F>(mut self, render: F) -> Self
    where
        F: Fn(&R) -> String + Send + Sync + 'static,
    {
        self.render = Arc::new(render);
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    pub fn hideable(mut self, hideable: bool) -> Self {
        self.hideable = hideable;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable
    }

    pub fn is_hideable(&self) -> bool {
        self.hideable
    }

    pub fn value(&self, record: &R) -> CellValue {
        (self.value)(record)
    }

    pub fn render(&self, record: &R) -> String {
        (self.render)(record)
    }

    pub fn compare(&self, a: &R, b: &R) -> Ordering {
        match &self.compare {
            Some(compare) => compare(a, b),
            None => self.value(a).natural_cmp(&self.value(b)),
        }
    }
}

impl<R> Clone for Column<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            label: self.label.clone(),
            kind: self.kind,
            sortable: self.sortable,
            filterable: self.filterable,
            hideable: self.hideable,
            value: self.value.clone(),
            render: self.render.clone(),
            compare: self.compare.clone(),
        }
    }
}

impl<R> fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("sortable", &self.sortable)
            .field("filterable", &self.filterable)
            .field("hideable", &self.hideable)
            .field("custom_compare", &self.compare.is_some())
            .finish()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("column key must not be empty")]
    EmptyKey,
    #[error("duplicate column key {0:?}")]
    DuplicateKey(String),
    #[error("derived column {0:?} is sortable but has no comparator")]
    MissingComparator(String),
}

/// An ordered set of column descriptors with unique keys.
pub struct Schema<R> {
    columns: Vec<Column<R>>,
}

impl<R> Clone for Schema<R> {
    fn clone(&self) -> Self {
        Self {
            columns: self.columns.clone(),
        }
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.columns).finish()
    }
}

impl<R> Schema<R> {
    pub fn new(columns: Vec<Column<R>>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if column.key.trim().is_empty() {
                return Err(SchemaError::EmptyKey);
            }
            if !seen.insert(column.key.as_str()) {
                return Err(SchemaError::DuplicateKey(column.key.clone()));
            }
            if column.kind == ColumnKind::Derived && column.sortable && column.compare.is_none() {
                return Err(SchemaError::MissingComparator(column.key.clone()));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&Column<R>> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
