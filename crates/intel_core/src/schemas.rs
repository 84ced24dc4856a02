//! Column schemas for the two record shapes the dashboard shows.

use crate::actions::RowAction;
use crate::column::{CellValue, Column, Schema, SchemaError};
use crate::record::{Item, Source};

pub const NO_TEXT_PLACEHOLDER: &str = "(no text)";
pub const NO_DATE_PLACEHOLDER: &str = "not set";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementTier {
    Low,
    Medium,
    High,
}

impl EngagementTier {
    pub fn of(total: i64) -> Self {
        if total > 1000 {
            EngagementTier::High
        } else if total > 100 {
            EngagementTier::Medium
        } else {
            EngagementTier::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EngagementTier::Low => "low",
            EngagementTier::Medium => "medium",
            EngagementTier::High => "high",
        }
    }
}

/// Sources table. The `actions` column lists whichever row actions the
/// caller wired up.
pub fn source_columns(actions: &[RowAction]) -> Result<Schema<Source>, SchemaError> {
    let action_names = actions
        .iter()
        .map(|action| action.name())
        .collect::<Vec<_>>()
        .join(" ");

    Schema::new(vec![
        Column::field("id", "ID", |s: &Source| CellValue::from(s.id))
            .render_with(|s: &Source| format!("#{}", s.id))
            .hideable(false),
        Column::field("title", "Title", |s: &Source| CellValue::from(s.display_title()))
            .render_with(|s: &Source| match s.title.as_deref() {
                Some(title) if !title.trim().is_empty() => format!("{title} ({})", s.address),
                _ => s.address.clone(),
            }),
        Column::field("status", "Status", |s: &Source| CellValue::from(s.status.as_str())),
        Column::field("created_at", "Added", |s: &Source| CellValue::from(s.created_at)),
        Column::display("actions", "Actions", move |_: &Source| action_names.clone()),
    ])
}

/// Items table, including the derived `engagement` column.
pub fn item_columns() -> Result<Schema<Item>, SchemaError> {
    Schema::new(vec![
        Column::field("sequence", "Message", |i: &Item| CellValue::from(i.sequence))
            .render_with(|i: &Item| format!("#{}", i.sequence))
            .hideable(false),
        Column::field("published_at", "Published", |i: &Item| {
            CellValue::from(i.published_at)
        })
        .render_with(|i: &Item| match i.published_at {
            Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
            None => NO_DATE_PLACEHOLDER.to_string(),
        }),
        Column::field("text", "Text", |i: &Item| CellValue::from(i.text.as_deref()))
            .render_with(|i: &Item| match i.text.as_deref() {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => NO_TEXT_PLACEHOLDER.to_string(),
            }),
        counter_column("views", "Views", |i| i.views),
        counter_column("forwards", "Forwards", |i| i.forwards),
        counter_column("replies", "Replies", |i| i.replies),
        counter_column("reactions", "Reactions", |i| i.reactions),
        Column::derived(
            "engagement",
            "Engagement",
            |i: &Item| CellValue::from(i.engagement()),
            |a: &Item, b: &Item| a.engagement().cmp(&b.engagement()),
        )
        .render_with(|i: &Item| {
            let total = i.engagement();
            format!("{total} {}", EngagementTier::of(total).label())
        }),
    ])
}

// Missing counters show as 0 but still sort before any reported value.
fn counter_column(
    key: &'static str,
    label: &'static str,
    read: fn(&Item) -> Option<i64>,
) -> Column<Item> {
    Column::field(key, label, move |i: &Item| CellValue::from(read(i)))
        .render_with(move |i: &Item| read(i).unwrap_or(0).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engagement_tiers_follow_thresholds() {
        assert_eq!(EngagementTier::of(100), EngagementTier::Low);
        assert_eq!(EngagementTier::of(101), EngagementTier::Medium);
        assert_eq!(EngagementTier::of(1001), EngagementTier::High);
    }

    #[test]
    fn built_in_schemas_are_valid() {
        assert_eq!(item_columns().unwrap().len(), 8);
        let sources = source_columns(&[RowAction::Refresh, RowAction::Delete]).unwrap();
        assert!(!sources.column("actions").unwrap().is_sortable());
    }
}
