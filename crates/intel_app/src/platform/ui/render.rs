use std::fmt::Write as _;

use intel_core::{
    FeedViewModel, Item, ListViewModel, SortDirection, Source, SourceSummary, SyncStatus,
    TableView,
};

const MAX_CELL_WIDTH: usize = 48;
const COLUMN_GAP: &str = "  ";

pub fn render_list(
    view: &ListViewModel,
    summary: SourceSummary,
    table: &TableView<'_, Source>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Sources: {} total | {} active | {} added today  [{}]",
        format_with_commas(summary.total as u64),
        format_with_commas(summary.active as u64),
        format_with_commas(summary.added_today as u64),
        status_label(view.status)
    );
    push_messages(&mut out, view.error.as_deref(), view.notice.as_deref());
    out.push_str(&render_table(table));
    out
}

pub fn render_feed(view: &FeedViewModel, table: &TableView<'_, Item>) -> String {
    let mut out = String::new();
    let source = view
        .source_id
        .map(|id| format!("Source #{id}"))
        .unwrap_or_else(|| "No source".to_string());
    let query = if view.query.trim().is_empty() {
        String::new()
    } else {
        format!(" | query {:?}", view.query.trim())
    };
    let _ = writeln!(
        out,
        "{source}{query} | page {} of {} | {} items  [{}]",
        view.page,
        view.page_count,
        format_with_commas(view.total),
        status_label(view.status)
    );
    if let Some(job) = &view.job {
        let _ = writeln!(out, "Latest job: {}", job.headline());
    }
    push_messages(&mut out, view.error.as_deref(), None);
    out.push_str(&render_table(table));

    let summaries: Vec<(i64, &str)> = table
        .rows
        .iter()
        .filter_map(|row| {
            view.summaries
                .get(&row.record.id)
                .map(|text| (row.record.sequence, text.as_str()))
        })
        .collect();
    if !summaries.is_empty() {
        out.push_str("Summaries:\n");
        for (sequence, text) in summaries {
            let _ = writeln!(out, "  #{sequence}: {}", single_line(text));
        }
    }
    out
}

/// Lays out the visible columns of one page as aligned text.
pub fn render_table<R>(view: &TableView<'_, R>) -> String {
    if view.columns.is_empty() {
        return "(all columns hidden)\n".to_string();
    }

    let headers: Vec<String> = view
        .columns
        .iter()
        .map(|column| match column.sort {
            Some(SortDirection::Ascending) => format!("{} ^", column.label),
            Some(SortDirection::Descending) => format!("{} v", column.label),
            None => column.label.clone(),
        })
        .collect();
    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|row| {
            row.cells
                .iter()
                .map(|cell| truncate(&single_line(cell), MAX_CELL_WIDTH))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            rows.iter()
                .filter_map(|cells| cells.get(index))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_row(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    push_row(&mut out, &rule, &widths);
    if rows.is_empty() {
        out.push_str("(no rows)\n");
    }
    for cells in &rows {
        push_row(&mut out, cells, &widths);
    }

    let _ = writeln!(
        out,
        "page {} of {}  ({} of {} rows)",
        view.page_index + 1,
        view.page_count,
        format_with_commas(view.filtered_count as u64),
        format_with_commas(view.total_count as u64)
    );
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    out.push_str(line.trim_end());
    out.push('\n');
}

fn push_messages(out: &mut String, error: Option<&str>, notice: Option<&str>) {
    if let Some(error) = error {
        let _ = writeln!(out, "Error: {error}");
    }
    if let Some(notice) = notice {
        let _ = writeln!(out, "Notice: {notice}");
    }
}

fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Idle => "idle",
        SyncStatus::Loading => "loading",
        SyncStatus::Ready => "ready",
        SyncStatus::Error => "error",
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

pub fn format_with_commas(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use intel_core::{
        item_columns, source_columns, JobPanel, JobStatus, RowAction, TableEngine,
    };

    use super::*;

    fn source(id: i64, title: Option<&str>, status: &str) -> Source {
        Source {
            id,
            address: format!("https://t.me/channel{id}"),
            title: title.map(str::to_string),
            status: status.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        }
    }

    fn item(id: i64, sequence: i64, text: &str, views: i64) -> Item {
        Item {
            id,
            source_id: 3,
            sequence,
            published_at: None,
            text: Some(text.to_string()),
            views: Some(views),
            forwards: None,
            replies: None,
            reactions: None,
        }
    }

    #[test]
    fn commas_group_thousands() {
        assert_eq!(format_with_commas(0), "0");
        assert_eq!(format_with_commas(999), "999");
        assert_eq!(format_with_commas(1_234_567), "1,234,567");
    }

    #[test]
    fn long_cells_are_truncated_on_one_line() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        assert_eq!(single_line("two\nlines  here"), "two lines here");
    }

    #[test]
    fn list_shows_counters_notice_and_sorted_header() {
        let mut engine =
            TableEngine::new(source_columns(&[RowAction::Refresh, RowAction::Delete]).unwrap());
        engine.set_sort("id").unwrap();
        engine.set_column_visibility("created_at", false).unwrap();
        let records = vec![source(2, Some("Durov"), "active"), source(1, None, "pending")];
        let table = engine.view(&records);

        let view = ListViewModel {
            status: SyncStatus::Ready,
            notice: Some("could not delete source #4: HTTP 500".to_string()),
            source_count: 2,
            ..ListViewModel::default()
        };
        let summary = SourceSummary {
            total: 2,
            active: 1,
            added_today: 0,
        };
        let text = render_list(&view, summary, &table);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "Sources: 2 total | 1 active | 0 added today  [ready]"
        );
        assert_eq!(lines[1], "Notice: could not delete source #4: HTTP 500");
        assert!(lines[2].starts_with("ID ^"));
        assert!(!lines[2].contains("Added"));
        assert!(lines[4].starts_with("#1"));
        assert!(lines[5].contains("Durov (https://t.me/channel2)"));
        assert!(lines[5].ends_with("refresh delete"));
        assert_eq!(lines[6], "page 1 of 1  (2 of 2 rows)");
    }

    #[test]
    fn empty_filter_result_still_has_a_page() {
        let mut engine = TableEngine::new(source_columns(&[]).unwrap());
        engine.set_global_filter("nothing matches this");
        let records = vec![source(1, None, "active")];
        let text = render_table(&engine.view(&records));
        assert!(text.contains("(no rows)"));
        assert!(text.ends_with("page 1 of 1  (0 of 1 rows)\n"));
    }

    #[test]
    fn feed_shows_job_headline_and_summaries() {
        let mut engine = TableEngine::new(item_columns().unwrap());
        let records = vec![item(31, 120, "launch day", 1500), item(32, 121, "", 3)];
        let table = engine.view(&records);

        let mut summaries = BTreeMap::new();
        summaries.insert(31, "A launch.".to_string());
        let view = FeedViewModel {
            source_id: Some(3),
            status: SyncStatus::Loading,
            job: Some(JobPanel {
                status: JobStatus::Completed,
                error: None,
                inserted: Some(7),
            }),
            query: "launch".to_string(),
            page: 1,
            page_count: 1,
            total: 2,
            item_count: 2,
            summaries,
            ..FeedViewModel::default()
        };
        let text = render_feed(&view, &table);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "Source #3 | query \"launch\" | page 1 of 1 | 2 items  [loading]"
        );
        assert_eq!(lines[1], "Latest job: completed, 7 new items");
        assert!(text.contains("1500 high"));
        assert!(text.contains("(no text)"));
        assert!(text.ends_with("Summaries:\n  #120: A launch.\n"));
    }
}
