use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

use intel_core::{
    derive_view, item_columns, source_columns, Item, RowAction, SortDirection, Source,
    TableEngine, TableError, TableState, NO_TEXT_PLACEHOLDER,
};

fn item(sequence: i64, text: &str, views: Option<i64>) -> Item {
    Item {
        id: sequence * 10,
        source_id: 1,
        sequence,
        published_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single(),
        text: Some(text.to_string()),
        views,
        forwards: None,
        replies: None,
        reactions: None,
    }
}

fn items(count: i64) -> Vec<Item> {
    (1..=count)
        .map(|n| item(n, &format!("post {n}"), Some(n)))
        .collect()
}

fn source(id: i64, address: &str, title: Option<&str>) -> Source {
    Source {
        id,
        address: address.to_string(),
        title: title.map(str::to_string),
        status: "active".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
    }
}

fn sequences(view: &intel_core::TableView<'_, Item>) -> Vec<i64> {
    view.rows.iter().map(|row| row.record.sequence).collect()
}

#[test]
fn twenty_five_records_split_into_two_pages() {
    let records = items(25);
    let mut table = TableEngine::new(item_columns().unwrap());

    let first = table.view(&records);
    assert_eq!(first.rows.len(), 20);
    assert_eq!(first.page_count, 2);
    assert_eq!(first.filtered_count, 25);
    assert!(first.has_next());
    assert!(!first.has_previous());

    table.next_page();
    let second = table.view(&records);
    assert_eq!(second.page_index, 1);
    assert_eq!(sequences(&second), vec![21, 22, 23, 24, 25]);
    assert!(!second.has_next());
}

#[test]
fn empty_collection_is_page_zero_of_one() {
    let mut table = TableEngine::new(item_columns().unwrap());
    let view = table.view(&[]);

    assert!(view.is_empty());
    assert_eq!(view.page_index, 0);
    assert_eq!(view.page_count, 1);
    assert_eq!(view.total_count, 0);
}

#[test]
fn page_cursor_is_clamped_when_the_count_shrinks() {
    let mut table = TableEngine::new(item_columns().unwrap());
    table.set_page(7);
    let rows = items(25);
    let view = table.view(&rows);
    assert_eq!(view.page_index, 1);
    assert_eq!(table.state().page_index(), 1);

    let rows = items(10);
    let view = table.view(&rows);
    assert_eq!(view.page_index, 0);
    assert_eq!(view.rows.len(), 10);
}

#[test]
fn global_filter_is_case_insensitive_across_columns() {
    let sources = vec![
        source(1, "https://t.me/durov", None),
        source(2, "https://t.me/news", Some("Daily News")),
        source(3, "https://t.me/tech", Some("Durov Tech")),
    ];
    let mut table = TableEngine::new(source_columns(&RowAction::ALL).unwrap());
    table.set_global_filter("DUROV");

    let view = table.view(&sources);
    let ids: Vec<i64> = view.rows.iter().map(|row| row.record.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(view.filtered_count, 2);
    assert_eq!(view.total_count, 3);
}

#[test]
fn filters_never_match_the_actions_column() {
    let sources = vec![source(1, "https://t.me/durov", None)];
    let mut table = TableEngine::new(source_columns(&RowAction::ALL).unwrap());
    table.set_global_filter("refresh");
    table.set_page(4);

    let view = table.view(&sources);
    assert_eq!(view.filtered_count, 0);
    assert_eq!(view.page_index, 0);
    assert_eq!(view.page_count, 1);
    assert!(view.rows.is_empty());
    assert_eq!(
        table.set_column_filter("actions", "delete"),
        Err(TableError::NotFilterable("actions".to_string()))
    );
}

#[test]
fn column_filter_narrows_and_clears() {
    let records = vec![
        item(1, "Launch day", Some(5)),
        item(2, "launch recap", Some(6)),
        item(3, "weekly digest", Some(7)),
    ];
    let mut table = TableEngine::new(item_columns().unwrap());

    table.set_column_filter("text", "LAUNCH").unwrap();
    assert_eq!(sequences(&table.view(&records)), vec![1, 2]);

    table.set_column_filter("text", "").unwrap();
    assert_eq!(table.state().column_filter("text"), None);
    assert_eq!(sequences(&table.view(&records)), vec![1, 2, 3]);
}

#[test]
fn sort_cycles_through_three_states() {
    let mut records = items(3);
    records[0].views = Some(500);
    records[1].views = Some(10);
    records[2].views = Some(90);
    let mut table = TableEngine::new(item_columns().unwrap());

    assert_eq!(table.set_sort("engagement"), Ok(Some(SortDirection::Ascending)));
    assert_eq!(sequences(&table.view(&records)), vec![2, 3, 1]);

    assert_eq!(table.set_sort("engagement"), Ok(Some(SortDirection::Descending)));
    assert_eq!(sequences(&table.view(&records)), vec![1, 3, 2]);

    assert_eq!(table.set_sort("engagement"), Ok(None));
    assert_eq!(sequences(&table.view(&records)), vec![1, 2, 3]);
}

#[test]
fn engagement_sorts_by_the_sum_of_counters() {
    let mut big_on_forwards = item(1, "a", Some(10));
    big_on_forwards.forwards = Some(1_000);
    let many_views = item(2, "b", Some(900));
    let records = vec![big_on_forwards, many_views];

    let mut table = TableEngine::new(item_columns().unwrap());
    table.set_sort("engagement").unwrap();
    assert_eq!(sequences(&table.view(&records)), vec![2, 1]);

    table.set_sort("views").unwrap();
    assert_eq!(table.state().sort().len(), 1);
    assert_eq!(sequences(&table.view(&records)), vec![1, 2]);
}

#[test]
fn ties_keep_insertion_order() {
    let records: Vec<Item> = (1..=6).map(|n| item(n, "same", Some(3))).collect();
    let mut table = TableEngine::new(item_columns().unwrap());
    table.set_sort("views").unwrap();
    assert_eq!(sequences(&table.view(&records)), vec![1, 2, 3, 4, 5, 6]);
    table.set_sort("views").unwrap();
    assert_eq!(sequences(&table.view(&records)), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn missing_counters_render_as_zero_and_sort_first() {
    let mut silent = item(1, "", None);
    silent.text = None;
    let records = vec![item(2, "hello", Some(0)), silent];
    let mut table = TableEngine::new(item_columns().unwrap());
    table.set_sort("views").unwrap();

    let view = table.view(&records);
    assert_eq!(sequences(&view), vec![1, 2]);
    let row = &view.rows[0];
    assert_eq!(row.cells[2], NO_TEXT_PLACEHOLDER);
    assert_eq!(row.cells[3], "0");
    assert_eq!(row.cells[7], "0 low");
}

#[test]
fn hidden_columns_are_not_rendered() {
    let records = items(1);
    let mut table = TableEngine::new(item_columns().unwrap());
    table.set_column_visibility("views", false).unwrap();
    table.set_column_visibility("sequence", false).unwrap();

    let view = table.view(&records);
    let keys: Vec<&str> = view.columns.iter().map(|c| c.key.as_str()).collect();
    assert!(!keys.contains(&"views"));
    assert!(keys.contains(&"sequence"));
    assert_eq!(view.rows[0].cells.len(), keys.len());

    table.set_column_visibility("views", true).unwrap();
    assert!(table.state().is_visible("views"));
}

#[test]
fn unknown_and_unsortable_columns_are_rejected() {
    let mut items_table = TableEngine::new(item_columns().unwrap());
    assert_eq!(
        items_table.set_sort("likes"),
        Err(TableError::UnknownColumn("likes".to_string()))
    );

    let mut sources_table = TableEngine::new(source_columns(&[]).unwrap());
    assert_eq!(
        sources_table.set_sort("actions"),
        Err(TableError::NotSortable("actions".to_string()))
    );
    assert!(sources_table.state().sort().is_empty());
}

#[test]
fn filter_changes_return_to_first_page_but_sorting_does_not() {
    let records = items(45);
    let mut table = TableEngine::new(item_columns().unwrap());
    table.set_page(2);
    table.set_sort("views").unwrap();
    assert_eq!(table.view(&records).page_index, 2);

    table.set_global_filter("post");
    assert_eq!(table.view(&records).page_index, 0);
}

#[test]
fn pages_cover_the_filtered_set_exactly_once() {
    let records = items(57);
    let mut engine = TableEngine::new(item_columns().unwrap());
    engine.set_global_filter("post 1");
    let filtered = engine.view(&records).filtered_count;

    let mut seen = BTreeSet::new();
    let mut rows = 0;
    let mut page = 0;
    loop {
        engine.set_page(page);
        let view = engine.view(&records);
        assert!(view.rows.len() <= view.page_size);
        rows += view.rows.len();
        seen.extend(view.rows.iter().map(|row| row.source_index));
        if !view.has_next() {
            break;
        }
        page += 1;
    }
    assert_eq!(rows, filtered);
    assert_eq!(seen.len(), filtered);
}

#[test]
fn applying_the_same_filter_again_changes_nothing() {
    let records = items(57);
    let mut engine = TableEngine::with_page_size(item_columns().unwrap(), 100);
    let matching = |engine: &mut TableEngine<Item>| -> BTreeSet<usize> {
        engine
            .view(&records)
            .rows
            .iter()
            .map(|row| row.source_index)
            .collect()
    };

    engine.set_global_filter("post 1");
    let first = matching(&mut engine);
    engine.set_global_filter("post 1");
    let second = matching(&mut engine);
    assert_eq!(first.len(), 11);
    assert_eq!(first, second);

    let state: TableState = engine.state().clone();
    let once = derive_view(&records, engine.schema(), &state);
    let twice = derive_view(&records, engine.schema(), &state);
    assert_eq!(once, twice);
}
