use engine_logging::{engine_debug, engine_warn};

use crate::effect::{FeedEffect, ListEffect};
use crate::msg::{FeedMsg, ListMsg};
use crate::record::{Source, SourceId};
use crate::state::{FeedState, ListState, SyncStatus};

/// Pure update for the source list: applies a message and returns effects.
///
/// Nothing is applied while the view is unmounted except `Mounted`.
pub fn update_list(mut state: ListState, msg: ListMsg) -> (ListState, Vec<ListEffect>) {
    if !state.mounted && msg != ListMsg::Mounted {
        engine_debug!("list unmounted; dropping {msg:?}");
        return (state, Vec::new());
    }

    let effects = match msg {
        ListMsg::Mounted => {
            if state.mounted {
                return (state, Vec::new());
            }
            state.mounted = true;
            state.requests.fence();
            let timer = state.timers.arm();
            vec![
                ListEffect::ArmPoll {
                    timer,
                    interval: state.config.poll_interval,
                },
                issue_source_fetch(&mut state),
            ]
        }
        ListMsg::Unmounted => {
            state.mounted = false;
            state
                .timers
                .disarm()
                .map(|timer| ListEffect::DisarmPoll { timer })
                .into_iter()
                .collect()
        }
        ListMsg::PollTick { timer } => {
            if state.timers.is_active(timer) {
                clear_notice(&mut state);
                vec![issue_source_fetch(&mut state)]
            } else {
                engine_debug!("ignoring tick from stale timer {timer}");
                Vec::new()
            }
        }
        ListMsg::ReloadRequested => vec![issue_source_fetch(&mut state)],
        ListMsg::InputChanged(text) => {
            if state.input != text {
                state.input = text;
                state.mark_dirty();
            }
            Vec::new()
        }
        ListMsg::SubmitClicked => {
            let address = state.input.trim().to_string();
            if address.is_empty() {
                Vec::new()
            } else {
                clear_notice(&mut state);
                vec![ListEffect::CreateSource { address }]
            }
        }
        ListMsg::RefreshRequested(source_id) => {
            clear_notice(&mut state);
            vec![ListEffect::TriggerRefresh { source_id }]
        }
        ListMsg::DeleteRequested(source_id) => {
            clear_notice(&mut state);
            vec![ListEffect::DeleteSource { source_id }]
        }
        ListMsg::OpenRequested(source_id) => vec![ListEffect::Navigate { source_id }],
        ListMsg::OpenExternalRequested(source_id) => open_external(&mut state, source_id),
        ListMsg::NoticeDismissed => {
            clear_notice(&mut state);
            Vec::new()
        }
        ListMsg::SourcesLoaded { request, result } => {
            if !state.requests.admit(request, state.config.ordering) {
                engine_debug!(
                    "discarding source list response {request}; latest is {}",
                    state.requests.latest()
                );
                return (state, Vec::new());
            }
            match result {
                Ok(sources) => {
                    engine_debug!("source list loaded: {} entries", sources.len());
                    state.sources = sources;
                    state.status = SyncStatus::Ready;
                    state.error = None;
                }
                Err(failure) => {
                    engine_warn!("source list fetch failed: {}", failure.fetch_message());
                    state.status = SyncStatus::Error;
                    state.error = Some(failure.fetch_message());
                }
            }
            state.mark_dirty();
            Vec::new()
        }
        ListMsg::SourceCreated { result } => {
            match result {
                Ok(source) => {
                    engine_debug!("source #{} created", source.id);
                    state.input.clear();
                }
                Err(failure) => {
                    set_notice(
                        &mut state,
                        format!("could not add source: {}", failure.mutation_message()),
                    );
                }
            }
            state.mark_dirty();
            vec![issue_source_fetch(&mut state)]
        }
        ListMsg::RefreshTriggered { source_id, result } => {
            if let Err(failure) = result {
                set_notice(
                    &mut state,
                    format!(
                        "could not refresh source #{source_id}: {}",
                        failure.mutation_message()
                    ),
                );
            }
            vec![issue_source_fetch(&mut state)]
        }
        ListMsg::SourceDeleted { source_id, result } => {
            if let Err(failure) = result {
                set_notice(
                    &mut state,
                    format!(
                        "could not delete source #{source_id}: {}",
                        failure.mutation_message()
                    ),
                );
            }
            vec![issue_source_fetch(&mut state)]
        }
        ListMsg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Pure update for the item feed of one source.
pub fn update_feed(mut state: FeedState, msg: FeedMsg) -> (FeedState, Vec<FeedEffect>) {
    if !state.mounted && !matches!(msg, FeedMsg::Mounted { .. }) {
        engine_debug!("feed unmounted; dropping {msg:?}");
        return (state, Vec::new());
    }

    let effects = match msg {
        FeedMsg::Mounted { source_id } => {
            if state.mounted {
                return (state, Vec::new());
            }
            state.mounted = true;
            follow_source(&mut state, source_id)
        }
        FeedMsg::SourceChanged(source_id) => {
            if state.source_id == Some(source_id) {
                Vec::new()
            } else {
                follow_source(&mut state, source_id)
            }
        }
        FeedMsg::Unmounted => {
            state.mounted = false;
            state
                .timers
                .disarm()
                .map(|timer| FeedEffect::DisarmPoll { timer })
                .into_iter()
                .collect()
        }
        FeedMsg::PollTick { timer } => {
            if state.timers.is_active(timer) {
                issue_feed_cycle(&mut state)
            } else {
                engine_debug!("ignoring tick from stale timer {timer}");
                Vec::new()
            }
        }
        FeedMsg::ReloadRequested => issue_feed_cycle(&mut state),
        FeedMsg::QueryChanged(query) => {
            if state.query == query {
                Vec::new()
            } else {
                state.query = query;
                state.page = 1;
                issue_feed_cycle(&mut state)
            }
        }
        FeedMsg::PageChanged(page) => {
            let page = page.max(1);
            if state.page == page {
                Vec::new()
            } else {
                state.page = page;
                issue_feed_cycle(&mut state)
            }
        }
        FeedMsg::SummarizeRequested(item_id) => vec![FeedEffect::Summarize { item_id }],
        FeedMsg::ItemsLoaded {
            source_id,
            request,
            result,
        } => {
            if state.source_id != Some(source_id) {
                engine_debug!("discarding items of source #{source_id}");
                return (state, Vec::new());
            }
            if !state.item_requests.admit(request, state.config.ordering) {
                engine_debug!(
                    "discarding item response {request}; latest is {}",
                    state.item_requests.latest()
                );
                return (state, Vec::new());
            }
            match result {
                Ok(page) => {
                    engine_debug!(
                        "items loaded for source #{source_id}: {} of {}",
                        page.items.len(),
                        page.total
                    );
                    state.items = page.items;
                    state.total = page.total;
                    state.status = SyncStatus::Ready;
                    state.error = None;
                }
                Err(failure) => {
                    engine_warn!("item fetch failed: {}", failure.fetch_message());
                    state.status = SyncStatus::Error;
                    state.error = Some(failure.fetch_message());
                }
            }
            state.mark_dirty();
            Vec::new()
        }
        FeedMsg::JobLoaded {
            source_id,
            request,
            result,
        } => {
            if state.source_id != Some(source_id)
                || !state.job_requests.admit(request, state.config.ordering)
            {
                engine_debug!("discarding job response {request} for source #{source_id}");
                return (state, Vec::new());
            }
            match result {
                Ok(job) => {
                    if state.job != job {
                        state.job = job;
                        state.mark_dirty();
                    }
                }
                Err(failure) => {
                    engine_debug!("job status fetch failed: {failure}");
                }
            }
            Vec::new()
        }
        FeedMsg::SummaryLoaded { item_id, result } => {
            match result {
                Ok(summary) => {
                    state.summaries.insert(item_id, summary);
                    state.mark_dirty();
                }
                Err(failure) => {
                    engine_debug!("summary for item #{item_id} failed: {failure}");
                }
            }
            Vec::new()
        }
        FeedMsg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn issue_source_fetch(state: &mut ListState) -> ListEffect {
    let request = state.requests.issue();
    state.status = SyncStatus::Loading;
    state.mark_dirty();
    ListEffect::FetchSources { request }
}

fn open_external(state: &mut ListState, source_id: SourceId) -> Vec<ListEffect> {
    match state.source(source_id).map(Source::external_url) {
        Some(Some(url)) => vec![ListEffect::OpenExternal { url }],
        None => {
            set_notice(state, format!("unknown source #{source_id}"));
            Vec::new()
        }
        Some(None) => {
            set_notice(state, format!("source #{source_id} has no usable address"));
            Vec::new()
        }
    }
}

fn set_notice(state: &mut ListState, notice: String) {
    state.notice = Some(notice);
    state.mark_dirty();
}

fn clear_notice(state: &mut ListState) {
    if state.notice.take().is_some() {
        state.mark_dirty();
    }
}

// Drops everything tied to the previous source and restarts polling.
fn follow_source(state: &mut FeedState, source_id: SourceId) -> Vec<FeedEffect> {
    let mut effects = Vec::with_capacity(4);
    if let Some(timer) = state.timers.disarm() {
        effects.push(FeedEffect::DisarmPoll { timer });
    }
    state.item_requests.fence();
    state.job_requests.fence();
    state.source_id = Some(source_id);
    state.page = 1;
    state.items.clear();
    state.total = 0;
    state.job = None;
    state.error = None;
    state.summaries.clear();

    let timer = state.timers.arm();
    effects.push(FeedEffect::ArmPoll {
        timer,
        interval: state.config.poll_interval,
    });
    effects.extend(issue_feed_cycle(state));
    effects
}

fn issue_feed_cycle(state: &mut FeedState) -> Vec<FeedEffect> {
    let Some(source_id) = state.source_id else {
        return Vec::new();
    };
    let query = state.query.trim();
    let items = FeedEffect::FetchItems {
        request: state.item_requests.issue(),
        source_id,
        query: (!query.is_empty()).then(|| query.to_string()),
        page: state.page,
        page_size: state.config.page_size,
    };
    let job = FeedEffect::FetchLatestJob {
        request: state.job_requests.issue(),
        source_id,
    };
    state.status = SyncStatus::Loading;
    state.mark_dirty();
    vec![items, job]
}
