use std::sync::mpsc;
use std::thread;

use engine_logging::{engine_debug, engine_warn};
use intel_core::{FeedEffect, FeedMsg, FetchFailure, ListEffect, ListMsg, SourceId};
use intel_engine::{ApiError, ApiOutcome, ApiRequest, EngineEvent, EngineHandle, ItemQuery};
use url::Url;

/// Engine timer names, one per view.
pub const LIST_POLL: &str = "list";
pub const FEED_POLL: &str = "feed";

// Mutations carry no sequence number.
const UNSEQUENCED: u64 = 0;

/// Everything the app loop reacts to.
#[derive(Debug)]
pub enum Inbound {
    Line(String),
    InputClosed,
    List(ListMsg),
    Feed(FeedMsg),
}

/// Effects the app carries out itself rather than through the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalAction {
    Navigate(SourceId),
    OpenExternal(Url),
}

pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, inbound: mpsc::Sender<Inbound>) -> Self {
        let runner = Self { engine };
        runner.spawn_event_loop(inbound);
        runner
    }

    pub fn run_list(&self, effects: Vec<ListEffect>) -> Vec<LocalAction> {
        let mut local = Vec::new();
        for effect in effects {
            match effect {
                ListEffect::ArmPoll { timer, interval } => {
                    self.engine.arm_poll(LIST_POLL, timer, interval);
                }
                ListEffect::DisarmPoll { timer } => self.engine.disarm_poll(LIST_POLL, timer),
                ListEffect::FetchSources { request } => {
                    self.engine.call(request, ApiRequest::ListSources);
                }
                ListEffect::CreateSource { address } => {
                    self.engine
                        .call(UNSEQUENCED, ApiRequest::CreateSource { address });
                }
                ListEffect::TriggerRefresh { source_id } => {
                    self.engine
                        .call(UNSEQUENCED, ApiRequest::TriggerRefresh { source_id });
                }
                ListEffect::DeleteSource { source_id } => {
                    self.engine
                        .call(UNSEQUENCED, ApiRequest::DeleteSource { source_id });
                }
                ListEffect::Navigate { source_id } => local.push(LocalAction::Navigate(source_id)),
                ListEffect::OpenExternal { url } => local.push(LocalAction::OpenExternal(url)),
            }
        }
        local
    }

    pub fn run_feed(&self, effects: Vec<FeedEffect>) {
        for effect in effects {
            match effect {
                FeedEffect::ArmPoll { timer, interval } => {
                    self.engine.arm_poll(FEED_POLL, timer, interval);
                }
                FeedEffect::DisarmPoll { timer } => self.engine.disarm_poll(FEED_POLL, timer),
                FeedEffect::FetchItems {
                    request,
                    source_id,
                    query,
                    page,
                    page_size,
                } => {
                    self.engine.call(
                        request,
                        ApiRequest::ListItems {
                            source_id,
                            query: ItemQuery {
                                query,
                                page,
                                page_size,
                            },
                        },
                    );
                }
                FeedEffect::FetchLatestJob { request, source_id } => {
                    self.engine
                        .call(request, ApiRequest::LatestJob { source_id });
                }
                FeedEffect::Summarize { item_id } => {
                    self.engine
                        .call(UNSEQUENCED, ApiRequest::Summarize { item_id });
                }
            }
        }
    }

    // Holds only the event stream, so dropping the runner stops the engine.
    fn spawn_event_loop(&self, inbound: mpsc::Sender<Inbound>) {
        let events = self.engine.events();
        thread::spawn(move || {
            while let Some(event) = events.next() {
                let Some(message) = translate(event) else {
                    continue;
                };
                if inbound.send(message).is_err() {
                    engine_debug!("app loop gone; engine event loop exiting");
                    return;
                }
            }
            engine_debug!("engine stopped; event loop exiting");
        });
    }
}

/// Maps an engine event onto the controller message it answers.
pub fn translate(event: EngineEvent) -> Option<Inbound> {
    let (tag, outcome) = match event {
        EngineEvent::PollTick { name, timer } => {
            return match name {
                LIST_POLL => Some(Inbound::List(ListMsg::PollTick { timer })),
                FEED_POLL => Some(Inbound::Feed(FeedMsg::PollTick { timer })),
                other => {
                    engine_warn!("tick from unknown timer {other:?}");
                    None
                }
            };
        }
        EngineEvent::Completed { tag, outcome } => (tag, outcome),
    };

    let message = match outcome {
        ApiOutcome::Sources(result) => Inbound::List(ListMsg::SourcesLoaded {
            request: tag,
            result: result.map_err(failure_from),
        }),
        ApiOutcome::Created(result) => Inbound::List(ListMsg::SourceCreated {
            result: result.map_err(failure_from),
        }),
        ApiOutcome::Deleted { source_id, result } => Inbound::List(ListMsg::SourceDeleted {
            source_id,
            result: result.map_err(failure_from),
        }),
        ApiOutcome::RefreshTriggered { source_id, result } => {
            Inbound::List(ListMsg::RefreshTriggered {
                source_id,
                result: result
                    .map(|receipt| {
                        engine_debug!(
                            "refresh of source #{source_id}: enqueued={} resolved={}",
                            receipt.enqueued,
                            receipt.resolved
                        );
                    })
                    .map_err(failure_from),
            })
        }
        ApiOutcome::Items { source_id, result } => Inbound::Feed(FeedMsg::ItemsLoaded {
            source_id,
            request: tag,
            result: result.map_err(failure_from),
        }),
        ApiOutcome::LatestJob { source_id, result } => Inbound::Feed(FeedMsg::JobLoaded {
            source_id,
            request: tag,
            result: result.map_err(failure_from),
        }),
        ApiOutcome::Summary { item_id, result } => Inbound::Feed(FeedMsg::SummaryLoaded {
            item_id,
            result: result.map(|summary| summary.summary).map_err(failure_from),
        }),
    };
    Some(message)
}

fn failure_from(err: ApiError) -> FetchFailure {
    match err.status() {
        Some(status) => FetchFailure::http(status, err.detail().unwrap_or_default()),
        None => FetchFailure::transport(err.to_string()),
    }
}
