use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use engine_logging::{
    engine_debug, engine_error, engine_info, in_poll_cycle, poll_cycle, set_poll_cycle,
};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::client::{ApiClient, ApiSettings, ReqwestApiClient};
use crate::{ApiError, ApiOutcome, ApiRequest, EngineEvent, Tag};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

enum EngineCommand {
    Call {
        tag: Tag,
        request: ApiRequest,
    },
    ArmPoll {
        name: &'static str,
        timer: u64,
        interval: Duration,
    },
    DisarmPoll {
        name: &'static str,
        timer: u64,
    },
}

// Each command carries the poll cycle of the thread that sent it.
type Envelope = (u64, EngineCommand);

/// Runs API calls and poll timers on a background tokio runtime and reports
/// results as [`EngineEvent`]s. The runtime stops once every handle is
/// dropped.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<Envelope>,
    events: EngineEvents,
}

/// Receiving half of the event stream. Holding it does not keep the engine
/// running.
#[derive(Clone)]
pub struct EngineEvents {
    rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineEvents {
    /// Blocks for the next event. `None` once the engine has stopped and
    /// every pending event was taken.
    pub fn next(&self) -> Option<EngineEvent> {
        self.rx.lock().ok()?.recv().ok()
    }
}

impl EngineHandle {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = ReqwestApiClient::new(settings)?;
        Ok(Self::with_client(Arc::new(client)))
    }

    pub fn with_client(client: Arc<dyn ApiClient>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_error!("could not start engine runtime: {err}");
                    return;
                }
            };
            let mut timers: HashMap<&'static str, (u64, CancellationToken)> = HashMap::new();
            while let Ok((cycle, command)) = cmd_rx.recv() {
                set_poll_cycle(cycle);
                match command {
                    EngineCommand::Call { tag, request } => {
                        let client = client.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(in_poll_cycle(
                            cycle,
                            Box::pin(async move {
                                let outcome = execute(client.as_ref(), request).await;
                                let _ = event_tx.send(EngineEvent::Completed { tag, outcome });
                            }),
                        ));
                    }
                    EngineCommand::ArmPoll {
                        name,
                        timer,
                        interval,
                    } => {
                        let token = CancellationToken::new();
                        if let Some((previous, old)) = timers.insert(name, (timer, token.clone())) {
                            engine_debug!("poll {name}: timer {previous} replaced by {timer}");
                            old.cancel();
                        }
                        runtime.spawn(in_poll_cycle(
                            cycle,
                            Box::pin(run_timer(name, timer, interval, token, event_tx.clone())),
                        ));
                    }
                    EngineCommand::DisarmPoll { name, timer } => {
                        if timers.get(name).is_some_and(|(armed, _)| *armed == timer) {
                            if let Some((_, token)) = timers.remove(name) {
                                token.cancel();
                            }
                        }
                    }
                }
            }
            for (_, (_, token)) in timers.drain() {
                token.cancel();
            }
            engine_info!("engine stopped");
        });

        Self {
            cmd_tx,
            events: EngineEvents {
                rx: Arc::new(Mutex::new(event_rx)),
            },
        }
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send((poll_cycle(), command));
    }

    pub fn call(&self, tag: Tag, request: ApiRequest) {
        self.send(EngineCommand::Call { tag, request });
    }

    /// Starts emitting `PollTick { name, timer }` every `interval`, first
    /// after one full interval. Re-arming `name` cancels its previous timer.
    pub fn arm_poll(&self, name: &'static str, timer: u64, interval: Duration) {
        self.send(EngineCommand::ArmPoll {
            name,
            timer,
            interval,
        });
    }

    /// Cancels `timer` if it is still the one armed under `name`.
    pub fn disarm_poll(&self, name: &'static str, timer: u64) {
        self.send(EngineCommand::DisarmPoll { name, timer });
    }

    /// Shares the event stream without keeping the engine alive.
    pub fn events(&self) -> EngineEvents {
        self.events.clone()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.events.rx.lock().ok()?.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.events.rx.lock().ok()?.recv_timeout(timeout).ok()
    }
}

async fn run_timer(
    name: &'static str,
    timer: u64,
    interval: Duration,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let interval = interval.max(MIN_POLL_INTERVAL);
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    while token.run_until_cancelled(ticker.tick()).await.is_some() {
        if event_tx.send(EngineEvent::PollTick { name, timer }).is_err() {
            break;
        }
    }
    engine_debug!("poll {name}: timer {timer} stopped");
}

async fn execute(client: &dyn ApiClient, request: ApiRequest) -> ApiOutcome {
    match request {
        ApiRequest::ListSources => ApiOutcome::Sources(client.list_sources().await),
        ApiRequest::CreateSource { address } => {
            ApiOutcome::Created(client.create_source(&address).await)
        }
        ApiRequest::DeleteSource { source_id } => ApiOutcome::Deleted {
            source_id,
            result: client.delete_source(source_id).await,
        },
        ApiRequest::TriggerRefresh { source_id } => ApiOutcome::RefreshTriggered {
            source_id,
            result: client.trigger_refresh(source_id).await,
        },
        ApiRequest::ListItems { source_id, query } => ApiOutcome::Items {
            source_id,
            result: client.list_items(source_id, &query).await,
        },
        ApiRequest::LatestJob { source_id } => ApiOutcome::LatestJob {
            source_id,
            result: client.latest_job(source_id).await,
        },
        ApiRequest::Summarize { item_id } => ApiOutcome::Summary {
            item_id,
            result: client.summarize(item_id).await,
        },
    }
}
