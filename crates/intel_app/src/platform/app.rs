use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use engine_logging::{engine_debug, engine_info, engine_warn, set_poll_cycle};
use intel_core::{
    item_columns, source_columns, summarize_sources, update_feed, update_list, FeedMsg,
    FeedState, Item, ListMsg, ListState, RowAction, RowActions, Source, SourceId, SyncStatus,
    TableEngine, TableError,
};
use intel_engine::EngineHandle;

use super::effects::{EffectRunner, Inbound, LocalAction};
use super::logging;
use super::settings::{self, Args, Resolved, Settings, BASE_URL_ENV};
use super::ui::commands::{self, Command, HELP};
use super::ui::render;

pub fn run_app() -> anyhow::Result<()> {
    let args = Args::parse();
    let loaded = Settings::load(&args.settings);
    let file_settings = match &loaded {
        Ok(settings) => settings.clone(),
        Err(_) => Settings::default(),
    };
    let resolved = settings::resolve(&args, &file_settings, std::env::var(BASE_URL_ENV).ok())?;

    logging::initialize(resolved.log, resolved.level, &resolved.log_file);
    if let Err(err) = &loaded {
        engine_warn!("{err}; using default settings");
    }
    engine_info!("intel starting against {}", resolved.sync.base_url);

    let engine = EngineHandle::new(resolved.api.clone()).context("could not set up the HTTP client")?;
    let (inbound_tx, inbound_rx) = mpsc::channel();
    let runner = EffectRunner::new(engine, inbound_tx.clone());
    if !resolved.once {
        spawn_stdin_reader(inbound_tx.clone());
    }

    let mut app = App::new(runner, &resolved, inbound_tx, io::stdout())?;
    app.start(resolved.source)?;
    app.run(inbound_rx)
}

fn spawn_stdin_reader(inbound: mpsc::Sender<Inbound>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if inbound.send(Inbound::Line(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    engine_warn!("stdin read failed: {err}");
                    break;
                }
            }
        }
        let _ = inbound.send(Inbound::InputClosed);
    });
}

/// Row action slots of the source table. Each handler only forwards the id
/// to the list controller.
fn row_actions(inbound: mpsc::Sender<Inbound>) -> RowActions<SourceId> {
    let forward = |make: fn(SourceId) -> ListMsg| {
        let inbound = inbound.clone();
        move |source_id: SourceId| {
            let _ = inbound.send(Inbound::List(make(source_id)));
        }
    };
    RowActions::new()
        .on_refresh(forward(ListMsg::RefreshRequested))
        .on_delete(forward(ListMsg::DeleteRequested))
        .with(RowAction::Open, forward(ListMsg::OpenRequested))
        .with(RowAction::OpenExternal, forward(ListMsg::OpenExternalRequested))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    List,
    Feed,
}

impl Route {
    fn describe(self) -> &'static str {
        match self {
            Route::List => "the source list",
            Route::Feed => "an item feed",
        }
    }
}

// Runs `$body` against the table engine of the current route.
macro_rules! with_table {
    ($app:expr, $table:ident => $body:expr) => {
        match $app.route {
            Route::List => {
                let $table = &mut $app.sources;
                $body
            }
            Route::Feed => {
                let $table = &mut $app.items;
                $body
            }
        }
    };
}

struct App<W: Write> {
    runner: EffectRunner,
    out: W,
    route: Route,
    list: ListState,
    feed: FeedState,
    sources: TableEngine<Source>,
    items: TableEngine<Item>,
    actions: RowActions<SourceId>,
    once: bool,
    poll_cycle: u64,
    redraw: bool,
    quit: bool,
    last_frame: String,
}

impl<W: Write> App<W> {
    fn new(
        runner: EffectRunner,
        resolved: &Resolved,
        inbound: mpsc::Sender<Inbound>,
        out: W,
    ) -> anyhow::Result<Self> {
        let actions = row_actions(inbound);
        let page_size = resolved.sync.page_size as usize;
        let sources = TableEngine::with_page_size(source_columns(&actions.available())?, page_size);
        let items = TableEngine::with_page_size(item_columns()?, page_size);
        Ok(Self {
            runner,
            out,
            route: Route::List,
            list: ListState::new(resolved.sync.clone()),
            feed: FeedState::new(resolved.sync.clone()),
            sources,
            items,
            actions,
            once: resolved.once,
            poll_cycle: 0,
            redraw: false,
            quit: false,
            last_frame: String::new(),
        })
    }

    fn start(&mut self, source: Option<SourceId>) -> anyhow::Result<()> {
        match source {
            Some(source_id) => {
                self.route = Route::Feed;
                self.dispatch_feed(FeedMsg::Mounted { source_id })
            }
            None => {
                self.route = Route::List;
                self.dispatch_list(ListMsg::Mounted)
            }
        }
    }

    fn run(mut self, inbound: mpsc::Receiver<Inbound>) -> anyhow::Result<()> {
        if !self.once {
            writeln!(self.out, "Type `help` for commands.")?;
        }
        while let Ok(message) = inbound.recv() {
            match message {
                Inbound::Line(line) => self.handle_line(&line)?,
                Inbound::InputClosed => self.quit = true,
                Inbound::List(msg) => self.dispatch_list(msg)?,
                Inbound::Feed(msg) => self.dispatch_feed(msg)?,
            }
            if self.once {
                if let Some(outcome) = self.settled() {
                    self.render(true)?;
                    self.shutdown();
                    return outcome;
                }
                continue;
            }
            if self.quit {
                break;
            }
            self.render_if_changed()?;
        }
        self.shutdown();
        Ok(())
    }

    /// For `--once`: the first fetch of the current view has finished.
    fn settled(&self) -> Option<anyhow::Result<()>> {
        let snapshot = match self.route {
            Route::List => self.list.snapshot(),
            Route::Feed => self.feed.snapshot(),
        };
        match snapshot.status {
            SyncStatus::Ready => Some(Ok(())),
            SyncStatus::Error => Some(Err(anyhow::anyhow!(
                "fetch failed: {}",
                snapshot.error.unwrap_or_default()
            ))),
            SyncStatus::Idle | SyncStatus::Loading => None,
        }
    }

    fn shutdown(&mut self) {
        let result = match self.route {
            Route::List => self.dispatch_list(ListMsg::Unmounted),
            Route::Feed => self.dispatch_feed(FeedMsg::Unmounted),
        };
        if let Err(err) = result {
            engine_warn!("shutdown: {err}");
        }
        engine_info!("intel stopped");
    }

    fn next_cycle(&mut self) {
        self.poll_cycle += 1;
        set_poll_cycle(self.poll_cycle);
    }

    fn dispatch_list(&mut self, msg: ListMsg) -> anyhow::Result<()> {
        if matches!(msg, ListMsg::PollTick { .. }) {
            self.next_cycle();
        }
        let state = std::mem::take(&mut self.list);
        let (state, effects) = update_list(state, msg);
        self.list = state;

        for action in self.runner.run_list(effects) {
            match action {
                LocalAction::Navigate(source_id) => self.open_feed(source_id)?,
                LocalAction::OpenExternal(url) => {
                    writeln!(self.out, "Open in browser: {url}")?;
                }
            }
        }
        Ok(())
    }

    fn dispatch_feed(&mut self, msg: FeedMsg) -> anyhow::Result<()> {
        if matches!(msg, FeedMsg::PollTick { .. }) {
            self.next_cycle();
        }
        let state = std::mem::take(&mut self.feed);
        let (state, effects) = update_feed(state, msg);
        self.feed = state;
        self.runner.run_feed(effects);
        Ok(())
    }

    fn open_feed(&mut self, source_id: SourceId) -> anyhow::Result<()> {
        self.dispatch_list(ListMsg::Unmounted)?;
        self.route = Route::Feed;
        self.items.set_global_filter("");
        self.redraw = true;
        self.dispatch_feed(FeedMsg::Mounted { source_id })
    }

    fn back_to_list(&mut self) -> anyhow::Result<()> {
        self.dispatch_feed(FeedMsg::Unmounted)?;
        self.route = Route::List;
        self.redraw = true;
        self.dispatch_list(ListMsg::Mounted)
    }

    fn handle_line(&mut self, line: &str) -> anyhow::Result<()> {
        let command = match commands::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(()),
            Err(err) => {
                writeln!(self.out, "{err}")?;
                return Ok(());
            }
        };
        engine_debug!("command {command:?}");

        match command {
            Command::Search(text) => {
                with_table!(self, table => table.set_global_filter(text));
                self.redraw = true;
            }
            Command::Filter { column, text } => {
                let result = with_table!(self, table => table.set_column_filter(&column, text));
                self.table_result(result)?;
            }
            Command::Sort(column) => {
                let result = with_table!(self, table => table.set_sort(&column).map(|_| ()));
                self.table_result(result)?;
            }
            Command::Hide(column) => {
                let result =
                    with_table!(self, table => table.set_column_visibility(&column, false));
                self.table_result(result)?;
            }
            Command::Show(column) => {
                let result =
                    with_table!(self, table => table.set_column_visibility(&column, true));
                self.table_result(result)?;
            }
            Command::Page(page) => match self.route {
                Route::List => {
                    self.sources.set_page(page.saturating_sub(1) as usize);
                    self.redraw = true;
                }
                Route::Feed => self.dispatch_feed(FeedMsg::PageChanged(page))?,
            },
            Command::Next => match self.route {
                Route::List => {
                    self.sources.next_page();
                    self.redraw = true;
                }
                Route::Feed => {
                    let view = self.feed.view();
                    if view.page < view.page_count {
                        self.dispatch_feed(FeedMsg::PageChanged(view.page + 1))?;
                    }
                }
            },
            Command::Prev => match self.route {
                Route::List => {
                    self.sources.previous_page();
                    self.redraw = true;
                }
                Route::Feed => {
                    let page = self.feed.view().page.saturating_sub(1);
                    self.dispatch_feed(FeedMsg::PageChanged(page))?;
                }
            },
            Command::Add(address) => {
                if self.require(Route::List, "add")? {
                    self.dispatch_list(ListMsg::InputChanged(address))?;
                    self.dispatch_list(ListMsg::SubmitClicked)?;
                }
            }
            Command::Row { action, source_id } => {
                if self.require(Route::List, action.name())?
                    && !self.actions.dispatch(action, source_id)
                {
                    writeln!(self.out, "`{}` is not available", action.name())?;
                }
            }
            Command::Query(text) => {
                if self.require(Route::Feed, "query")? {
                    self.dispatch_feed(FeedMsg::QueryChanged(text))?;
                }
            }
            Command::Summarize(item_id) => {
                if self.require(Route::Feed, "summarize")? {
                    self.dispatch_feed(FeedMsg::SummarizeRequested(item_id))?;
                }
            }
            Command::Dismiss => {
                if self.require(Route::List, "dismiss")? {
                    self.dispatch_list(ListMsg::NoticeDismissed)?;
                }
            }
            Command::Reload => match self.route {
                Route::List => self.dispatch_list(ListMsg::ReloadRequested)?,
                Route::Feed => self.dispatch_feed(FeedMsg::ReloadRequested)?,
            },
            Command::Back => {
                if self.require(Route::Feed, "back")? {
                    self.back_to_list()?;
                }
            }
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Quit => self.quit = true,
        }
        Ok(())
    }

    fn require(&mut self, route: Route, command: &str) -> anyhow::Result<bool> {
        if self.route == route {
            return Ok(true);
        }
        writeln!(self.out, "`{command}` only works on {}", route.describe())?;
        Ok(false)
    }

    fn table_result(&mut self, result: Result<(), TableError>) -> anyhow::Result<()> {
        match result {
            Ok(()) => self.redraw = true,
            Err(err) => writeln!(self.out, "{err}")?,
        }
        Ok(())
    }

    // Redraws on user commands, and on data changes once a fetch has landed.
    fn render_if_changed(&mut self) -> anyhow::Result<()> {
        let list_dirty = self.list.consume_dirty();
        let feed_dirty = self.feed.consume_dirty();
        let forced = std::mem::take(&mut self.redraw);
        let (dirty, snapshot) = match self.route {
            Route::List => (list_dirty, self.list.snapshot()),
            Route::Feed => (feed_dirty, self.feed.snapshot()),
        };
        if forced || (dirty && !snapshot.is_loading()) {
            self.render(forced)?;
        }
        Ok(())
    }

    fn render(&mut self, force: bool) -> anyhow::Result<()> {
        let frame = match self.route {
            Route::List => {
                let summary = summarize_sources(self.list.sources(), Utc::now().date_naive());
                let table = self.sources.view(self.list.sources());
                render::render_list(&self.list.view(), summary, &table)
            }
            Route::Feed => {
                let table = self.items.view(self.feed.items());
                render::render_feed(&self.feed.view(), &table)
            }
        };
        if !force && frame == self.last_frame {
            return Ok(());
        }
        write!(self.out, "\n{frame}")?;
        self.out.flush()?;
        self.last_frame = frame;
        Ok(())
    }
}
