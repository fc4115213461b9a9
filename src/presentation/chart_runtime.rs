//! Browser driver of a [`ChartSession`].
//!
//! Carries out session commands with timers, animation frames, fetches and
//! the feed connection, and feeds their results back into the session.
//! Events are collected while the session is borrowed and delivered to
//! listeners afterwards, so a listener may call back into the runtime.

use crate::application::{ChartConfig, ChartSession, HistoryRequest, SessionCommand};
use crate::domain::chart::{FrameTicket, HostContainer, SurfaceState};
use crate::domain::events::{ChartEvent, DomainEvent, RecordingDispatcher};
use crate::domain::logging::{LogComponent, get_logger};
use crate::domain::market_data::repositories::HistoricalBarsSource;
use crate::domain::market_data::{ConnectionStatus, Subscription, Symbol, Timeframe, Timestamp};
use crate::infrastructure::http::HistoricalBarsClient;
use crate::infrastructure::rendering::{CanvasSurfaceFactory, DomContainer};
use crate::infrastructure::websocket::{GlooFeedTransport, ReconnectBackoff, StreamCommand, StreamConnectionManager};
use futures::channel::mpsc::{self, UnboundedSender};
use futures::channel::oneshot;
use futures::future::{AbortHandle, Abortable};
use gloo::events::EventListener;
use gloo_timers::future::TimeoutFuture;
use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlElement;

type Session = ChartSession<CanvasSurfaceFactory, RecordingDispatcher>;
type Listener = Rc<dyn Fn(&ChartEvent)>;

struct RuntimeState {
    session: Session,
    container: DomContainer,
    history: HistoricalBarsClient,
    stream: Option<UnboundedSender<StreamCommand>>,
    resize_listener: Option<EventListener>,
}

#[derive(Default)]
struct Scheduled {
    poll: Option<AbortHandle>,
    resize_check: Option<AbortHandle>,
    frame: Option<AbortHandle>,
    history: Option<AbortHandle>,
}

impl Scheduled {
    fn replace(slot: &mut Option<AbortHandle>, handle: AbortHandle) {
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn cancel_timers(&mut self) {
        for handle in [self.poll.take(), self.resize_check.take(), self.frame.take()].into_iter().flatten() {
            handle.abort();
        }
    }

    fn cancel_history(&mut self) {
        if let Some(handle) = self.history.take() {
            handle.abort();
        }
    }
}

struct Shared {
    state: RefCell<RuntimeState>,
    scheduled: RefCell<Scheduled>,
    listeners: RefCell<Vec<Listener>>,
}

/// Handle to one chart living in a DOM element
#[derive(Clone)]
pub struct ChartRuntime {
    shared: Rc<Shared>,
}

impl ChartRuntime {
    pub fn new(element: HtmlElement, config: ChartConfig, symbol: Symbol, timeframe: Timeframe) -> Self {
        let container = DomContainer::new(element);
        let history = HistoricalBarsClient::new(config.history_url.clone());
        let factory = CanvasSurfaceFactory::new(container.clone());
        let session = ChartSession::new(factory, RecordingDispatcher::new(), config, symbol, timeframe);
        let state = RuntimeState { session, container, history, stream: None, resize_listener: None };
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(state),
                scheduled: RefCell::new(Scheduled::default()),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn subscribe<L>(&self, listener: L)
    where
        L: Fn(&ChartEvent) + 'static,
    {
        self.shared.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Attach to the container, open the feed and load history
    pub fn start(&self) {
        {
            let state = self.shared.state.borrow();
            if state.stream.is_some() || state.session.is_disposed() {
                return;
            }
        }
        self.watch_resizes();
        self.open_stream();
        dispatch(&self.shared, |session| session.mount());
    }

    pub fn set_timeframe(&self, timeframe: Timeframe) {
        dispatch(&self.shared, |session| session.set_timeframe(timeframe));
    }

    pub fn switch_symbol(&self, symbol: Symbol) {
        dispatch(&self.shared, |session| session.switch_symbol(symbol));
    }

    pub fn refresh(&self) {
        dispatch(&self.shared, |session| session.refresh());
    }

    pub fn retry(&self) {
        dispatch(&self.shared, |session| session.retry());
    }

    pub fn dispose(&self) {
        dispatch(&self.shared, |session| session.dispose());
        self.shared.state.borrow_mut().resize_listener = None;
    }

    pub fn state(&self) -> SurfaceState {
        self.shared.state.borrow().session.state().clone()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.shared.state.borrow().session.connection_status()
    }

    pub fn symbol(&self) -> Symbol {
        self.shared.state.borrow().session.symbol().clone()
    }

    pub fn timeframe(&self) -> Timeframe {
        self.shared.state.borrow().session.timeframe()
    }

    pub fn candle_count(&self) -> usize {
        self.shared.state.borrow().session.series().len()
    }

    fn watch_resizes(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let weak = Rc::downgrade(&self.shared);
        let listener = EventListener::new(&window, "resize", move |_| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let dimensions = shared.state.borrow().container.measure();
            dispatch(&shared, |session| session.on_container_resized(dimensions, now_ms()));
        });
        self.shared.state.borrow_mut().resize_listener = Some(listener);
    }

    fn open_stream(&self) {
        let (symbol, channels, config) = {
            let state = self.shared.state.borrow();
            let config = state.session.config().clone();
            (state.session.symbol().clone(), config.channels.clone(), config)
        };
        let transport = GlooFeedTransport::new(config.feed_url.clone());
        let backoff = ReconnectBackoff::new(config.reconnect_initial_secs, config.reconnect_max_secs);
        let mut manager = StreamConnectionManager::new(transport, Subscription::new(symbol, channels.clone()), backoff);

        get_logger().debug(
            LogComponent::Presentation("ChartRuntime"),
            &format!("routing {:?} of {} into the chart", channels, config.feed_url),
        );
        for channel in channels {
            let weak = Rc::downgrade(&self.shared);
            manager.on_message(channel, move |payload| {
                if let Some(shared) = weak.upgrade() {
                    let arrival = Timestamp::from_millis(js_sys::Date::now() as u64);
                    dispatch(&shared, |session| session.on_feed_message(payload, arrival));
                }
            });
        }
        let weak = Rc::downgrade(&self.shared);
        manager.on_status(move |_, status| {
            if let Some(shared) = weak.upgrade() {
                dispatch(&shared, |session| {
                    session.on_connection_status(status);
                    Vec::new()
                });
            }
        });

        let (sender, receiver) = mpsc::unbounded();
        self.shared.state.borrow_mut().stream = Some(sender);
        spawn_local(async move {
            manager.run(receiver, |delay| gloo_timers::future::sleep(delay)).await;
            get_logger().debug(LogComponent::Presentation("ChartRuntime"), "feed loop finished");
        });
    }
}

/// Run one session entry point, then its commands, then deliver its events
fn dispatch<F>(shared: &Rc<Shared>, f: F)
where
    F: FnOnce(&mut Session) -> Vec<SessionCommand>,
{
    let (commands, events) = match shared.state.try_borrow_mut() {
        Ok(mut state) => {
            let commands = f(&mut state.session);
            let events = state.session.dispatcher().take();
            (commands, events)
        }
        Err(_) => {
            get_logger().error(
                LogComponent::Presentation("ChartRuntime"),
                "re-entrant chart call ignored",
            );
            return;
        }
    };
    execute(shared, commands);
    notify(shared, events);
}

fn execute(shared: &Rc<Shared>, commands: Vec<SessionCommand>) {
    for command in commands {
        match command {
            SessionCommand::PollContainer { after_ms } => {
                let handle = schedule_poll(Rc::downgrade(shared), after_ms);
                Scheduled::replace(&mut shared.scheduled.borrow_mut().poll, handle);
            }
            SessionCommand::ScheduleResizeCheck { after_ms } => {
                let handle = schedule_resize_check(Rc::downgrade(shared), after_ms);
                Scheduled::replace(&mut shared.scheduled.borrow_mut().resize_check, handle);
            }
            SessionCommand::RequestFrame(ticket) => {
                let handle = schedule_frame(Rc::downgrade(shared), ticket);
                Scheduled::replace(&mut shared.scheduled.borrow_mut().frame, handle);
            }
            SessionCommand::FetchHistory(request) => {
                let client = shared.state.borrow().history.clone();
                let handle = fetch_history(Rc::downgrade(shared), client, request);
                Scheduled::replace(&mut shared.scheduled.borrow_mut().history, handle);
            }
            SessionCommand::CancelScheduledWork => shared.scheduled.borrow_mut().cancel_timers(),
            SessionCommand::Resubscribe(symbol) => send_stream(shared, StreamCommand::SwitchSymbol(symbol)),
            SessionCommand::Disconnect => {
                shared.scheduled.borrow_mut().cancel_history();
                send_stream(shared, StreamCommand::Disconnect);
                shared.state.borrow_mut().stream = None;
            }
        }
    }
}

fn notify(shared: &Rc<Shared>, events: Vec<ChartEvent>) {
    if events.is_empty() {
        return;
    }
    let listeners: Vec<Listener> = shared.listeners.borrow().iter().cloned().collect();
    for event in &events {
        crate::log_trace!(LogComponent::Presentation("ChartRuntime"), "delivering {}", event.event_type());
        for listener in &listeners {
            listener(event);
        }
    }
}

fn send_stream(shared: &Rc<Shared>, command: StreamCommand) {
    if let Some(sender) = shared.state.borrow().stream.as_ref() {
        if sender.unbounded_send(command).is_err() {
            get_logger().warn(LogComponent::Presentation("ChartRuntime"), "feed loop already stopped");
        }
    }
}

fn spawn_abortable<F>(future: F) -> AbortHandle
where
    F: Future<Output = ()> + 'static,
{
    let (handle, registration) = AbortHandle::new_pair();
    spawn_local(async move {
        let _ = Abortable::new(future, registration).await;
    });
    handle
}

fn schedule_poll(weak: Weak<Shared>, after_ms: u32) -> AbortHandle {
    spawn_abortable(async move {
        TimeoutFuture::new(after_ms).await;
        if let Some(shared) = weak.upgrade() {
            let dimensions = shared.state.borrow().container.measure();
            dispatch(&shared, |session| session.on_container_measured(dimensions));
        }
    })
}

fn schedule_resize_check(weak: Weak<Shared>, after_ms: u32) -> AbortHandle {
    spawn_abortable(async move {
        TimeoutFuture::new(after_ms).await;
        if let Some(shared) = weak.upgrade() {
            dispatch(&shared, |session| session.on_resize_deadline(now_ms()));
        }
    })
}

fn schedule_frame(weak: Weak<Shared>, ticket: FrameTicket) -> AbortHandle {
    spawn_abortable(async move {
        let timestamp = next_frame().await;
        if let Some(shared) = weak.upgrade() {
            dispatch(&shared, |session| session.on_frame(ticket, timestamp));
        }
    })
}

fn fetch_history(weak: Weak<Shared>, client: HistoricalBarsClient, request: HistoryRequest) -> AbortHandle {
    spawn_abortable(async move {
        let result = client.fetch_bars(&request.symbol, request.timeframe, request.limit).await;
        if let Some(shared) = weak.upgrade() {
            dispatch(&shared, |session| session.on_history_loaded(request.token, result));
        }
    })
}

/// Resolves on the next animation frame with its timestamp
async fn next_frame() -> f64 {
    let (sender, receiver) = oneshot::channel();
    let _frame = gloo::render::request_animation_frame(move |timestamp| {
        let _ = sender.send(timestamp);
    });
    receiver.await.unwrap_or_else(|_| now_ms())
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|window| window.performance())
        .map(|performance| performance.now())
        .unwrap_or_else(js_sys::Date::now)
}
