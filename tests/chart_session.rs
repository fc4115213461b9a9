mod common;

use common::{Call, FakeFactory, ROOMY};
use live_candles_wasm::application::{ChartConfig, ChartSession, HistoryRequest, SessionCommand};
use live_candles_wasm::domain::chart::{FrameTicket, SurfaceState};
use live_candles_wasm::domain::errors::ChartError;
use live_candles_wasm::domain::events::{ChartEvent, RecordingDispatcher};
use live_candles_wasm::domain::market_data::{
    ConnectionStatus, HistoricalBar, Symbol, Timeframe, Timestamp,
};
use serde_json::json;

type Session = ChartSession<FakeFactory, RecordingDispatcher>;

fn session(factory: &FakeFactory) -> Session {
    ChartSession::new(
        factory.clone(),
        RecordingDispatcher::new(),
        ChartConfig::default(),
        Symbol::from("AAPL"),
        Timeframe::OneMinute,
    )
}

fn history_request(commands: &[SessionCommand]) -> HistoryRequest {
    commands
        .iter()
        .find_map(|c| match c {
            SessionCommand::FetchHistory(request) => Some(request.clone()),
            _ => None,
        })
        .expect("history requested")
}

fn frame_ticket(commands: &[SessionCommand]) -> Option<FrameTicket> {
    commands.iter().find_map(|c| match c {
        SessionCommand::RequestFrame(ticket) => Some(*ticket),
        _ => None,
    })
}

fn quote(secs: u64, price: f64) -> serde_json::Value {
    json!({"symbol": "AAPL", "price": price, "timestamp": secs * 1000})
}

fn bar(minute: u64, close: f64) -> HistoricalBar {
    HistoricalBar { timestamp: minute * 60_000, open: close, high: close, low: close, close }
}

fn now() -> Timestamp {
    Timestamp::from_millis(0)
}

/// Mounted session with a usable surface and its pending history request
fn mounted(factory: &FakeFactory) -> (Session, HistoryRequest) {
    let mut session = session(factory);
    let commands = session.mount();
    let request = history_request(&commands);
    session.on_container_measured(ROOMY);
    session.dispatcher().take();
    (session, request)
}

#[test]
fn mount_polls_container_and_requests_history() {
    let factory = FakeFactory::new();
    let mut session = session(&factory);
    let commands = session.mount();

    assert_eq!(commands[0], SessionCommand::PollContainer { after_ms: 0 });
    let request = history_request(&commands);
    assert_eq!(request.symbol.value(), "AAPL");
    assert_eq!(request.timeframe, Timeframe::OneMinute);
    assert_eq!(request.limit, 500);
    assert!(session.is_history_pending());
    assert_eq!(
        session.dispatcher().take(),
        vec![ChartEvent::SurfaceStateChanged {
            from: SurfaceState::Uninitialized,
            to: SurfaceState::ContainerPending
        }]
    );
}

#[test]
fn history_and_live_ticks_end_up_on_the_surface() {
    let factory = FakeFactory::new();
    let (mut session, request) = mounted(&factory);

    let commands = session.on_feed_message(&quote(125, 12.0), now());
    let ticket = frame_ticket(&commands).expect("frame requested");
    session.on_history_loaded(request.token, Ok(vec![bar(0, 10.0), bar(1, 11.0), bar(2, 11.5)]));

    assert_eq!(session.series().len(), 3);
    assert_eq!(session.series().last().map(|c| c.close.value()), Some(12.0));
    assert!(factory.calls().contains(&Call::SetData(3)));
    assert!(
        session
            .dispatcher()
            .take()
            .iter()
            .any(|e| matches!(e, ChartEvent::HistoricalDataLoaded { candle_count: 3, .. }))
    );

    session.on_feed_message(&quote(130, 12.5), now());
    factory.clear_calls();
    assert!(session.on_frame(ticket, 1000.0).is_empty());
    let updates: Vec<f64> = factory
        .calls()
        .iter()
        .filter_map(|c| match c {
            Call::Update(candle) => Some(candle.close.value()),
            _ => None,
        })
        .collect();
    assert_eq!(updates, vec![12.5]);
}

#[test]
fn candles_closed_during_fetch_survive_the_merge() {
    let factory = FakeFactory::new();
    let (mut session, request) = mounted(&factory);

    session.on_feed_message(&quote(60, 20.0), now());
    session.on_feed_message(&quote(125, 21.0), now());
    session.on_history_loaded(request.token, Ok(vec![bar(0, 10.0), bar(1, 11.0)]));

    let series = session.series();
    assert_eq!(series.get(60).map(|c| c.close.value()), Some(20.0));
    assert_eq!(series.last().map(|c| c.close.value()), Some(21.0));
}

#[test]
fn stale_history_result_is_ignored() {
    let factory = FakeFactory::new();
    let (mut session, first) = mounted(&factory);
    let second = history_request(&session.refresh());
    assert_ne!(first.token, second.token);

    assert!(session.on_history_loaded(first.token, Ok(vec![bar(0, 10.0)])).is_empty());
    assert!(session.series().is_empty());
    assert!(session.is_history_pending());
}

#[test]
fn fetch_failure_is_reported_and_live_data_continues() {
    let factory = FakeFactory::new();
    let (mut session, request) = mounted(&factory);

    session.on_history_loaded(request.token, Err(ChartError::HistoricalFetchFailure("503".into())));
    assert!(matches!(
        session.dispatcher().errors().as_slice(),
        [ChartError::HistoricalFetchFailure(_)]
    ));
    assert!(!session.is_history_pending());

    let ticket = frame_ticket(&session.on_feed_message(&quote(5, 30.0), now())).unwrap();
    session.on_frame(ticket, 0.0);
    assert_eq!(session.series().len(), 1);
    assert_eq!(session.in_progress().map(|c| c.close.value()), Some(30.0));
}

#[test]
fn retry_after_fetch_failure_refetches_and_keeps_live_candles() {
    let factory = FakeFactory::new();
    let (mut session, request) = mounted(&factory);
    session.on_history_loaded(request.token, Err(ChartError::HistoricalFetchFailure("503".into())));
    assert_eq!(session.state(), &SurfaceState::Ready);
    assert!(session.is_history_failed());

    session.on_feed_message(&quote(150, 40.0), now());
    session.on_feed_message(&quote(190, 41.0), now());

    let commands = session.retry();
    let retried = history_request(&commands);
    assert_ne!(retried.token, request.token);
    assert_eq!(commands.len(), 1);
    assert!(session.is_history_pending());
    assert!(session.retry().is_empty());

    session.on_history_loaded(retried.token, Ok(vec![bar(0, 10.0), bar(1, 11.0)]));
    assert!(!session.is_history_failed());
    let series = session.series();
    assert_eq!(series.len(), 4);
    assert_eq!(series.get(120).map(|c| c.close.value()), Some(40.0));
    assert_eq!(series.last().map(|c| c.close.value()), Some(41.0));
    assert!(session.retry().is_empty());
}

#[test]
fn retry_after_init_failure_polls_the_container_again() {
    let factory = FakeFactory::new();
    factory.fail_next_creates(1);
    let (mut session, _) = mounted(&factory);
    assert!(matches!(session.state(), SurfaceState::Error(_)));

    assert_eq!(session.retry(), vec![SessionCommand::PollContainer { after_ms: 0 }]);
    assert!(session.is_history_pending());
    session.on_container_measured(ROOMY);

    assert_eq!(session.state(), &SurfaceState::Ready);
    assert_eq!(factory.count(|c| matches!(c, Call::Create(_))), 2);
}

#[test]
fn malformed_ticks_are_counted_not_reported() {
    let factory = FakeFactory::new();
    let (mut session, _) = mounted(&factory);

    assert!(session.on_feed_message(&json!({"symbol": "AAPL"}), now()).is_empty());
    assert!(session.on_feed_message(&json!({"symbol": "MSFT", "price": 1.0}), now()).is_empty());
    assert_eq!(session.dropped_ticks(), 2);
    assert!(session.dispatcher().errors().is_empty());
}

#[test]
fn timeframe_switch_discards_in_progress_state() {
    let factory = FakeFactory::new();
    let (mut session, request) = mounted(&factory);
    session.on_feed_message(&quote(10, 50.0), now());
    session.on_history_loaded(request.token, Ok(vec![bar(0, 49.0)]));

    let commands = session.set_timeframe(Timeframe::FiveMinutes);
    let reload = history_request(&commands);

    assert_eq!(reload.timeframe, Timeframe::FiveMinutes);
    assert!(session.in_progress().is_none());
    assert!(session.series().is_empty());
    assert_eq!(session.state(), &SurfaceState::ContainerPending);
    assert!(commands.contains(&SessionCommand::CancelScheduledWork));
    assert!(session.set_timeframe(Timeframe::FiveMinutes).is_empty());
}

#[test]
fn pending_frame_from_before_a_switch_is_stale() {
    let factory = FakeFactory::new();
    let (mut session, _) = mounted(&factory);
    let ticket = frame_ticket(&session.on_feed_message(&quote(10, 50.0), now())).unwrap();

    session.set_timeframe(Timeframe::OneHour);
    factory.clear_calls();
    assert!(session.on_frame(ticket, 100.0).is_empty());
    assert!(factory.calls().is_empty());
}

#[test]
fn symbol_switch_resubscribes_before_reloading() {
    let factory = FakeFactory::new();
    let (mut session, _) = mounted(&factory);
    session.on_feed_message(&quote(10, 50.0), now());

    let commands = session.switch_symbol(Symbol::from("msft"));
    assert_eq!(commands[0], SessionCommand::Resubscribe(Symbol::from("MSFT")));
    assert_eq!(history_request(&commands).symbol.value(), "MSFT");
    assert!(session.in_progress().is_none());

    assert!(session.on_feed_message(&quote(20, 51.0), now()).is_empty());
    let ticket = session.on_feed_message(&json!({"symbol": "MSFT", "price": 400.0}), now());
    assert!(frame_ticket(&ticket).is_some());
    assert!(session.switch_symbol(Symbol::from("MSFT")).is_empty());
}

#[test]
fn connection_changes_are_published_once() {
    let factory = FakeFactory::new();
    let (mut session, _) = mounted(&factory);

    session.on_connection_status(ConnectionStatus::Connecting);
    session.on_connection_status(ConnectionStatus::Connected);
    session.on_connection_status(ConnectionStatus::Connected);

    let statuses: Vec<ConnectionStatus> = session
        .dispatcher()
        .take()
        .into_iter()
        .filter_map(|e| match e {
            ChartEvent::ConnectionStatusChanged { status, .. } => Some(status),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]);
    assert_eq!(session.connection_status(), ConnectionStatus::Connected);
}

#[test]
fn dispose_disconnects_once() {
    let factory = FakeFactory::new();
    let (mut session, request) = mounted(&factory);

    let commands = session.dispose();
    assert_eq!(commands, vec![SessionCommand::CancelScheduledWork, SessionCommand::Disconnect]);
    assert_eq!(session.state(), &SurfaceState::Disposed);
    assert!(session.is_disposed());

    assert!(session.dispose().is_empty());
    assert!(session.on_feed_message(&quote(1, 1.0), now()).is_empty());
    assert!(session.on_history_loaded(request.token, Ok(vec![bar(0, 1.0)])).is_empty());
    assert!(session.mount().is_empty());
    assert_eq!(factory.count(|c| *c == Call::Dispose), 1);
}

#[test]
fn in_memory_dispatcher_delivers_to_subscribers() {
    use live_candles_wasm::domain::events::{DomainEvent, InMemoryEventDispatcher};
    use std::cell::RefCell;
    use std::rc::Rc;

    let seen: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let mut dispatcher = InMemoryEventDispatcher::new();
    dispatcher.subscribe(move |event| sink.borrow_mut().push(event.event_type()));

    let factory = FakeFactory::new();
    let mut session =
        ChartSession::new(factory.clone(), dispatcher, ChartConfig::default(), Symbol::from("AAPL"), Timeframe::OneMinute);
    session.mount();
    session.on_container_measured(ROOMY);
    session.on_connection_status(ConnectionStatus::Connected);

    assert_eq!(
        *seen.borrow(),
        vec!["SurfaceStateChanged", "SurfaceStateChanged", "SurfaceStateChanged", "ConnectionStatusChanged"]
    );
}
