use crate::domain::chart::SurfaceState;
use crate::domain::errors::ChartError;
use crate::domain::market_data::{ConnectionStatus, Symbol, Timeframe};
use std::cell::RefCell;
use std::fmt::Debug;

/// Base trait for events published to the owner of a chart
pub trait DomainEvent: Debug + Clone {
    fn event_type(&self) -> &'static str;
}

/// Status and error notifications of one chart instance
#[derive(Debug, Clone, PartialEq)]
pub enum ChartEvent {
    SurfaceStateChanged {
        from: SurfaceState,
        to: SurfaceState,
    },
    ConnectionStatusChanged {
        symbol: Symbol,
        status: ConnectionStatus,
    },
    HistoricalDataLoaded {
        symbol: Symbol,
        timeframe: Timeframe,
        candle_count: usize,
    },
    ErrorRaised(ChartError),
}

impl DomainEvent for ChartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ChartEvent::SurfaceStateChanged { .. } => "SurfaceStateChanged",
            ChartEvent::ConnectionStatusChanged { .. } => "ConnectionStatusChanged",
            ChartEvent::HistoricalDataLoaded { .. } => "HistoricalDataLoaded",
            ChartEvent::ErrorRaised(_) => "ErrorRaised",
        }
    }
}

/// Event dispatcher for publishing events
pub trait EventDispatcher {
    fn publish(&self, event: ChartEvent);
}

/// Simple in-memory event dispatcher
#[derive(Default)]
pub struct InMemoryEventDispatcher {
    handlers: Vec<Box<dyn Fn(&ChartEvent)>>,
}

impl InMemoryEventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: Fn(&ChartEvent) + 'static,
    {
        self.handlers.push(Box::new(handler));
    }
}

impl EventDispatcher for InMemoryEventDispatcher {
    fn publish(&self, event: ChartEvent) {
        for handler in &self.handlers {
            handler(&event);
        }
    }
}

/// Dispatcher that keeps every event, for inspection
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: RefCell<Vec<ChartEvent>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<ChartEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn errors(&self) -> Vec<ChartError> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                ChartEvent::ErrorRaised(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }
}

impl EventDispatcher for RecordingDispatcher {
    fn publish(&self, event: ChartEvent) {
        self.events.borrow_mut().push(event);
    }
}
