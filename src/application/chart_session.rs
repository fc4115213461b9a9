//! One chart instance: live ticks and fetched history in, surface calls out.
//!
//! The session is synchronous and owns no timers, sockets or futures. Each
//! entry point returns the [`SessionCommand`]s the host driver has to carry
//! out; their results come back through the matching `on_*` method.

use super::config::ChartConfig;
use crate::domain::chart::{
    Dimensions, FrameOutcome, FrameTicket, LifecycleCommand, LifecycleEvent, SurfaceFactory,
    SurfaceLifecycle, SurfaceState, UpdateScheduler,
};
use crate::domain::errors::ChartError;
use crate::domain::events::{ChartEvent, EventDispatcher};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{
    Candle, CandleBucketer, CandleSeries, ConnectionStatus, HistoricalBar, HistoricalMerge, Symbol,
    Timeframe, Timestamp, TickNormalizer,
};
use crate::{log_debug, log_info, log_trace, log_warn};
use serde_json::Value;

/// Parameters of one historical fetch. `token` identifies the fetch so
/// results of superseded requests can be told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub limit: usize,
    pub token: u64,
}

/// Side effects the host driver performs on behalf of the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Measure the container after `after_ms` and report it back
    PollContainer { after_ms: u32 },
    /// Call [`ChartSession::on_resize_deadline`] after `after_ms`
    ScheduleResizeCheck { after_ms: u32 },
    /// Call [`ChartSession::on_frame`] on the next animation frame
    RequestFrame(FrameTicket),
    FetchHistory(HistoryRequest),
    /// Drop every pending timer and frame callback
    CancelScheduledWork,
    /// Move the feed subscription to another symbol
    Resubscribe(Symbol),
    Disconnect,
}

pub struct ChartSession<F, D>
where
    F: SurfaceFactory + Clone,
    D: EventDispatcher,
{
    config: ChartConfig,
    timeframe: Timeframe,
    normalizer: TickNormalizer,
    bucketer: CandleBucketer,
    merger: HistoricalMerge,
    scheduler: UpdateScheduler,
    lifecycle: SurfaceLifecycle<F>,
    dispatcher: D,
    /// Candles closed live since the last successful history merge
    live_closed: Vec<Candle>,
    history_token: u64,
    history_pending: bool,
    /// Last fetch failed; live candles are kept for the next merge
    history_failed: bool,
    connection: ConnectionStatus,
    disposed: bool,
}

impl<F, D> ChartSession<F, D>
where
    F: SurfaceFactory + Clone,
    D: EventDispatcher,
{
    pub fn new(factory: F, dispatcher: D, config: ChartConfig, symbol: Symbol, timeframe: Timeframe) -> Self {
        let lifecycle = SurfaceLifecycle::new(factory, config.lifecycle());
        let scheduler = UpdateScheduler::new(config.min_frame_interval_ms);
        Self {
            normalizer: TickNormalizer::new(symbol.clone()),
            bucketer: CandleBucketer::new(symbol, timeframe),
            merger: HistoricalMerge::new(),
            scheduler,
            lifecycle,
            dispatcher,
            config,
            timeframe,
            live_closed: Vec::new(),
            history_token: 0,
            history_pending: false,
            history_failed: false,
            connection: ConnectionStatus::Disconnected,
            disposed: false,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        self.normalizer.symbol()
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn state(&self) -> &SurfaceState {
        self.lifecycle.state()
    }

    /// Data currently held for the surface, rendered or buffered
    pub fn series(&self) -> &CandleSeries {
        self.lifecycle.series()
    }

    pub fn in_progress(&self) -> Option<&Candle> {
        self.bucketer.in_progress()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn dropped_ticks(&self) -> u64 {
        self.normalizer.dropped_count()
    }

    pub fn rejected_bars(&self) -> usize {
        self.merger.rejected_count()
    }

    pub fn is_history_pending(&self) -> bool {
        self.history_pending
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn lifecycle(&self) -> &SurfaceLifecycle<F> {
        &self.lifecycle
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Start polling for the container and request the initial history
    pub fn mount(&mut self) -> Vec<SessionCommand> {
        if self.disposed {
            return Vec::new();
        }
        log_info!(
            LogComponent::Application("ChartSession"),
            "mounting {} {}",
            self.symbol(),
            self.timeframe
        );
        let mut commands = self.drive(LifecycleEvent::Mount);
        commands.push(self.request_history());
        commands
    }

    /// Raw feed payload for the active symbol
    pub fn on_feed_message(&mut self, raw: &Value, arrival: Timestamp) -> Vec<SessionCommand> {
        if self.disposed {
            return Vec::new();
        }
        let Some(tick) = self.normalizer.normalize(raw, arrival) else {
            return Vec::new();
        };
        let outcome = self.bucketer.fold_tick(&tick);
        if let Some(closed) = outcome.closed {
            self.remember_closed(closed);
        }
        match self.scheduler.schedule(outcome.current) {
            Some(ticket) => vec![SessionCommand::RequestFrame(ticket)],
            None => Vec::new(),
        }
    }

    pub fn on_history_loaded(
        &mut self,
        token: u64,
        result: Result<Vec<HistoricalBar>, ChartError>,
    ) -> Vec<SessionCommand> {
        if self.disposed || token != self.history_token {
            log_debug!(
                LogComponent::Application("ChartSession"),
                "ignoring history result {} (current {})",
                token,
                self.history_token
            );
            return Vec::new();
        }
        self.history_pending = false;

        let bars = match result {
            Ok(bars) => bars,
            Err(err) => {
                let error = match err {
                    ChartError::HistoricalFetchFailure(msg) => ChartError::HistoricalFetchFailure(msg),
                    other => ChartError::HistoricalFetchFailure(other.to_string()),
                };
                log_warn!(LogComponent::Application("ChartSession"), "{}; continuing live only", error);
                self.history_failed = true;
                self.dispatcher.publish(ChartEvent::ErrorRaised(error));
                return Vec::new();
            }
        };

        let series =
            self.merger.merge_fetched(&bars, self.timeframe, &self.live_closed, self.bucketer.in_progress());
        self.live_closed.clear();
        self.history_failed = false;
        self.bucketer.seed(series.last());
        self.dispatcher.publish(ChartEvent::HistoricalDataLoaded {
            symbol: self.symbol().clone(),
            timeframe: self.timeframe,
            candle_count: series.len(),
        });
        self.drive(LifecycleEvent::SeriesLoaded(series))
    }

    pub fn on_frame(&mut self, ticket: FrameTicket, now_ms: f64) -> Vec<SessionCommand> {
        if self.disposed {
            return Vec::new();
        }
        match self.scheduler.on_frame(ticket, now_ms) {
            FrameOutcome::Apply(candles) => {
                log_trace!(
                    LogComponent::Application("ChartSession"),
                    "applying {} coalesced patches",
                    candles.len()
                );
                let mut commands = Vec::new();
                for candle in candles {
                    commands.extend(self.drive(LifecycleEvent::LivePatch(candle)));
                }
                commands
            }
            FrameOutcome::Defer(ticket) => vec![SessionCommand::RequestFrame(ticket)],
            FrameOutcome::Idle | FrameOutcome::Stale => Vec::new(),
        }
    }

    pub fn on_container_measured(&mut self, dimensions: Dimensions) -> Vec<SessionCommand> {
        self.drive(LifecycleEvent::ContainerMeasured(dimensions))
    }

    pub fn on_container_resized(&mut self, dimensions: Dimensions, now_ms: f64) -> Vec<SessionCommand> {
        self.drive(LifecycleEvent::ContainerResized { dimensions, now_ms })
    }

    pub fn on_resize_deadline(&mut self, now_ms: f64) -> Vec<SessionCommand> {
        self.drive(LifecycleEvent::ResizeDeadline { now_ms })
    }

    /// Re-run surface initialization after an error
    pub fn retry_init(&mut self) -> Vec<SessionCommand> {
        self.drive(LifecycleEvent::RetryInit)
    }

    /// Recover from the last user-visible failure: a failed surface is
    /// initialized again, a failed history fetch is issued again.
    pub fn retry(&mut self) -> Vec<SessionCommand> {
        if self.disposed {
            return Vec::new();
        }
        if matches!(self.lifecycle.state(), SurfaceState::Error(_)) {
            return self.retry_init();
        }
        if self.history_failed && !self.history_pending {
            log_info!(LogComponent::Application("ChartSession"), "retrying history for {}", self.symbol());
            return vec![self.request_history()];
        }
        Vec::new()
    }

    pub fn is_history_failed(&self) -> bool {
        self.history_failed
    }

    /// Switch the aggregation timeframe. In-progress state is discarded.
    pub fn set_timeframe(&mut self, timeframe: Timeframe) -> Vec<SessionCommand> {
        if self.disposed || timeframe == self.timeframe {
            return Vec::new();
        }
        log_info!(
            LogComponent::Application("ChartSession"),
            "timeframe {} -> {}",
            self.timeframe,
            timeframe
        );
        self.timeframe = timeframe;
        self.bucketer.reset(timeframe);
        self.live_closed.clear();
        self.history_failed = false;
        self.rebuild()
    }

    /// Follow another instrument: new subscription, fresh aggregation
    pub fn switch_symbol(&mut self, symbol: Symbol) -> Vec<SessionCommand> {
        if self.disposed || symbol == *self.symbol() {
            return Vec::new();
        }
        log_info!(LogComponent::Application("ChartSession"), "symbol {} -> {}", self.symbol(), symbol);
        self.normalizer.set_symbol(symbol.clone());
        self.bucketer.reset_symbol(symbol.clone());
        self.live_closed.clear();
        self.history_failed = false;
        let mut commands = vec![SessionCommand::Resubscribe(symbol)];
        commands.extend(self.rebuild());
        commands
    }

    /// Tear the surface down and reload history for the same symbol and timeframe
    pub fn refresh(&mut self) -> Vec<SessionCommand> {
        if self.disposed {
            return Vec::new();
        }
        self.rebuild()
    }

    pub fn on_connection_status(&mut self, status: ConnectionStatus) {
        if self.disposed || status == self.connection {
            return;
        }
        log_debug!(LogComponent::Application("ChartSession"), "feed {}", status);
        self.connection = status;
        self.dispatcher.publish(ChartEvent::ConnectionStatusChanged { symbol: self.symbol().clone(), status });
    }

    /// Release the surface and stop the feed. Safe to call repeatedly.
    pub fn dispose(&mut self) -> Vec<SessionCommand> {
        if self.disposed {
            return Vec::new();
        }
        self.scheduler.cancel();
        let mut commands = self.drive(LifecycleEvent::Dispose);
        self.disposed = true;
        self.history_pending = false;
        commands.push(SessionCommand::Disconnect);
        commands
    }

    fn rebuild(&mut self) -> Vec<SessionCommand> {
        self.scheduler.cancel();
        let mut commands = self.drive(LifecycleEvent::Dispose);
        let fresh = SurfaceLifecycle::new(self.lifecycle.factory().clone(), self.config.lifecycle());
        self.lifecycle = fresh;
        commands.extend(self.drive(LifecycleEvent::Mount));
        commands.push(self.request_history());
        commands
    }

    fn request_history(&mut self) -> SessionCommand {
        self.history_token += 1;
        self.history_pending = true;
        SessionCommand::FetchHistory(HistoryRequest {
            symbol: self.symbol().clone(),
            timeframe: self.timeframe,
            limit: self.config.history_limit,
            token: self.history_token,
        })
    }

    fn remember_closed(&mut self, closed: Candle) {
        if !self.history_pending && !self.history_failed {
            return;
        }
        self.live_closed.push(closed);
        let limit = self.config.history_limit;
        if self.live_closed.len() > limit {
            let excess = self.live_closed.len() - limit;
            self.live_closed.drain(..excess);
        }
    }

    fn drive(&mut self, event: LifecycleEvent) -> Vec<SessionCommand> {
        let lifecycle_commands = self.lifecycle.handle(event);
        for (from, to) in self.lifecycle.take_transitions() {
            if from == SurfaceState::Updating || to == SurfaceState::Updating {
                continue;
            }
            self.dispatcher.publish(ChartEvent::SurfaceStateChanged { from, to });
        }

        let mut commands = Vec::with_capacity(lifecycle_commands.len());
        for command in lifecycle_commands {
            match command {
                LifecycleCommand::PollContainer { after_ms } => {
                    commands.push(SessionCommand::PollContainer { after_ms })
                }
                LifecycleCommand::ScheduleResizeCheck { after_ms } => {
                    commands.push(SessionCommand::ScheduleResizeCheck { after_ms })
                }
                LifecycleCommand::CancelScheduledWork => commands.push(SessionCommand::CancelScheduledWork),
                LifecycleCommand::Report(error) => {
                    self.dispatcher.publish(ChartEvent::ErrorRaised(error));
                }
            }
        }
        commands
    }
}
