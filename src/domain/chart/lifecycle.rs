//! State machine owning the rendering surface.
//!
//! Every input goes through [`SurfaceLifecycle::handle`]. Timers are not
//! owned here: the machine returns [`LifecycleCommand`]s and the host
//! feeds the resulting events back in.

use super::surface::{
    Dimensions, SeriesHandle, SeriesId, SeriesKind, SeriesOptions, Surface, SurfaceFactory,
    SurfaceOptions,
};
use crate::domain::errors::ChartError;
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, CandleSeries};
use crate::{log_debug, log_info, log_trace, log_warn};
use derive_more::Display;

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SurfaceState {
    #[display(fmt = "uninitialized")]
    Uninitialized,
    #[display(fmt = "container-pending")]
    ContainerPending,
    #[display(fmt = "initializing")]
    Initializing,
    #[display(fmt = "ready")]
    Ready,
    #[display(fmt = "updating")]
    Updating,
    #[display(fmt = "resizing")]
    Resizing,
    #[display(fmt = "error: {}", _0)]
    Error(String),
    #[display(fmt = "disposed")]
    Disposed,
}

impl SurfaceState {
    /// A surface exists and accepts data
    pub fn is_live(&self) -> bool {
        matches!(self, SurfaceState::Ready | SurfaceState::Updating | SurfaceState::Resizing)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    pub min_container_size: u32,
    pub poll_interval_ms: u32,
    pub max_poll_attempts: Option<u32>,
    pub resize_debounce_ms: u32,
    pub series_options: SeriesOptions,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            min_container_size: 100,
            poll_interval_ms: 100,
            max_poll_attempts: None,
            resize_debounce_ms: 150,
            series_options: SeriesOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    Mount,
    ContainerMeasured(Dimensions),
    SeriesLoaded(CandleSeries),
    LivePatch(Candle),
    ContainerResized { dimensions: Dimensions, now_ms: f64 },
    ResizeDeadline { now_ms: f64 },
    RetryInit,
    Dispose,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleCommand {
    PollContainer { after_ms: u32 },
    ScheduleResizeCheck { after_ms: u32 },
    CancelScheduledWork,
    Report(ChartError),
}

struct Mounted<S: Surface> {
    surface: S,
    series_id: SeriesId,
    dimensions: Dimensions,
}

#[derive(Debug, Clone, Copy)]
struct PendingResize {
    dimensions: Dimensions,
    deadline_ms: f64,
}

pub struct SurfaceLifecycle<F: SurfaceFactory> {
    factory: F,
    config: LifecycleConfig,
    state: SurfaceState,
    mounted: Option<Mounted<F::Surface>>,
    series: CandleSeries,
    poll_attempts: u32,
    pending_resize: Option<PendingResize>,
    transitions: Vec<(SurfaceState, SurfaceState)>,
}

impl<F: SurfaceFactory> SurfaceLifecycle<F> {
    pub fn new(factory: F, config: LifecycleConfig) -> Self {
        Self {
            factory,
            config,
            state: SurfaceState::Uninitialized,
            mounted: None,
            series: CandleSeries::new(),
            poll_attempts: 0,
            pending_resize: None,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> &SurfaceState {
        &self.state
    }

    /// Last known-good data, rendered or waiting for the surface
    pub fn series(&self) -> &CandleSeries {
        &self.series
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        self.mounted.as_ref().map(|m| m.dimensions)
    }

    pub fn surface(&self) -> Option<&F::Surface> {
        self.mounted.as_ref().map(|m| &m.surface)
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Drain the `(from, to)` transitions recorded since the last call
    pub fn take_transitions(&mut self) -> Vec<(SurfaceState, SurfaceState)> {
        std::mem::take(&mut self.transitions)
    }

    pub fn handle(&mut self, event: LifecycleEvent) -> Vec<LifecycleCommand> {
        if self.state == SurfaceState::Disposed {
            log_trace!(LogComponent::Domain("SurfaceLifecycle"), "ignoring {:?} after disposal", event);
            return Vec::new();
        }
        match event {
            LifecycleEvent::Mount => self.on_mount(),
            LifecycleEvent::ContainerMeasured(dimensions) => self.on_measured(dimensions),
            LifecycleEvent::SeriesLoaded(series) => self.on_series(series),
            LifecycleEvent::LivePatch(candle) => self.on_patch(candle),
            LifecycleEvent::ContainerResized { dimensions, now_ms } => self.on_resized(dimensions, now_ms),
            LifecycleEvent::ResizeDeadline { now_ms } => self.on_resize_deadline(now_ms),
            LifecycleEvent::RetryInit => self.on_retry(),
            LifecycleEvent::Dispose => self.on_dispose(),
        }
    }

    fn transition(&mut self, to: SurfaceState) {
        if self.state == to {
            return;
        }
        log_debug!(LogComponent::Domain("SurfaceLifecycle"), "{} -> {}", self.state, to);
        let from = std::mem::replace(&mut self.state, to.clone());
        self.transitions.push((from, to));
    }

    fn on_mount(&mut self) -> Vec<LifecycleCommand> {
        if self.state != SurfaceState::Uninitialized {
            return Vec::new();
        }
        self.poll_attempts = 0;
        self.transition(SurfaceState::ContainerPending);
        vec![LifecycleCommand::PollContainer { after_ms: 0 }]
    }

    fn on_measured(&mut self, dimensions: Dimensions) -> Vec<LifecycleCommand> {
        if self.state != SurfaceState::ContainerPending {
            return Vec::new();
        }
        self.poll_attempts += 1;
        if dimensions.exceeds(self.config.min_container_size) {
            return self.initialize(dimensions);
        }
        if let Some(max) = self.config.max_poll_attempts {
            if self.poll_attempts >= max {
                let error = ChartError::ContainerNeverReady { attempts: self.poll_attempts };
                self.transition(SurfaceState::Error(error.to_string()));
                return vec![LifecycleCommand::Report(error)];
            }
        }
        log_trace!(
            LogComponent::Domain("SurfaceLifecycle"),
            "container {} not usable yet (check {})",
            dimensions,
            self.poll_attempts
        );
        vec![LifecycleCommand::PollContainer { after_ms: self.config.poll_interval_ms }]
    }

    fn initialize(&mut self, dimensions: Dimensions) -> Vec<LifecycleCommand> {
        self.transition(SurfaceState::Initializing);
        let mut surface = match self.factory.create(&SurfaceOptions::new(dimensions)) {
            Ok(surface) => surface,
            Err(err) => return self.fail_init(err),
        };
        let series_id = match surface.add_series(SeriesKind::Candlestick, &self.config.series_options) {
            Ok(id) => id,
            Err(err) => {
                surface.dispose();
                return self.fail_init(err);
            }
        };
        self.mounted = Some(Mounted { surface, series_id, dimensions });
        self.transition(SurfaceState::Ready);
        log_info!(LogComponent::Domain("SurfaceLifecycle"), "surface ready at {}", dimensions);

        if self.series.is_empty() {
            return Vec::new();
        }
        let buffered = self.series.clone();
        self.apply_series(buffered)
    }

    fn fail_init(&mut self, err: ChartError) -> Vec<LifecycleCommand> {
        let error = match err {
            ChartError::SurfaceInitFailure(msg) => ChartError::SurfaceInitFailure(msg),
            other => ChartError::SurfaceInitFailure(other.to_string()),
        };
        log_warn!(LogComponent::Domain("SurfaceLifecycle"), "{}", error);
        self.transition(SurfaceState::Error(error.to_string()));
        vec![LifecycleCommand::Report(error)]
    }

    fn on_series(&mut self, series: CandleSeries) -> Vec<LifecycleCommand> {
        if self.state.is_live() {
            self.apply_series(series)
        } else {
            self.series = series;
            Vec::new()
        }
    }

    fn apply_series(&mut self, series: CandleSeries) -> Vec<LifecycleCommand> {
        let resume = self.state.clone();
        self.transition(SurfaceState::Updating);
        let result = match self.mounted.as_mut() {
            Some(m) => match m.surface.series_mut(m.series_id) {
                Some(handle) => handle.set_data(&series),
                None => Err(ChartError::DataApplyFailure(format!("{} missing", m.series_id))),
            },
            None => Err(ChartError::DataApplyFailure("no surface".to_string())),
        };
        self.transition(resume);
        match result {
            Ok(()) => {
                self.series = series;
                Vec::new()
            }
            Err(err) => vec![LifecycleCommand::Report(as_apply_failure(err))],
        }
    }

    fn on_patch(&mut self, candle: Candle) -> Vec<LifecycleCommand> {
        if let Some(last) = self.series.last() {
            if last.bucket_start > candle.bucket_start {
                log_trace!(
                    LogComponent::Domain("SurfaceLifecycle"),
                    "dropping patch for bucket {} behind tail {}",
                    candle.bucket_start,
                    last.bucket_start
                );
                return Vec::new();
            }
        }
        if !self.state.is_live() {
            self.series.upsert_tail(candle);
            return Vec::new();
        }

        let resume = self.state.clone();
        self.transition(SurfaceState::Updating);
        let result = match self.mounted.as_mut() {
            Some(m) => match m.surface.series_mut(m.series_id) {
                Some(handle) => handle.update(&candle),
                None => Err(ChartError::DataApplyFailure(format!("{} missing", m.series_id))),
            },
            None => Err(ChartError::DataApplyFailure("no surface".to_string())),
        };
        self.transition(resume);
        match result {
            Ok(()) => {
                self.series.upsert_tail(candle);
                Vec::new()
            }
            Err(err) => vec![LifecycleCommand::Report(as_apply_failure(err))],
        }
    }

    fn on_resized(&mut self, dimensions: Dimensions, now_ms: f64) -> Vec<LifecycleCommand> {
        if !self.state.is_live() {
            return Vec::new();
        }
        let debounce = self.config.resize_debounce_ms;
        self.pending_resize = Some(PendingResize { dimensions, deadline_ms: now_ms + debounce as f64 });
        self.transition(SurfaceState::Resizing);
        vec![LifecycleCommand::ScheduleResizeCheck { after_ms: debounce }]
    }

    fn on_resize_deadline(&mut self, now_ms: f64) -> Vec<LifecycleCommand> {
        let Some(pending) = self.pending_resize else {
            return Vec::new();
        };
        if now_ms < pending.deadline_ms {
            let remaining = (pending.deadline_ms - now_ms).ceil() as u32;
            return vec![LifecycleCommand::ScheduleResizeCheck { after_ms: remaining.max(1) }];
        }
        self.pending_resize = None;

        if let Some(m) = self.mounted.as_mut() {
            if pending.dimensions.width == 0 || pending.dimensions.height == 0 {
                log_debug!(
                    LogComponent::Domain("SurfaceLifecycle"),
                    "skipping resize to hidden container {}",
                    pending.dimensions
                );
            } else if pending.dimensions != m.dimensions {
                match m.surface.apply_options(pending.dimensions) {
                    Ok(()) => m.dimensions = pending.dimensions,
                    Err(err) => {
                        log_warn!(LogComponent::Domain("SurfaceLifecycle"), "resize ignored: {}", err);
                    }
                }
            }
        }
        if self.state == SurfaceState::Resizing {
            self.transition(SurfaceState::Ready);
        }
        Vec::new()
    }

    fn on_retry(&mut self) -> Vec<LifecycleCommand> {
        if !matches!(self.state, SurfaceState::Error(_)) {
            return Vec::new();
        }
        self.poll_attempts = 0;
        self.transition(SurfaceState::ContainerPending);
        vec![LifecycleCommand::PollContainer { after_ms: 0 }]
    }

    fn on_dispose(&mut self) -> Vec<LifecycleCommand> {
        self.release_surface();
        self.pending_resize = None;
        self.transition(SurfaceState::Disposed);
        vec![LifecycleCommand::CancelScheduledWork]
    }

    fn release_surface(&mut self) {
        if let Some(mut mounted) = self.mounted.take() {
            mounted.surface.dispose();
            log_debug!(LogComponent::Domain("SurfaceLifecycle"), "surface released");
        }
    }
}

impl<F: SurfaceFactory> Drop for SurfaceLifecycle<F> {
    fn drop(&mut self) {
        self.release_surface();
    }
}

fn as_apply_failure(err: ChartError) -> ChartError {
    match err {
        ChartError::DataApplyFailure(msg) => ChartError::DataApplyFailure(msg),
        other => ChartError::DataApplyFailure(other.to_string()),
    }
}
