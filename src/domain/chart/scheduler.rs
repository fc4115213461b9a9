//! Frame-bound coalescing of live candle patches.
//!
//! The scheduler never touches the surface itself. The host requests an
//! animation frame when [`UpdateScheduler::schedule`] hands out a
//! [`FrameTicket`] and reports back through [`UpdateScheduler::on_frame`].

use crate::domain::logging::LogComponent;
use crate::domain::market_data::Candle;
use crate::log_trace;

/// One frame at 60Hz
pub const DEFAULT_MIN_APPLY_INTERVAL_MS: f64 = 16.0;

/// Handle for one requested frame; stale once the scheduler is cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket {
    generation: u64,
}

impl FrameTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Patches to apply, oldest bucket first
    Apply(Vec<Candle>),
    /// Too early; request another frame with this ticket
    Defer(FrameTicket),
    /// Nothing pending
    Idle,
    /// The ticket belongs to a cancelled generation
    Stale,
}

#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    pending: Vec<Candle>,
    min_interval_ms: f64,
    last_apply_ms: Option<f64>,
    generation: u64,
    frame_requested: bool,
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_APPLY_INTERVAL_MS)
    }
}

impl UpdateScheduler {
    pub fn new(min_interval_ms: f64) -> Self {
        Self {
            pending: Vec::new(),
            min_interval_ms,
            last_apply_ms: None,
            generation: 0,
            frame_requested: false,
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Record the latest state of a candle.
    ///
    /// A later state of the same bucket replaces the pending one. A newer
    /// bucket is queued behind the final state of the previous bucket.
    /// Returns a ticket when the caller has to request a frame.
    pub fn schedule(&mut self, candle: Candle) -> Option<FrameTicket> {
        match self.pending.last_mut() {
            Some(last) if last.bucket_start == candle.bucket_start => *last = candle,
            Some(last) if last.bucket_start > candle.bucket_start => {
                log_trace!(
                    LogComponent::Domain("UpdateScheduler"),
                    "ignoring patch for bucket {} behind pending {}",
                    candle.bucket_start,
                    last.bucket_start
                );
            }
            _ => self.pending.push(candle),
        }

        if self.frame_requested {
            None
        } else {
            self.frame_requested = true;
            Some(FrameTicket { generation: self.generation })
        }
    }

    pub fn on_frame(&mut self, ticket: FrameTicket, now_ms: f64) -> FrameOutcome {
        if ticket.generation != self.generation {
            return FrameOutcome::Stale;
        }
        if self.pending.is_empty() {
            self.frame_requested = false;
            return FrameOutcome::Idle;
        }
        if let Some(last) = self.last_apply_ms {
            if now_ms - last < self.min_interval_ms {
                return FrameOutcome::Defer(ticket);
            }
        }
        self.frame_requested = false;
        self.last_apply_ms = Some(now_ms);
        FrameOutcome::Apply(std::mem::take(&mut self.pending))
    }

    /// Drop pending patches and invalidate every outstanding ticket
    pub fn cancel(&mut self) {
        self.pending.clear();
        self.frame_requested = false;
        self.generation += 1;
    }
}
