//! Folding ticks into the in-progress candle of a timeframe.

use super::entities::{Candle, Tick};
use super::value_objects::{Price, Symbol, Timeframe};
use crate::domain::logging::LogComponent;
use crate::log_trace;

/// Fold one tick onto the prior candle.
///
/// Same bucket: extend high/low, move close. New bucket: open from the
/// prior close (or the tick price for the very first tick). A tick whose
/// bucket is older than the prior candle's is folded into the prior
/// candle; closed buckets are never reopened.
pub fn fold(tick: &Tick, timeframe: Timeframe, prior: Option<&Candle>) -> Candle {
    let bucket_start = timeframe.bucket_start_secs(tick.timestamp);
    match prior {
        Some(prior) if bucket_start <= prior.bucket_start => Candle {
            bucket_start: prior.bucket_start,
            open: prior.open,
            high: prior.high.max(tick.price),
            low: prior.low.min(tick.price),
            close: tick.price,
        },
        Some(prior) => open_bucket(bucket_start, prior.close, tick.price),
        None => open_bucket(bucket_start, tick.price, tick.price),
    }
}

fn open_bucket(bucket_start: u64, open: Price, price: Price) -> Candle {
    Candle { bucket_start, open, high: open.max(price), low: open.min(price), close: price }
}

/// Result of folding a tick through [`CandleBucketer::fold_tick`]
#[derive(Debug, Clone, PartialEq)]
pub struct FoldOutcome {
    /// State of the in-progress candle after the fold
    pub current: Candle,
    /// Final state of the candle this tick rolled over, if any
    pub closed: Option<Candle>,
}

/// Owner of the single in-progress candle for one (symbol, timeframe).
#[derive(Debug, Clone)]
pub struct CandleBucketer {
    symbol: Symbol,
    timeframe: Timeframe,
    in_progress: Option<Candle>,
    previous_close: Option<Price>,
}

impl CandleBucketer {
    pub fn new(symbol: Symbol, timeframe: Timeframe) -> Self {
        Self { symbol, timeframe, in_progress: None, previous_close: None }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn in_progress(&self) -> Option<&Candle> {
        self.in_progress.as_ref()
    }

    /// Close of the most recently closed candle
    pub fn previous_close(&self) -> Option<Price> {
        self.previous_close
    }

    pub fn fold_tick(&mut self, tick: &Tick) -> FoldOutcome {
        let current = fold(tick, self.timeframe, self.in_progress.as_ref());
        let closed = match self.in_progress {
            Some(prior) if prior.bucket_start != current.bucket_start => {
                log_trace!(
                    LogComponent::Domain("CandleBucketer"),
                    "{} {}: bucket {} closed at {}",
                    self.symbol,
                    self.timeframe,
                    prior.bucket_start,
                    prior.close.value()
                );
                self.previous_close = Some(prior.close);
                Some(prior)
            }
            _ => None,
        };
        self.in_progress = Some(current);
        FoldOutcome { current, closed }
    }

    /// Continue from a merged series tail.
    ///
    /// The tail becomes the in-progress candle unless a live candle for a
    /// later bucket already exists.
    pub fn seed(&mut self, tail: Option<&Candle>) {
        let Some(tail) = tail else {
            return;
        };
        match self.in_progress {
            Some(current) if current.bucket_start > tail.bucket_start => {
                self.previous_close.get_or_insert(tail.close);
            }
            _ => self.in_progress = Some(*tail),
        }
    }

    /// Forget all state and aggregate into `timeframe` from scratch
    pub fn reset(&mut self, timeframe: Timeframe) {
        self.timeframe = timeframe;
        self.in_progress = None;
        self.previous_close = None;
    }

    /// Forget all state for a new symbol, keeping the timeframe
    pub fn reset_symbol(&mut self, symbol: Symbol) {
        self.symbol = symbol;
        self.reset(self.timeframe);
    }
}
