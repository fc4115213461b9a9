//! Reconciling fetched history with the live in-progress candle.

use super::entities::{Candle, CandleSeries};
use super::value_objects::{Price, Timeframe, Timestamp};
use crate::domain::logging::LogComponent;
use crate::{log_debug, log_warn};
use serde::{Deserialize, Serialize};

/// One bar of the external historical fetch, `timestamp` in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBar {
    pub timestamp: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    /// Map a fetched bar onto the bucket grid of `timeframe`
    pub fn from_bar(bar: &HistoricalBar, timeframe: Timeframe) -> Self {
        Candle::new(
            timeframe.bucket_start_secs(Timestamp::from_millis(bar.timestamp)),
            Price::from(bar.open),
            Price::from(bar.high),
            Price::from(bar.low),
            Price::from(bar.close),
        )
    }
}

/// Merge history with the in-progress candle.
///
/// History is sorted and deduplicated (later entries win), everything at or
/// after the in-progress bucket is dropped, and the in-progress candle is
/// appended as the provisional tail. Re-merging the result with the same
/// candle yields the same series.
pub fn merge(history: &[Candle], in_progress: Option<&Candle>) -> CandleSeries {
    let mut candles: Vec<Candle> = match in_progress {
        Some(live) => history.iter().filter(|c| c.bucket_start < live.bucket_start).copied().collect(),
        None => history.to_vec(),
    };
    if let Some(live) = in_progress {
        candles.push(*live);
    }
    CandleSeries::from_candles(candles)
}

/// Validating front of [`merge`] for fetched bars.
#[derive(Debug, Clone, Default)]
pub struct HistoricalMerge {
    rejected: usize,
}

impl HistoricalMerge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bars dropped by validation over the lifetime of this merger
    pub fn rejected_count(&self) -> usize {
        self.rejected
    }

    /// Convert fetched bars, dropping the ones that cannot form a valid candle
    pub fn candles_from_bars(&mut self, bars: &[HistoricalBar], timeframe: Timeframe) -> Vec<Candle> {
        let mut candles = Vec::with_capacity(bars.len());
        for bar in bars {
            let candle = Candle::from_bar(bar, timeframe);
            let positive = [bar.open, bar.high, bar.low, bar.close].iter().all(|p| p.is_finite() && *p > 0.0);
            if positive && candle.is_consistent() {
                candles.push(candle);
            } else {
                self.rejected += 1;
                log_warn!(
                    LogComponent::Domain("HistoricalMerge"),
                    "rejecting bar at {}: O:{} H:{} L:{} C:{}",
                    bar.timestamp,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close
                );
            }
        }
        candles
    }

    /// Merge fetched bars, candles closed live while the fetch was in
    /// flight, and the in-progress candle into one series.
    ///
    /// Live candles win over historical ones for the same bucket.
    pub fn merge_fetched(
        &mut self,
        bars: &[HistoricalBar],
        timeframe: Timeframe,
        closed_live: &[Candle],
        in_progress: Option<&Candle>,
    ) -> CandleSeries {
        let mut history = self.candles_from_bars(bars, timeframe);
        history.extend_from_slice(closed_live);
        let series = merge(&history, in_progress);
        log_debug!(
            LogComponent::Domain("HistoricalMerge"),
            "merged {} bars + {} live candles into {} candles",
            bars.len(),
            closed_live.len(),
            series.len()
        );
        series
    }
}
