pub use super::value_objects::{Channel, ConnectionStatus, Price, Symbol, Timeframe, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single validated price observation from the live feed
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub symbol: Symbol,
    pub price: Price,
    pub timestamp: Timestamp,
}

impl Tick {
    pub fn new(symbol: Symbol, price: Price, timestamp: Timestamp) -> Self {
        Self { symbol, price, timestamp }
    }
}

/// Domain entity - OHLC candle for one time bucket.
///
/// `bucket_start` is expressed in seconds since the epoch, aligned to the
/// timeframe the candle was built for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub bucket_start: u64,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
}

impl Candle {
    pub fn new(bucket_start: u64, open: Price, high: Price, low: Price, close: Price) -> Self {
        Self { bucket_start, open, high, low, close }
    }

    /// Candle whose four prices are all `price`
    pub fn flat(bucket_start: u64, price: Price) -> Self {
        Self::new(bucket_start, price, price, price, price)
    }

    /// `low <= open, close <= high`
    pub fn is_consistent(&self) -> bool {
        self.low <= self.high
            && self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Domain entity - ordered candle history.
///
/// Strictly increasing by `bucket_start`; a bucket appears at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self { candles: Vec::new() }
    }

    /// Build a series from arbitrary input. Later duplicates win.
    pub fn from_candles(mut candles: Vec<Candle>) -> Self {
        // stable sort keeps input order within a bucket
        candles.sort_by_key(|c| c.bucket_start);
        let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match deduped.last_mut() {
                Some(last) if last.bucket_start == candle.bucket_start => *last = candle,
                _ => deduped.push(candle),
            }
        }
        Self { candles: deduped }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn get(&self, bucket_start: u64) -> Option<&Candle> {
        self.candles
            .binary_search_by_key(&bucket_start, |c| c.bucket_start)
            .ok()
            .map(|idx| &self.candles[idx])
    }

    /// Apply a live patch: replace the tail bucket or append a newer one.
    ///
    /// Returns `false` and leaves the series untouched for a candle older
    /// than the tail.
    pub fn upsert_tail(&mut self, candle: Candle) -> bool {
        match self.candles.last_mut() {
            Some(last) if last.bucket_start == candle.bucket_start => {
                *last = candle;
                true
            }
            Some(last) if last.bucket_start > candle.bucket_start => false,
            _ => {
                self.candles.push(candle);
                true
            }
        }
    }

    pub fn is_strictly_increasing(&self) -> bool {
        self.candles.windows(2).all(|pair| pair[0].bucket_start < pair[1].bucket_start)
    }
}

/// The single active feed subscription of a chart instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub symbol: Symbol,
    pub channels: BTreeSet<Channel>,
    pub status: ConnectionStatus,
}

impl Subscription {
    pub fn new(symbol: Symbol, channels: impl IntoIterator<Item = Channel>) -> Self {
        Self { symbol, channels: channels.into_iter().collect(), status: ConnectionStatus::Disconnected }
    }

    pub fn includes(&self, channel: Channel) -> bool {
        self.channels.contains(&channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(bucket: u64, close: f64) -> Candle {
        Candle::flat(bucket, Price::from(close))
    }

    #[test]
    fn from_candles_sorts_and_keeps_last_duplicate() {
        let series = CandleSeries::from_candles(vec![
            candle(120, 3.0),
            candle(0, 1.0),
            candle(60, 2.0),
            candle(60, 2.5),
        ]);
        let buckets: Vec<u64> = series.candles().iter().map(|c| c.bucket_start).collect();
        assert_eq!(buckets, vec![0, 60, 120]);
        assert_eq!(series.get(60).unwrap().close.value(), 2.5);
        assert!(series.is_strictly_increasing());
    }

    #[test]
    fn upsert_tail_rejects_older_buckets() {
        let mut series = CandleSeries::from_candles(vec![candle(0, 1.0), candle(60, 2.0)]);
        assert!(series.upsert_tail(candle(60, 2.2)));
        assert!(series.upsert_tail(candle(120, 3.0)));
        assert!(!series.upsert_tail(candle(60, 9.0)));
        assert_eq!(series.len(), 3);
        assert_eq!(series.get(60).unwrap().close.value(), 2.2);
    }
}
