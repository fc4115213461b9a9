use derive_more::{Constructor, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString, IntoEnumIterator};

/// Value Object - price of one observation or OHLC component
#[derive(Debug, Clone, Copy, PartialEq, From, Into, Deref, Constructor, Serialize, Deserialize)]
pub struct Price(f64);

impl Price {
    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn max(self, other: Price) -> Price {
        if other.0 > self.0 { other } else { self }
    }

    pub fn min(self, other: Price) -> Price {
        if other.0 < self.0 { other } else { self }
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

/// Value Object - milliseconds since the Unix epoch
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, From, Into, Deref, Constructor, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn from_millis(value: u64) -> Self {
        Self(value)
    }

    pub fn from_secs(value: u64) -> Self {
        Self(value * 1000)
    }

    /// Whole seconds, the time unit of the rendering surface
    pub fn as_secs(&self) -> u64 {
        self.0 / 1000
    }
}

/// Value Object - instrument symbol, always upper case
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deref, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: &str) -> Result<Self, String> {
        let trimmed = symbol.trim();
        if trimmed.is_empty() {
            return Err("Symbol cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a raw feed symbol
    pub fn matches(&self, raw: &str) -> bool {
        self.0.eq_ignore_ascii_case(raw.trim())
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(value.trim().to_uppercase())
    }
}

/// Value Object - fixed aggregation bucket duration
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    StrumDisplay,
    EnumIter,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
pub enum Timeframe {
    #[strum(serialize = "1m")]
    #[serde(rename = "1m")]
    OneMinute,

    #[strum(serialize = "5m")]
    #[serde(rename = "5m")]
    FiveMinutes,

    #[strum(serialize = "15m")]
    #[serde(rename = "15m")]
    FifteenMinutes,

    #[strum(serialize = "1h")]
    #[serde(rename = "1h")]
    OneHour,

    #[strum(serialize = "4h")]
    #[serde(rename = "4h")]
    FourHours,

    #[strum(serialize = "1D")]
    #[serde(rename = "1D")]
    OneDay,

    #[strum(serialize = "1W")]
    #[serde(rename = "1W")]
    OneWeek,
}

impl Timeframe {
    pub fn duration_ms(&self) -> u64 {
        match self {
            Self::OneMinute => 60 * 1000,
            Self::FiveMinutes => 5 * 60 * 1000,
            Self::FifteenMinutes => 15 * 60 * 1000,
            Self::OneHour => 60 * 60 * 1000,
            Self::FourHours => 4 * 60 * 60 * 1000,
            Self::OneDay => 24 * 60 * 60 * 1000,
            Self::OneWeek => 7 * 24 * 60 * 60 * 1000,
        }
    }

    /// `floor(ts / duration) * duration`, in milliseconds
    pub fn bucket_start_ms(&self, timestamp: Timestamp) -> u64 {
        let duration = self.duration_ms();
        (timestamp.value() / duration) * duration
    }

    /// Bucket start in the surface's time unit (seconds)
    pub fn bucket_start_secs(&self, timestamp: Timestamp) -> u64 {
        self.bucket_start_ms(timestamp) / 1000
    }

    pub fn all() -> Vec<Timeframe> {
        Timeframe::iter().collect()
    }
}

/// Feed channel a price observation arrives on
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    StrumDisplay,
    EnumIter,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Quotes,
    Trades,
}

/// State of the live feed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_strings_roundtrip() {
        for tf in Timeframe::all() {
            let parsed: Timeframe = tf.to_string().parse().unwrap();
            assert_eq!(parsed, tf);
        }
        assert_eq!(Timeframe::OneDay.as_ref(), "1D");
        assert!("2m".parse::<Timeframe>().is_err());
    }

    #[test]
    fn symbol_is_normalized() {
        assert_eq!(Symbol::new(" aapl ").unwrap().value(), "AAPL");
        assert!(Symbol::new("  ").is_err());
        assert!(Symbol::from("btcusdt").matches("BtcUsdt"));
    }

    #[test]
    fn channel_names_are_lowercase() {
        assert_eq!(Channel::Quotes.to_string(), "quotes");
        assert_eq!("trades".parse::<Channel>().unwrap(), Channel::Trades);
    }
}
