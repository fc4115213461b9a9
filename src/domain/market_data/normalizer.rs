//! Turns raw feed payloads into [`Tick`]s.

use super::entities::Tick;
use super::value_objects::{Price, Symbol, Timestamp};
use crate::domain::errors::ChartError;
use crate::domain::logging::LogComponent;
use crate::log_warn;
use serde_json::Value;

/// Validate one raw payload against the active symbol.
///
/// `arrival` stands in for the timestamp when the payload carries none.
pub fn normalize_payload(raw: &Value, active: &Symbol, arrival: Timestamp) -> Result<Tick, ChartError> {
    let object = raw
        .as_object()
        .ok_or_else(|| ChartError::MalformedTick("payload is not an object".to_string()))?;

    let symbol = match object.get("symbol") {
        Some(Value::String(s)) => s,
        Some(_) => return Err(ChartError::MalformedTick("symbol is not a string".to_string())),
        None => return Err(ChartError::MalformedTick("missing symbol".to_string())),
    };
    if !active.matches(symbol) {
        return Err(ChartError::MalformedTick(format!(
            "symbol {} does not match active {}",
            symbol, active
        )));
    }

    let price = match object.get("price") {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ChartError::MalformedTick("price out of range".to_string()))?,
        Some(_) => return Err(ChartError::MalformedTick("price is not a number".to_string())),
        None => return Err(ChartError::MalformedTick("missing price".to_string())),
    };
    if !price.is_finite() || price <= 0.0 {
        return Err(ChartError::MalformedTick(format!("price {} is not positive", price)));
    }

    let timestamp = match object.get("timestamp") {
        None | Some(Value::Null) => arrival,
        Some(Value::Number(n)) => parse_millis(n)
            .map(Timestamp::from_millis)
            .ok_or_else(|| ChartError::MalformedTick(format!("invalid timestamp {}", n)))?,
        Some(other) => {
            return Err(ChartError::MalformedTick(format!("timestamp {} is not numeric", other)));
        }
    };

    Ok(Tick::new(active.clone(), Price::from(price), timestamp))
}

fn parse_millis(n: &serde_json::Number) -> Option<u64> {
    if let Some(ms) = n.as_u64() {
        return Some(ms);
    }
    let ms = n.as_f64()?;
    if ms.is_finite() && ms >= 0.0 && ms <= u64::MAX as f64 { Some(ms.trunc() as u64) } else { None }
}

/// Stateful front of the pipeline: knows the active symbol and counts drops.
#[derive(Debug, Clone)]
pub struct TickNormalizer {
    symbol: Symbol,
    dropped: u64,
}

impl TickNormalizer {
    pub fn new(symbol: Symbol) -> Self {
        Self { symbol, dropped: 0 }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Follow a symbol switch. Payloads for the old symbol are rejected from now on.
    pub fn set_symbol(&mut self, symbol: Symbol) {
        self.symbol = symbol;
    }

    /// Number of payloads rejected since construction
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Normalize or drop. Never fails outward.
    pub fn normalize(&mut self, raw: &Value, arrival: Timestamp) -> Option<Tick> {
        match normalize_payload(raw, &self.symbol, arrival) {
            Ok(tick) => Some(tick),
            Err(err) => {
                self.dropped += 1;
                log_warn!(
                    LogComponent::Domain("TickNormalizer"),
                    "dropping payload ({} dropped so far): {}",
                    self.dropped,
                    err
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn active() -> Symbol {
        Symbol::from("AAPL")
    }

    #[test]
    fn integer_and_float_timestamps_are_accepted() {
        let tick =
            normalize_payload(&json!({"symbol": "aapl", "price": 10, "timestamp": 1500}), &active(), Timestamp::from_millis(1))
                .unwrap();
        assert_eq!(tick.timestamp.value(), 1500);
        assert_eq!(tick.symbol.value(), "AAPL");

        let tick = normalize_payload(
            &json!({"symbol": "AAPL", "price": 10.5, "timestamp": 1500.9}),
            &active(),
            Timestamp::from_millis(1),
        )
        .unwrap();
        assert_eq!(tick.timestamp.value(), 1500);
    }

    #[test]
    fn negative_timestamp_is_rejected() {
        let err = normalize_payload(
            &json!({"symbol": "AAPL", "price": 10.5, "timestamp": -5}),
            &active(),
            Timestamp::from_millis(1),
        )
        .unwrap_err();
        assert!(matches!(err, ChartError::MalformedTick(_)));
    }
}
