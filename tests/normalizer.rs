use live_candles_wasm::domain::errors::ChartError;
use live_candles_wasm::domain::market_data::{Symbol, TickNormalizer, Timestamp, normalize_payload};
use serde_json::json;

const ARRIVAL: u64 = 1_700_000_000_123;

fn arrival() -> Timestamp {
    Timestamp::from_millis(ARRIVAL)
}

#[test]
fn missing_timestamp_uses_arrival_time() {
    let tick = normalize_payload(&json!({"symbol": "AAPL", "price": 189.5}), &Symbol::from("AAPL"), arrival())
        .unwrap();
    assert_eq!(tick.timestamp.value(), ARRIVAL);
    assert_eq!(tick.price.value(), 189.5);
}

#[test]
fn null_timestamp_uses_arrival_time() {
    let tick = normalize_payload(
        &json!({"symbol": "AAPL", "price": 1, "timestamp": null}),
        &Symbol::from("AAPL"),
        arrival(),
    )
    .unwrap();
    assert_eq!(tick.timestamp.value(), ARRIVAL);
}

#[test]
fn malformed_payloads_are_rejected() {
    let active = Symbol::from("AAPL");
    let cases = [
        json!("AAPL 10"),
        json!({"price": 10}),
        json!({"symbol": 7, "price": 10}),
        json!({"symbol": "AAPL"}),
        json!({"symbol": "AAPL", "price": "10"}),
        json!({"symbol": "AAPL", "price": 0}),
        json!({"symbol": "AAPL", "price": -3.5}),
        json!({"symbol": "AAPL", "price": 10, "timestamp": "yesterday"}),
        json!({"symbol": "MSFT", "price": 10}),
    ];
    for raw in cases {
        let result = normalize_payload(&raw, &active, arrival());
        assert!(matches!(result, Err(ChartError::MalformedTick(_))), "accepted {raw}");
    }
}

#[test]
fn normalizer_counts_drops_and_follows_symbol_switch() {
    let mut normalizer = TickNormalizer::new(Symbol::from("AAPL"));
    assert!(normalizer.normalize(&json!({"symbol": "aapl", "price": 10}), arrival()).is_some());
    assert!(normalizer.normalize(&json!({"symbol": "AAPL"}), arrival()).is_none());

    normalizer.set_symbol(Symbol::from("MSFT"));
    assert!(normalizer.normalize(&json!({"symbol": "AAPL", "price": 10}), arrival()).is_none());
    let tick = normalizer.normalize(&json!({"symbol": "MSFT", "price": 400.25}), arrival()).unwrap();

    assert_eq!(tick.symbol.value(), "MSFT");
    assert_eq!(normalizer.dropped_count(), 2);
}
