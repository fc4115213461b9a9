use live_candles_wasm::domain::chart::SurfaceState;
use live_candles_wasm::domain::errors::ChartError;
use live_candles_wasm::domain::events::ChartEvent;
use live_candles_wasm::domain::market_data::{Symbol, Timeframe};
use live_candles_wasm::infrastructure::rendering::format_price;
use live_candles_wasm::presentation::wasm_api::event_payload;

#[test]
fn history_loaded_payload() {
    let payload = event_payload(&ChartEvent::HistoricalDataLoaded {
        symbol: Symbol::from("aapl"),
        timeframe: Timeframe::FiveMinutes,
        candle_count: 300,
    });
    insta::assert_json_snapshot!(payload, @r#"
    {
      "candleCount": 300,
      "symbol": "AAPL",
      "timeframe": "5m",
      "type": "historicalDataLoaded"
    }
    "#);
}

#[test]
fn init_failure_payload() {
    let payload = event_payload(&ChartEvent::ErrorRaised(ChartError::SurfaceInitFailure(
        "no 2d context".to_string(),
    )));
    insta::assert_json_snapshot!(payload, @r#"
    {
      "kind": "surfaceInitFailure",
      "message": "Chart failed to initialize: no 2d context",
      "type": "error",
      "userVisible": true
    }
    "#);
}

#[test]
fn error_state_payload_carries_reason() {
    let payload = event_payload(&ChartEvent::SurfaceStateChanged {
        from: SurfaceState::Initializing,
        to: SurfaceState::Error("boom".to_string()),
    });
    assert_eq!(payload["to"], "error: boom");
}

#[test]
fn axis_labels() {
    let labels: Vec<String> = [43_210.5, 189.25, 0.000_42].iter().map(|p| format_price(*p)).collect();
    insta::assert_snapshot!(labels.join("\n"), @r"
    43210.50
    189.250
    0.000420
    ");
}
