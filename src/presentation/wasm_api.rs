use crate::application::ChartConfig;
use crate::domain::errors::ChartError;
use crate::domain::events::ChartEvent;
use crate::domain::logging::{LogComponent, get_logger};
use crate::domain::market_data::{Symbol, Timeframe};
use crate::presentation::chart_runtime::ChartRuntime;
use gloo::utils::format::JsValueSerdeExt;
use serde_json::{Value, json};
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

/// Live candlestick chart for JavaScript hosts.
///
/// ```js
/// const chart = new LiveChart(element, "AAPL", "1m", JSON.stringify({ feedUrl }));
/// chart.onEvent((event) => console.log(event.type, event));
/// chart.mount();
/// ```
#[wasm_bindgen]
pub struct LiveChart {
    runtime: ChartRuntime,
}

#[wasm_bindgen]
impl LiveChart {
    #[wasm_bindgen(constructor)]
    pub fn new(
        container: HtmlElement,
        symbol: &str,
        timeframe: &str,
        config_json: Option<String>,
    ) -> Result<LiveChart, JsValue> {
        let config = match config_json {
            Some(json) => ChartConfig::from_json(&json)?,
            None => ChartConfig::default(),
        };
        let symbol = parse_symbol(symbol)?;
        let timeframe = parse_timeframe(timeframe)?;
        get_logger().info(
            LogComponent::Presentation("LiveChart"),
            &format!("creating chart for {symbol} {timeframe}"),
        );
        Ok(Self { runtime: ChartRuntime::new(container, config, symbol, timeframe) })
    }

    pub fn mount(&self) {
        self.runtime.start();
    }

    #[wasm_bindgen(js_name = setTimeframe)]
    pub fn set_timeframe(&self, timeframe: &str) -> Result<(), JsValue> {
        self.runtime.set_timeframe(parse_timeframe(timeframe)?);
        Ok(())
    }

    #[wasm_bindgen(js_name = switchSymbol)]
    pub fn switch_symbol(&self, symbol: &str) -> Result<(), JsValue> {
        self.runtime.switch_symbol(parse_symbol(symbol)?);
        Ok(())
    }

    pub fn refresh(&self) {
        self.runtime.refresh();
    }

    /// Recover from a failed surface initialization or history fetch
    pub fn retry(&self) {
        self.runtime.retry();
    }

    pub fn dispose(&self) {
        self.runtime.dispose();
    }

    pub fn state(&self) -> String {
        self.runtime.state().to_string()
    }

    #[wasm_bindgen(js_name = connectionStatus)]
    pub fn connection_status(&self) -> String {
        self.runtime.connection_status().to_string()
    }

    pub fn symbol(&self) -> String {
        self.runtime.symbol().to_string()
    }

    pub fn timeframe(&self) -> String {
        self.runtime.timeframe().to_string()
    }

    #[wasm_bindgen(js_name = candleCount)]
    pub fn candle_count(&self) -> usize {
        self.runtime.candle_count()
    }

    /// Register `callback(event)` for status changes and errors
    #[wasm_bindgen(js_name = onEvent)]
    pub fn on_event(&self, callback: js_sys::Function) {
        self.runtime.subscribe(move |event| {
            let payload = event_payload(event);
            let value = JsValue::from_serde(&payload).unwrap_or_else(|_| JsValue::from_str(&payload.to_string()));
            if let Err(err) = callback.call1(&JsValue::NULL, &value) {
                get_logger().warn(
                    LogComponent::Presentation("LiveChart"),
                    &format!("event callback threw: {err:?}"),
                );
            }
        });
    }
}

/// Timeframes accepted by [`LiveChart`]
#[wasm_bindgen(js_name = supportedTimeframes)]
pub fn supported_timeframes() -> Vec<JsValue> {
    Timeframe::all().iter().map(|tf| JsValue::from_str(tf.as_ref())).collect()
}

fn parse_symbol(raw: &str) -> Result<Symbol, ChartError> {
    Symbol::new(raw).map_err(ChartError::InvalidInput)
}

fn parse_timeframe(raw: &str) -> Result<Timeframe, ChartError> {
    raw.parse::<Timeframe>()
        .map_err(|_| ChartError::InvalidInput(format!("unsupported timeframe '{raw}'")))
}

/// Plain JSON shape of an event as JavaScript sees it
pub fn event_payload(event: &ChartEvent) -> Value {
    match event {
        ChartEvent::SurfaceStateChanged { from, to } => json!({
            "type": "surfaceStateChanged",
            "from": from.to_string(),
            "to": to.to_string(),
        }),
        ChartEvent::ConnectionStatusChanged { symbol, status } => json!({
            "type": "connectionStatusChanged",
            "symbol": symbol.value(),
            "status": status.as_ref(),
        }),
        ChartEvent::HistoricalDataLoaded { symbol, timeframe, candle_count } => json!({
            "type": "historicalDataLoaded",
            "symbol": symbol.value(),
            "timeframe": timeframe.as_ref(),
            "candleCount": candle_count,
        }),
        ChartEvent::ErrorRaised(error) => json!({
            "type": "error",
            "kind": error.kind(),
            "message": error.to_string(),
            "userVisible": error.is_user_visible(),
        }),
    }
}
