//! Live candlestick chart core for the browser.
//!
//! Ticks from a streaming feed are validated, folded into OHLC candles per
//! timeframe, reconciled with fetched history and pushed to a rendering
//! surface at most once per animation frame.

use wasm_bindgen::prelude::*;

use crate::domain::logging::{LogComponent, LogLevel, get_logger};

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::{ChartConfig, ChartSession, HistoryRequest, SessionCommand};
pub use domain::errors::{ChartError, ChartResult};
pub use presentation::LiveChart;

/// Install panic hook, logger and clock when the module loads
#[wasm_bindgen(start)]
pub fn initialize() {
    console_error_panic_hook::set_once();

    let logger = if cfg!(debug_assertions) {
        infrastructure::services::ConsoleLogger::new_development()
    } else {
        infrastructure::services::ConsoleLogger::new_production()
    };
    domain::logging::init_logger(Box::new(logger));
    domain::logging::init_time_provider(Box::new(infrastructure::services::BrowserTimeProvider::new()));

    get_logger().info(LogComponent::Presentation("Initialize"), "live chart module loaded");
}

/// Lower or raise log verbosity at runtime: 0 trace .. 4 error
#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: u8) {
    domain::logging::set_min_level(LogLevel::from_u8(level));
}
