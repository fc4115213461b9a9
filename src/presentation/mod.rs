//! Browser-facing layer: the session driver and its JavaScript and leptos fronts.

pub mod chart_runtime;
pub mod components;
pub mod wasm_api;

pub use chart_runtime::ChartRuntime;
pub use components::LiveChartPanel;
pub use wasm_api::LiveChart;
