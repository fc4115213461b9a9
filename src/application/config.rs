use crate::domain::chart::{LifecycleConfig, SeriesOptions, DEFAULT_MIN_APPLY_INTERVAL_MS};
use crate::domain::errors::ChartError;
use crate::domain::market_data::Channel;
use serde::{Deserialize, Serialize};

/// Tunables of one chart instance.
///
/// Deserialized from the JSON object a host passes in; every key is
/// optional and falls back to [`ChartConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartConfig {
    pub feed_url: String,
    pub history_url: String,
    pub history_limit: usize,
    pub channels: Vec<Channel>,
    pub min_container_size: u32,
    pub container_poll_ms: u32,
    pub max_container_polls: Option<u32>,
    pub resize_debounce_ms: u32,
    pub min_frame_interval_ms: f64,
    pub reconnect_initial_secs: u64,
    pub reconnect_max_secs: u64,
    pub series: SeriesOptions,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            feed_url: "wss://localhost:8443/stream".to_string(),
            history_url: "https://localhost:8443/api/bars".to_string(),
            history_limit: 500,
            channels: vec![Channel::Quotes, Channel::Trades],
            min_container_size: 100,
            container_poll_ms: 100,
            max_container_polls: None,
            resize_debounce_ms: 150,
            min_frame_interval_ms: DEFAULT_MIN_APPLY_INTERVAL_MS,
            reconnect_initial_secs: 1,
            reconnect_max_secs: 32,
            series: SeriesOptions::default(),
        }
    }
}

impl ChartConfig {
    pub fn from_json(json: &str) -> Result<Self, ChartError> {
        let config: ChartConfig =
            serde_json::from_str(json).map_err(|e| ChartError::InvalidInput(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChartError> {
        if self.channels.is_empty() {
            return Err(ChartError::InvalidInput("at least one channel is required".to_string()));
        }
        if self.history_limit == 0 {
            return Err(ChartError::InvalidInput("historyLimit must be positive".to_string()));
        }
        if self.reconnect_initial_secs == 0 || self.reconnect_max_secs < self.reconnect_initial_secs {
            return Err(ChartError::InvalidInput("invalid reconnect backoff bounds".to_string()));
        }
        if !self.min_frame_interval_ms.is_finite() || self.min_frame_interval_ms < 0.0 {
            return Err(ChartError::InvalidInput("minFrameIntervalMs must be >= 0".to_string()));
        }
        Ok(())
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            min_container_size: self.min_container_size,
            poll_interval_ms: self.container_poll_ms,
            max_poll_attempts: self.max_container_polls,
            resize_debounce_ms: self.resize_debounce_ms,
            series_options: self.series.clone(),
        }
    }
}
