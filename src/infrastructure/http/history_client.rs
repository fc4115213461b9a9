use crate::domain::errors::ChartError;
use crate::domain::logging::{LogComponent, get_logger};
use crate::domain::market_data::repositories::HistoricalBarsSource;
use crate::domain::market_data::{HistoricalBar, Symbol, Timeframe};
use gloo_net::http::Request;

/// REST client for `GET {base}?symbol=..&timeframe=..&limit=..`.
///
/// The endpoint answers with a JSON array of
/// `{"timestamp","open","high","low","close"}` objects, timestamps in ms.
#[derive(Debug, Clone)]
pub struct HistoricalBarsClient {
    base_url: String,
}

impl HistoricalBarsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }

    pub fn bars_url(&self, symbol: &Symbol, timeframe: Timeframe, limit: usize) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}symbol={}&timeframe={}&limit={}",
            self.base_url,
            separator,
            symbol.value(),
            timeframe,
            limit
        )
    }
}

impl HistoricalBarsSource for HistoricalBarsClient {
    async fn fetch_bars(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<HistoricalBar>, ChartError> {
        let url = self.bars_url(symbol, timeframe, limit);
        get_logger().info(
            LogComponent::Infrastructure("HistoricalBarsClient"),
            &format!("fetching {limit} bars: {url}"),
        );

        let response = Request::get(&url)
            .send()
            .await
            .map_err(|e| ChartError::HistoricalFetchFailure(format!("request failed: {e:?}")))?;

        if !response.ok() {
            return Err(ChartError::HistoricalFetchFailure(format!(
                "HTTP {} {}",
                response.status(),
                response.status_text()
            )));
        }

        let bars: Vec<HistoricalBar> = response
            .json()
            .await
            .map_err(|e| ChartError::HistoricalFetchFailure(format!("invalid body: {e:?}")))?;

        get_logger().debug(
            LogComponent::Infrastructure("HistoricalBarsClient"),
            &format!("received {} bars for {} {}", bars.len(), symbol, timeframe),
        );
        Ok(bars)
    }
}
