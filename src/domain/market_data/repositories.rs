use crate::domain::errors::ChartError;
use crate::domain::market_data::{HistoricalBar, Symbol, Timeframe};

/// Source of historical bars (the external fetch collaborator)
#[allow(async_fn_in_trait)]
pub trait HistoricalBarsSource {
    /// Most recent `limit` bars for `symbol` at `timeframe`, oldest first
    async fn fetch_bars(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<HistoricalBar>, ChartError>;
}
