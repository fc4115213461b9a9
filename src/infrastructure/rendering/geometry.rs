//! Pixel layout of the candlestick canvas.
//!
//! Pure functions so the layout can be checked without a browser.

use crate::domain::chart::Dimensions;
use crate::domain::market_data::Candle;
use std::ops::Range;

/// Empty border around the plot area
pub const PADDING: f64 = 16.0;
/// Space reserved on the right for the price axis labels
pub const PRICE_AXIS_WIDTH: f64 = 72.0;
/// Narrowest slot a candle gets before older candles scroll out
pub const MIN_CANDLE_SLOT: f64 = 4.0;
/// Fraction of the slot filled by the body
pub const BODY_RATIO: f64 = 0.6;

/// Scale shared by every candle of one draw
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleParams {
    pub chart_width: f64,
    pub chart_height: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub candle_width: f64,
}

impl ScaleParams {
    /// `None` when there is nothing to draw or no room to draw it
    pub fn compute(dimensions: Dimensions, candles: &[Candle]) -> Option<Self> {
        let chart_width = dimensions.width as f64 - PADDING * 2.0 - PRICE_AXIS_WIDTH;
        let chart_height = dimensions.height as f64 - PADDING * 2.0;
        if candles.is_empty() || chart_width <= 0.0 || chart_height <= 0.0 {
            return None;
        }

        let (mut min_price, mut max_price) = candles.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), c| (lo.min(c.low.value()), hi.max(c.high.value())),
        );
        if max_price - min_price <= f64::EPSILON {
            let pad = (max_price.abs() * 0.01).max(0.01);
            min_price -= pad;
            max_price += pad;
        }

        Some(Self {
            chart_width,
            chart_height,
            min_price,
            max_price,
            candle_width: chart_width / candles.len() as f64,
        })
    }

    /// Y grows downwards
    pub fn price_to_y(&self, price: f64) -> f64 {
        PADDING + (self.max_price - price) / (self.max_price - self.min_price) * self.chart_height
    }

    pub fn right_edge(&self) -> f64 {
        PADDING + self.chart_width
    }
}

/// Precomputed coordinates of one candle
#[derive(Debug, Clone, PartialEq)]
pub struct CandleRenderData {
    pub x: f64,
    pub high_y: f64,
    pub low_y: f64,
    pub open_y: f64,
    pub close_y: f64,
    pub body_width: f64,
    pub bullish: bool,
}

impl CandleRenderData {
    pub fn body_top(&self) -> f64 {
        self.open_y.min(self.close_y)
    }

    pub fn body_height(&self) -> f64 {
        (self.open_y - self.close_y).abs()
    }
}

pub fn candle_render_data(index: usize, candle: &Candle, params: &ScaleParams) -> CandleRenderData {
    CandleRenderData {
        x: PADDING + index as f64 * params.candle_width + params.candle_width / 2.0,
        high_y: params.price_to_y(candle.high.value()),
        low_y: params.price_to_y(candle.low.value()),
        open_y: params.price_to_y(candle.open.value()),
        close_y: params.price_to_y(candle.close.value()),
        body_width: params.candle_width * BODY_RATIO,
        bullish: !candle.is_bearish(),
    }
}

/// Tail of a series that fits into `width` pixels
pub fn visible_window(len: usize, width: u32) -> Range<usize> {
    let plot = (width as f64 - PADDING * 2.0 - PRICE_AXIS_WIDTH).max(0.0);
    let capacity = ((plot / MIN_CANDLE_SLOT).floor() as usize).max(1);
    len.saturating_sub(capacity)..len
}

pub fn format_price(price: f64) -> String {
    if price >= 1000.0 {
        format!("{price:.2}")
    } else if price >= 1.0 {
        format!("{price:.3}")
    } else {
        format!("{price:.6}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::Price;

    fn candle(bucket: u64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(bucket, Price::from(open), Price::from(high), Price::from(low), Price::from(close))
    }

    #[test]
    fn extremes_map_to_plot_edges() {
        let candles = [candle(0, 10.0, 20.0, 10.0, 15.0)];
        let params = ScaleParams::compute(Dimensions::new(400, 232), &candles).unwrap();
        assert_eq!(params.chart_height, 200.0);
        assert_eq!(params.price_to_y(20.0), PADDING);
        assert_eq!(params.price_to_y(10.0), PADDING + 200.0);
    }

    #[test]
    fn flat_series_gets_a_price_range() {
        let candles = [candle(0, 5.0, 5.0, 5.0, 5.0)];
        let params = ScaleParams::compute(Dimensions::new(400, 300), &candles).unwrap();
        assert!(params.max_price > params.min_price);
        assert!(params.price_to_y(5.0).is_finite());
    }

    #[test]
    fn slots_are_centered() {
        let candles = [candle(0, 1.0, 2.0, 1.0, 2.0), candle(60, 2.0, 3.0, 1.5, 1.5)];
        let params = ScaleParams::compute(Dimensions::new(232, 300), &candles).unwrap();
        assert_eq!(params.candle_width, 64.0);
        let first = candle_render_data(0, &candles[0], &params);
        let second = candle_render_data(1, &candles[1], &params);
        assert_eq!(first.x, PADDING + 32.0);
        assert_eq!(second.x, PADDING + 96.0);
        assert!(first.bullish);
        assert!(!second.bullish);
    }

    #[test]
    fn nothing_to_draw_in_a_tiny_container() {
        let candles = [candle(0, 1.0, 2.0, 1.0, 2.0)];
        assert!(ScaleParams::compute(Dimensions::new(50, 20), &candles).is_none());
        assert!(ScaleParams::compute(Dimensions::new(500, 500), &[]).is_none());
    }

    #[test]
    fn window_keeps_the_newest_candles() {
        // 504 - 32 - 72 = 400px -> 100 slots
        assert_eq!(visible_window(250, 504), 150..250);
        assert_eq!(visible_window(10, 504), 0..10);
        assert_eq!(visible_window(10, 0), 9..10);
    }
}
