//! Canvas 2D implementation of the rendering surface.

use super::geometry::{CandleRenderData, ScaleParams, candle_render_data, format_price, visible_window};
use crate::domain::chart::{
    Dimensions, HostContainer, SeriesHandle, SeriesId, SeriesKind, SeriesOptions, Surface, SurfaceFactory,
    SurfaceOptions,
};
use crate::domain::errors::ChartError;
use crate::domain::logging::{LogComponent, get_logger};
use crate::domain::market_data::{Candle, CandleSeries};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement};

/// The element the chart lives in
#[derive(Debug, Clone)]
pub struct DomContainer {
    element: HtmlElement,
}

impl DomContainer {
    pub fn new(element: HtmlElement) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &HtmlElement {
        &self.element
    }
}

impl HostContainer for DomContainer {
    fn measure(&self) -> Dimensions {
        Dimensions::new(self.element.client_width().max(0) as u32, self.element.client_height().max(0) as u32)
    }
}

/// Creates a canvas inside the host container
#[derive(Debug, Clone)]
pub struct CanvasSurfaceFactory {
    container: DomContainer,
}

impl CanvasSurfaceFactory {
    pub fn new(container: DomContainer) -> Self {
        Self { container }
    }

    pub fn container(&self) -> &DomContainer {
        &self.container
    }
}

impl SurfaceFactory for CanvasSurfaceFactory {
    type Surface = CanvasSurface;

    fn create(&self, options: &SurfaceOptions) -> Result<CanvasSurface, ChartError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| ChartError::SurfaceInitFailure("no document".to_string()))?;
        let canvas = document
            .create_element("canvas")
            .map_err(|e| ChartError::SurfaceInitFailure(format!("create canvas: {e:?}")))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| ChartError::SurfaceInitFailure("not a canvas element".to_string()))?;
        canvas.set_width(options.dimensions.width);
        canvas.set_height(options.dimensions.height);

        let context = canvas
            .get_context("2d")
            .map_err(|e| ChartError::SurfaceInitFailure(format!("2d context: {e:?}")))?
            .ok_or_else(|| ChartError::SurfaceInitFailure("2d context unavailable".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| ChartError::SurfaceInitFailure("unexpected context type".to_string()))?;

        self.container
            .element()
            .append_child(&canvas)
            .map_err(|e| ChartError::SurfaceInitFailure(format!("attach canvas: {e:?}")))?;

        get_logger().info(
            LogComponent::Infrastructure("CanvasSurface"),
            &format!("canvas created at {}", options.dimensions),
        );

        let frame = Rc::new(Frame { dimensions: Cell::new(options.dimensions), background: options.background.clone() });
        paint_background(&context, &frame);
        Ok(CanvasSurface { canvas, context, frame, series: Vec::new(), disposed: false })
    }
}

/// Size and background shared between a surface and its series
#[derive(Debug)]
struct Frame {
    dimensions: Cell<Dimensions>,
    background: String,
}

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    frame: Rc<Frame>,
    series: Vec<CanvasCandleSeries>,
    disposed: bool,
}

impl CanvasSurface {
    pub fn dimensions(&self) -> Dimensions {
        self.frame.dimensions.get()
    }
}

impl Surface for CanvasSurface {
    type Series = CanvasCandleSeries;

    fn add_series(&mut self, kind: SeriesKind, options: &SeriesOptions) -> Result<SeriesId, ChartError> {
        if self.disposed {
            return Err(ChartError::SurfaceInitFailure("surface disposed".to_string()));
        }
        let id = SeriesId(self.series.len());
        get_logger().debug(LogComponent::Infrastructure("CanvasSurface"), &format!("adding {kind} {id}"));
        self.series.push(CanvasCandleSeries {
            context: self.context.clone(),
            frame: Rc::clone(&self.frame),
            options: options.clone(),
            data: CandleSeries::new(),
        });
        Ok(id)
    }

    fn series_mut(&mut self, id: SeriesId) -> Option<&mut CanvasCandleSeries> {
        self.series.get_mut(id.0)
    }

    fn apply_options(&mut self, dimensions: Dimensions) -> Result<(), ChartError> {
        if self.disposed {
            return Err(ChartError::ResizeFailure("surface disposed".to_string()));
        }
        self.canvas.set_width(dimensions.width);
        self.canvas.set_height(dimensions.height);
        self.frame.dimensions.set(dimensions);
        for series in &self.series {
            series.draw(&series.data)?;
        }
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.series.clear();
        self.canvas.remove();
        get_logger().debug(LogComponent::Infrastructure("CanvasSurface"), "canvas removed");
    }
}

/// Candlestick series drawn onto the surface canvas.
///
/// Keeps its own copy of the data so a resize can redraw it.
pub struct CanvasCandleSeries {
    context: CanvasRenderingContext2d,
    frame: Rc<Frame>,
    options: SeriesOptions,
    data: CandleSeries,
}

impl CanvasCandleSeries {
    /// Data as last drawn
    pub fn data(&self) -> &CandleSeries {
        &self.data
    }

    fn draw(&self, data: &CandleSeries) -> Result<(), ChartError> {
        let dimensions = self.frame.dimensions.get();
        paint_background(&self.context, &self.frame);

        let candles = data.candles();
        let window = &candles[visible_window(candles.len(), dimensions.width)];
        let Some(params) = ScaleParams::compute(dimensions, window) else {
            return Ok(());
        };
        for (index, candle) in window.iter().enumerate() {
            self.draw_candle(&candle_render_data(index, candle, &params));
        }
        if let Some(last) = window.last() {
            self.draw_price_axis(&params, last)
                .map_err(|e| ChartError::DataApplyFailure(format!("price axis: {e:?}")))?;
        }
        Ok(())
    }

    fn draw_candle(&self, data: &CandleRenderData) {
        let color = if data.bullish { &self.options.up_color } else { &self.options.down_color };
        let ctx = &self.context;

        if self.options.wick_visible {
            ctx.set_stroke_style_str(color);
            ctx.set_line_width(1.0);
            ctx.begin_path();
            ctx.move_to(data.x, data.high_y);
            ctx.line_to(data.x, data.low_y);
            ctx.stroke();
        }

        let left = data.x - data.body_width / 2.0;
        ctx.set_fill_style_str(color);
        ctx.fill_rect(left, data.body_top(), data.body_width, data.body_height().max(1.0));
        if self.options.border_visible {
            ctx.set_stroke_style_str(color);
            ctx.stroke_rect(left, data.body_top(), data.body_width, data.body_height().max(1.0));
        }
    }

    fn draw_price_axis(&self, params: &ScaleParams, last: &Candle) -> Result<(), JsValue> {
        let ctx = &self.context;
        let label_x = params.right_edge() + 6.0;
        ctx.set_font("11px sans-serif");
        ctx.set_fill_style_str("#b2b5be");
        ctx.fill_text(&format_price(params.max_price), label_x, params.price_to_y(params.max_price) + 4.0)?;
        ctx.fill_text(&format_price(params.min_price), label_x, params.price_to_y(params.min_price))?;

        let close = last.close.value();
        let y = params.price_to_y(close);
        let color = if last.is_bearish() { &self.options.down_color } else { &self.options.up_color };
        ctx.set_stroke_style_str(color);
        ctx.set_line_width(1.0);
        ctx.begin_path();
        ctx.move_to(params.right_edge() - params.chart_width, y);
        ctx.line_to(params.right_edge(), y);
        ctx.stroke();
        ctx.set_fill_style_str(color);
        ctx.fill_text(&format_price(close), label_x, y + 4.0)
    }
}

impl SeriesHandle for CanvasCandleSeries {
    /// The stored data only changes once the new data has been drawn
    fn set_data(&mut self, series: &CandleSeries) -> Result<(), ChartError> {
        self.draw(series)?;
        self.data = series.clone();
        Ok(())
    }

    fn update(&mut self, candle: &Candle) -> Result<(), ChartError> {
        let mut next = self.data.clone();
        if !next.upsert_tail(*candle) {
            return Err(ChartError::DataApplyFailure(format!(
                "bucket {} is older than the last bar",
                candle.bucket_start
            )));
        }
        self.draw(&next)?;
        self.data = next;
        Ok(())
    }
}

fn paint_background(context: &CanvasRenderingContext2d, frame: &Frame) {
    let dimensions = frame.dimensions.get();
    context.set_fill_style_str(&frame.background);
    context.fill_rect(0.0, 0.0, dimensions.width as f64, dimensions.height as f64);
}
