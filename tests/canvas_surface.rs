#![cfg(target_arch = "wasm32")]

use live_candles_wasm::domain::chart::{
    Dimensions, HostContainer, SeriesHandle, SeriesKind, SeriesOptions, Surface, SurfaceFactory, SurfaceOptions,
};
use live_candles_wasm::domain::market_data::{Candle, CandleSeries, Price};
use live_candles_wasm::infrastructure::rendering::{CanvasSurfaceFactory, DomContainer};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn container(width: u32, height: u32) -> DomContainer {
    let document = web_sys::window().unwrap().document().unwrap();
    let element = document.create_element("div").unwrap().dyn_into::<web_sys::HtmlElement>().unwrap();
    element.set_attribute("style", &format!("width: {width}px; height: {height}px;")).unwrap();
    document.body().unwrap().append_child(&element).unwrap();
    DomContainer::new(element)
}

#[wasm_bindgen_test]
fn container_reports_layout_size() {
    let container = container(640, 360);
    assert_eq!(container.measure(), Dimensions::new(640, 360));
}

#[wasm_bindgen_test]
fn surface_draws_and_removes_its_canvas() {
    let container = container(640, 360);
    let factory = CanvasSurfaceFactory::new(container.clone());
    let mut surface = factory.create(&SurfaceOptions::new(Dimensions::new(640, 360))).unwrap();
    assert_eq!(container.element().child_element_count(), 1);

    let id = surface.add_series(SeriesKind::Candlestick, &SeriesOptions::default()).unwrap();
    let data = CandleSeries::from_candles(vec![
        Candle::new(0, Price::from(10.0), Price::from(12.0), Price::from(9.5), Price::from(11.0)),
        Candle::new(60, Price::from(11.0), Price::from(11.5), Price::from(10.0), Price::from(10.2)),
    ]);
    let series = surface.series_mut(id).unwrap();
    series.set_data(&data).unwrap();
    series.update(&Candle::flat(120, Price::from(10.4))).unwrap();
    assert!(series.update(&Candle::flat(0, Price::from(1.0))).is_err());
    assert_eq!(series.data().len(), 3);
    assert_eq!(series.data().get(0).map(|c| c.close.value()), Some(11.0));

    surface.apply_options(Dimensions::new(800, 400)).unwrap();
    assert_eq!(surface.dimensions(), Dimensions::new(800, 400));

    surface.dispose();
    surface.dispose();
    assert_eq!(container.element().child_element_count(), 0);
}
