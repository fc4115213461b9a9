#![allow(dead_code)]

use live_candles_wasm::domain::chart::{
    Dimensions, SeriesHandle, SeriesId, SeriesKind, SeriesOptions, Surface, SurfaceFactory, SurfaceOptions,
};
use live_candles_wasm::domain::errors::ChartError;
use live_candles_wasm::domain::market_data::{Candle, CandleSeries};
use std::cell::RefCell;
use std::rc::Rc;

/// Calls made against the fake backend, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(Dimensions),
    AddSeries,
    SetData(usize),
    Update(Candle),
    ApplyOptions(Dimensions),
    Dispose,
}

#[derive(Debug, Default)]
pub struct Backend {
    pub calls: Vec<Call>,
    pub fail_create: u32,
    pub fail_set_data: bool,
    pub fail_update: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeFactory {
    pub backend: Rc<RefCell<Backend>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.backend.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.backend.borrow_mut().calls.clear();
    }

    pub fn fail_next_creates(&self, count: u32) {
        self.backend.borrow_mut().fail_create = count;
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.backend.borrow().calls.iter().filter(|c| pred(c)).count()
    }
}

impl SurfaceFactory for FakeFactory {
    type Surface = FakeSurface;

    fn create(&self, options: &SurfaceOptions) -> Result<FakeSurface, ChartError> {
        let mut backend = self.backend.borrow_mut();
        backend.calls.push(Call::Create(options.dimensions));
        if backend.fail_create > 0 {
            backend.fail_create -= 1;
            return Err(ChartError::SurfaceInitFailure("no graphics context".to_string()));
        }
        Ok(FakeSurface { backend: Rc::clone(&self.backend), series: Vec::new() })
    }
}

pub struct FakeSurface {
    backend: Rc<RefCell<Backend>>,
    series: Vec<FakeSeries>,
}

impl Surface for FakeSurface {
    type Series = FakeSeries;

    fn add_series(&mut self, _kind: SeriesKind, _options: &SeriesOptions) -> Result<SeriesId, ChartError> {
        self.backend.borrow_mut().calls.push(Call::AddSeries);
        self.series.push(FakeSeries { backend: Rc::clone(&self.backend) });
        Ok(SeriesId(self.series.len() - 1))
    }

    fn series_mut(&mut self, id: SeriesId) -> Option<&mut FakeSeries> {
        self.series.get_mut(id.0)
    }

    fn apply_options(&mut self, dimensions: Dimensions) -> Result<(), ChartError> {
        self.backend.borrow_mut().calls.push(Call::ApplyOptions(dimensions));
        Ok(())
    }

    fn dispose(&mut self) {
        self.backend.borrow_mut().calls.push(Call::Dispose);
    }
}

pub struct FakeSeries {
    backend: Rc<RefCell<Backend>>,
}

impl SeriesHandle for FakeSeries {
    fn set_data(&mut self, series: &CandleSeries) -> Result<(), ChartError> {
        let mut backend = self.backend.borrow_mut();
        backend.calls.push(Call::SetData(series.len()));
        if backend.fail_set_data {
            return Err(ChartError::DataApplyFailure("rejected".to_string()));
        }
        Ok(())
    }

    fn update(&mut self, candle: &Candle) -> Result<(), ChartError> {
        let mut backend = self.backend.borrow_mut();
        backend.calls.push(Call::Update(*candle));
        if backend.fail_update {
            return Err(ChartError::DataApplyFailure("rejected".to_string()));
        }
        Ok(())
    }
}

pub const ROOMY: Dimensions = Dimensions { width: 800, height: 400 };
pub const COLLAPSED: Dimensions = Dimensions { width: 0, height: 0 };
