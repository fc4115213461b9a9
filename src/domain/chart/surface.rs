//! Adapter contract for the charting backend.
//!
//! The lifecycle owns one [`Surface`]; the surface owns its series handles
//! and hands out mutable access by [`SeriesId`].

use crate::domain::errors::ChartError;
use crate::domain::market_data::{Candle, CandleSeries};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Size of the host container in logical units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[display(fmt = "{}x{}", width, height)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both axes strictly above `min`
    pub fn exceeds(&self, min: u32) -> bool {
        self.width > min && self.height > min
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum SeriesKind {
    #[display(fmt = "Candlestick")]
    #[strum(serialize = "candlestick")]
    Candlestick,
}

/// Visual options of a candlestick series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeriesOptions {
    pub up_color: String,
    pub down_color: String,
    pub wick_visible: bool,
    pub border_visible: bool,
}

impl Default for SeriesOptions {
    fn default() -> Self {
        Self {
            up_color: "#26a69a".to_string(),
            down_color: "#ef5350".to_string(),
            wick_visible: true,
            border_visible: false,
        }
    }
}

/// Options the surface is created with
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceOptions {
    pub dimensions: Dimensions,
    pub background: String,
    pub time_visible: bool,
    pub seconds_visible: bool,
}

impl SurfaceOptions {
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            background: "#131722".to_string(),
            time_visible: true,
            seconds_visible: false,
        }
    }
}

/// Identifier of a series owned by a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "series#{}", _0)]
pub struct SeriesId(pub usize);

/// One data series on a surface
pub trait SeriesHandle {
    /// Replace the whole data set
    fn set_data(&mut self, series: &CandleSeries) -> Result<(), ChartError>;
    /// Patch a single point: the last bar or a newer one
    fn update(&mut self, candle: &Candle) -> Result<(), ChartError>;
}

/// A live rendering surface
pub trait Surface {
    type Series: SeriesHandle;

    fn add_series(&mut self, kind: SeriesKind, options: &SeriesOptions) -> Result<SeriesId, ChartError>;
    fn series_mut(&mut self, id: SeriesId) -> Option<&mut Self::Series>;
    fn apply_options(&mut self, dimensions: Dimensions) -> Result<(), ChartError>;
    /// Release every resource held by the surface
    fn dispose(&mut self);
}

/// Creates surfaces inside the host container
pub trait SurfaceFactory {
    type Surface: Surface;

    fn create(&self, options: &SurfaceOptions) -> Result<Self::Surface, ChartError>;
}

/// Read access to the host container's geometry
pub trait HostContainer {
    fn measure(&self) -> Dimensions;
}
