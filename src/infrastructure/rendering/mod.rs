//! Canvas 2D rendering backend.

pub mod canvas_surface;
pub mod geometry;

pub use canvas_surface::*;
pub use geometry::*;
