//! Market data aggregate: ticks, candles and the folding/merging rules.

pub mod bucketer;
pub mod entities;
pub mod merge;
pub mod normalizer;
pub mod repositories;
pub mod value_objects;

pub use bucketer::*;
pub use entities::*;
pub use merge::*;
pub use normalizer::*;
pub use value_objects::*;
