//! Chart aggregate: rendering surface contract, its lifecycle and the
//! frame scheduler feeding it.

pub mod lifecycle;
pub mod scheduler;
pub mod surface;

pub use lifecycle::*;
pub use scheduler::*;
pub use surface::*;
