//! Live feed connection: transport contract, DTOs and the connection manager.

pub mod backoff;
pub mod dto;
pub mod gloo_transport;
pub mod stream_manager;

pub use backoff::*;
pub use dto::*;
pub use gloo_transport::*;
pub use stream_manager::*;
