//! HTTP access to the historical bars endpoint.

pub mod history_client;

pub use history_client::*;
