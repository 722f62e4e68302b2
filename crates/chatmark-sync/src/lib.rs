//! Sync layer: HTTP transport to the external store and the request runner.

pub mod runner;
pub mod transport;

#[cfg(feature = "http")]
pub mod http;

pub use runner::Runner;
pub use transport::Transport;

#[cfg(feature = "http")]
pub use http::{ApiClient, ApiError, DEFAULT_BASE_URL};
