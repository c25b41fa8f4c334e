//! HTTP API for the dashboard, backed by the gateway bridge.

mod api;
mod error;
mod handlers;
#[allow(clippy::module_inception)]
mod server;

pub use api::*;
pub use error::{ApiError, ServerError};
pub use handlers::*;
pub use server::BridgeServer;
