//! Bridge layer between HTTP handlers and the OpenClaw gateway CLI.
//!
//! Command construction, process execution with timeouts, the result cache,
//! the query facade, and the follow-mode log relay.

mod cache;
mod command;
mod error;
mod facade;
mod relay;
mod runner;

pub use cache::*;
pub use command::*;
pub use error::*;
pub use facade::*;
pub use relay::*;
pub use runner::*;
