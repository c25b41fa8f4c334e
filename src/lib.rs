//! OpenClaw bridge - HTTP/JSON API over the OpenClaw gateway CLI.

pub mod bridge;
pub mod config;
pub mod server;
