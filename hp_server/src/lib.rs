//! House poker server: rooms are hosted in-process and played over WebSockets.

pub mod api;
pub mod config;
pub mod logging;
