// Proxy module
//
// This module contains the server side of devproxy split into focused submodules:
// - http_server: listener setup and graceful shutdown
// - request_handler: prefix dispatch between relay and static files
// - relay: forwarding to the upstream origin

pub mod http_server;
pub mod relay;
pub mod request_handler;

pub use http_server::{bind_server, start_server};
