//! Local development server: serves a directory of static files and relays
//! requests under `/api/` to a backend origin, logging relayed JSON bodies.

pub mod config;
pub mod proxy;
pub mod static_files;
pub mod utils;
