// Configuration module
//
// This module contains all configuration-related functionality split into focused submodules:
// - types: Server, relay route and upstream origin structures
// - validator: Configuration validation logic

pub mod types;
pub mod validator;

pub use types::{RelayRoute, ServerConfig, UpstreamOrigin};
