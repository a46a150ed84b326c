use anyhow::Result;
use clap::{ArgAction, Parser};
use devproxy::config::ServerConfig;
use devproxy::config::types::{DEFAULT_PORT, DEFAULT_SOURCE_DIR};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "devproxy", about, author, version, long_about = None, disable_version_flag = true)]
pub struct DevProxyArguments {
    #[arg(short = 's', long = "source", default_value = DEFAULT_SOURCE_DIR, help = "Static resources directory")]
    pub(crate) source: PathBuf,
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT, help = "Local server port")]
    pub(crate) port: u16,
    #[arg(short = 'd', long = "dest", help = "Proxy server (host:port) that receives /api/ requests")]
    pub(crate) dest: Option<String>,
    // Handled by clap, exits before the struct is built
    #[allow(dead_code)]
    #[arg(short = 'v', long = "version", action = ArgAction::Version, help = "Output version")]
    version: Option<bool>,
}

impl DevProxyArguments {
    /// Resolve the parsed flags into a validated server configuration
    pub fn to_config(&self) -> Result<ServerConfig> {
        ServerConfig::from_args(&self.source, self.port, self.dest.as_deref())
    }
}
