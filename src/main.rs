mod cli;

use crate::cli::DevProxyArguments;
use anyhow::Result;
use clap::Parser;
use devproxy::proxy;
use log::{LevelFilter, info, trace};

#[tokio::main]
async fn main() -> Result<()> {
    let args = DevProxyArguments::parse();
    pretty_env_logger::env_logger::builder()
        .format_timestamp(None)
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("Starting devproxy");
    trace!("Arguments: {:#?}", args);

    let config = args.to_config()?;
    trace!("Configuration: {}", config);

    proxy::start_server(&config).await
}
