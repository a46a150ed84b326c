use crate::config::ServerConfig;
use crate::proxy::request_handler::RequestRouter;
use anyhow::{Result, anyhow};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request};
use log::{error, info};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// Bind the listener and serve until Ctrl-C
pub async fn start_server(config: &ServerConfig) -> Result<()> {
    let (addr, server) = bind_server(config, shutdown_signal())?;

    info!("Serving {} on http://{}", config.get_source().display(), addr);
    if let Some(relay) = config.get_relay() {
        info!("Relaying {}* to {}", relay.get_prefix(), relay.get_origin());
    }

    server.await
}

/// Bind `0.0.0.0:<port>` and return the bound address with the server future.
///
/// Every connection is served on its own task; the future resolves once
/// `shutdown` completes and in-flight requests have finished.
pub fn bind_server(
    config: &ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = Result<()>> + Send + 'static)> {
    let addr = config.socket_addr();
    let builder = hyper::Server::try_bind(&addr).map_err(|e| anyhow!("Failed to bind {}: {}", addr, e))?;

    let router = Arc::new(RequestRouter::new(config));
    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let router = Arc::clone(&router);
        let remote_addr = conn.remote_addr().ip();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let router = Arc::clone(&router);
                async move { Ok::<_, Infallible>(router.handle_request(remote_addr, req).await) }
            }))
        }
    });

    let server = builder.serve(make_svc);
    let local_addr = server.local_addr();
    let graceful = server.with_graceful_shutdown(shutdown);

    Ok((local_addr, async move { graceful.await.map_err(|e| anyhow!("Server error: {}", e)) }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
