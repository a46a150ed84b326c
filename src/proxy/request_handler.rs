use crate::config::ServerConfig;
use crate::proxy::relay::RelayHandler;
use crate::static_files::StaticHandler;
use crate::utils::response::redirect_response;
use hyper::{Body, Method, Request, Response, StatusCode};
use log::trace;
use std::net::IpAddr;

/// Dispatches each request to the relay or the static handler by path prefix
#[derive(Debug, Clone)]
pub struct RequestRouter {
    static_handler: StaticHandler,
    relay: Option<RelayHandler>,
}

impl RequestRouter {
    pub fn new(config: &ServerConfig) -> Self {
        Self { static_handler: StaticHandler::new(config.get_source()), relay: config.get_relay().cloned().map(RelayHandler::new) }
    }

    pub fn is_relay_enabled(&self) -> bool {
        self.relay.is_some()
    }

    pub async fn handle_request(&self, client_ip: IpAddr, req: Request<Body>) -> Response<Body> {
        trace!("Request from {ip}: {method} {uri}", ip = client_ip, method = req.method(), uri = req.uri());

        if let Some(relay) = &self.relay {
            let route = relay.get_route();
            if route.matches(req.uri().path()) {
                return relay.handle(req).await;
            }
            // `/api` is sent to `/api/`, as a prefix multiplexer would
            if req.uri().path() == route.bare_prefix() {
                let location = match req.uri().query() {
                    Some(query) => format!("{}?{}", route.get_prefix(), query),
                    None => route.get_prefix().to_string(),
                };
                return redirect_response(StatusCode::MOVED_PERMANENTLY, &location, req.method() == Method::HEAD);
            }
        }
        self.static_handler.handle(req).await
    }
}
