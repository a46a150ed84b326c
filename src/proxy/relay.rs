use crate::config::types::RelayRoute;
use crate::utils::response::status_only;
use anyhow::Result;
use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::http::Version;
use hyper::{Body, Client, Method, Request, Response, StatusCode, Uri, header};
use log::{debug, error, info, trace, warn};

/// Bodies larger than this are relayed but not pretty-printed into the log
pub const MAX_DIAGNOSTIC_BODY: usize = 1024 * 1024;

/// Forwards requests under the relay prefix to the configured upstream origin
#[derive(Debug, Clone)]
pub struct RelayHandler {
    route: RelayRoute,
    client: Client<HttpConnector, Body>,
}

impl RelayHandler {
    pub fn new(route: RelayRoute) -> Self {
        Self { route, client: Client::new() }
    }

    pub fn get_route(&self) -> &RelayRoute {
        &self.route
    }

    /// Point the request at the upstream origin; method, headers, body and query are kept
    pub fn retarget(&self, req: Request<Body>) -> Result<Request<Body>> {
        let (mut parts, body) = req.into_parts();
        let path = self.route.upstream_path(parts.uri.path());
        let path_and_query = match parts.uri.query() {
            Some(query) => format!("{}?{}", path, query),
            None => path.to_string(),
        };
        parts.uri = self.route.get_origin().to_uri(&path_and_query)?;
        parts.version = Version::HTTP_11;
        Ok(Request::from_parts(parts, body))
    }

    /// Relay one request and copy the upstream answer back
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let method = req.method().clone();
        let uri = req.uri().clone();
        log_form_keys(&uri);

        let upstream_req = match self.retarget(req) {
            Ok(r) => r,
            Err(e) => {
                warn!("Request time out. Could not target {} for {}: {}", self.route.get_origin(), uri, e);
                return status_only(StatusCode::REQUEST_TIMEOUT);
            }
        };
        debug!("Relaying {} {} -> {}", method, uri, upstream_req.uri());

        match self.client.request(upstream_req).await {
            Ok(upstream) => relay_response(upstream, &uri, &method).await,
            Err(e) => {
                warn!("Request time out. {} {} -> {}: {}", method, uri, self.route.get_origin(), e);
                status_only(StatusCode::REQUEST_TIMEOUT)
            }
        }
    }
}

/// Copy status, headers and the fully buffered body of an upstream response
async fn relay_response(upstream: Response<Body>, uri: &Uri, method: &Method) -> Response<Body> {
    let (parts, body) = upstream.into_parts();

    let mut response = status_only(parts.status);
    for (name, value) in parts.headers.iter() {
        // The body is buffered, so framing is recomputed on the way out
        if name == header::TRANSFER_ENCODING {
            continue;
        }
        response.headers_mut().append(name, value.clone());
    }

    match to_bytes(body).await {
        Ok(bytes) => {
            *response.body_mut() = Body::from(bytes.clone());
            info!("API {}, Method {}", uri, method);
            log_json_body(&bytes);
        }
        Err(e) => {
            response.headers_mut().remove(header::CONTENT_LENGTH);
            info!("API {}, Method {}", uri, method);
            error!("Failed to read upstream body for {}: {}", uri, e);
        }
    }
    response
}

/// Pretty-print a relayed body for the log. Never touches what the caller receives.
pub fn log_json_body(body: &[u8]) {
    if body.len() > MAX_DIAGNOSTIC_BODY {
        debug!("JSON Data omitted, body is {} bytes", body.len());
        return;
    }
    match format_json(body) {
        Ok(pretty) => info!("JSON Data\n{}", pretty),
        Err(e) => debug!("Upstream body is not JSON: {}", e),
    }
}

/// Re-indent a JSON document with two spaces, keeping key order
pub fn format_json(body: &[u8]) -> serde_json::Result<String> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    serde_json::to_string_pretty(&value)
}

fn log_form_keys(uri: &Uri) {
    let Some(query) = uri.query() else {
        return;
    };
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let key = pair.split_once('=').map_or(pair, |(k, _)| k);
        match urlencoding::decode(key) {
            Ok(key) => trace!("Form field: {}", key),
            Err(_) => trace!("Form field (raw): {}", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::UpstreamOrigin;
    use hyper::service::{make_service_fn, service_fn};
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn echo(req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let seen_path = req.uri().path_and_query().map(|pq| pq.to_string()).unwrap_or_default();
        let seen_method = req.method().to_string();
        let seen_token = req.headers().get("x-token").cloned();
        let body = to_bytes(req.into_body()).await.unwrap_or_default();

        let mut builder = Response::builder()
            .status(StatusCode::CREATED)
            .header("x-id", "42")
            .header("x-seen-path", seen_path)
            .header("x-seen-method", seen_method)
            .header(header::SET_COOKIE, "a=1")
            .header(header::SET_COOKIE, "b=2");
        if let Some(token) = seen_token {
            builder = builder.header("x-seen-token", token);
        }
        Ok(builder.body(Body::from(body)).unwrap())
    }

    async fn spawn_upstream() -> SocketAddr {
        let make_svc = make_service_fn(|_| async { Ok::<_, Infallible>(service_fn(echo)) });
        let server = hyper::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    fn handler_for(addr: SocketAddr) -> RelayHandler {
        RelayHandler::new(RelayRoute::new(UpstreamOrigin::new("http", addr.to_string())))
    }

    fn post(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder().method(Method::POST).uri(uri).header("x-token", "t0k3n").body(Body::from(body)).unwrap()
    }

    #[test]
    fn test_retarget_keeps_path_and_query() {
        let handler = RelayHandler::new(RelayRoute::new(UpstreamOrigin::new("http", "localhost:8080")));
        let req = Request::builder().method(Method::PUT).uri("/api/widgets?id=7").header("x-token", "abc").body(Body::empty()).unwrap();
        let req = handler.retarget(req).unwrap();
        assert_eq!(req.uri().to_string(), "http://localhost:8080/api/widgets?id=7");
        assert_eq!(req.method(), Method::PUT);
        assert_eq!(req.headers()["x-token"], "abc");
    }

    #[test]
    fn test_retarget_strips_prefix_when_configured() {
        let route = RelayRoute::new(UpstreamOrigin::new("http", "localhost:8080")).with_strip_prefix(true);
        let handler = RelayHandler::new(route);
        let req = Request::builder().uri("/api/widgets").body(Body::empty()).unwrap();
        let req = handler.retarget(req).unwrap();
        assert_eq!(req.uri().scheme_str(), Some("http"));
        assert_eq!(req.uri().authority().map(|a| a.as_str()), Some("localhost:8080"));
        assert_eq!(req.uri().path(), "/widgets");
    }

    #[tokio::test]
    async fn test_relays_status_headers_and_body() {
        let addr = spawn_upstream().await;
        let handler = handler_for(addr);

        let response = handler.handle(post("/api/widgets", "{\"id\":42}")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-id"], "42");
        assert_eq!(response.headers()["x-seen-method"], "POST");
        assert_eq!(response.headers()["x-seen-path"], "/api/widgets");
        assert_eq!(response.headers()["x-seen-token"], "t0k3n");

        let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);

        assert_eq!(to_bytes(response.into_body()).await.unwrap(), "{\"id\":42}");
    }

    #[tokio::test]
    async fn test_relay_with_stripped_prefix() {
        let addr = spawn_upstream().await;
        let route = RelayRoute::new(UpstreamOrigin::new("http", addr.to_string())).with_strip_prefix(true);
        let handler = RelayHandler::new(route);

        let response = handler.handle(post("/api/widgets?debug=1", "payload")).await;
        assert_eq!(response.headers()["x-seen-path"], "/widgets?debug=1");
        assert_eq!(to_bytes(response.into_body()).await.unwrap(), "payload");
    }

    #[tokio::test]
    async fn test_relay_is_repeatable() {
        let addr = spawn_upstream().await;
        let handler = handler_for(addr);

        let first = handler.handle(post("/api/widgets", "{\"id\":42}")).await;
        let second = handler.handle(post("/api/widgets", "{\"id\":42}")).await;
        assert_eq!(first.status(), second.status());
        assert_eq!(first.headers()["x-id"], second.headers()["x-id"]);
        assert_eq!(to_bytes(first.into_body()).await.unwrap(), to_bytes(second.into_body()).await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_request_timeout() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let handler = handler_for(addr);
        let response = handler.handle(post("/api/widgets", "{}")).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert!(to_bytes(response.into_body()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_truncated_upstream_body_keeps_status_and_headers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            stream.write_all(b"HTTP/1.1 201 Created\r\nx-id: 42\r\ncontent-length: 100\r\n\r\n{\"id\":").await.unwrap();
            stream.shutdown().await.unwrap();
        });

        let handler = handler_for(addr);
        let req = Request::builder().uri("/api/widgets").body(Body::empty()).unwrap();
        let response = handler.handle(req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-id"], "42");
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
        assert!(to_bytes(response.into_body()).await.unwrap().is_empty());
    }

    #[test]
    fn test_format_json_indents_two_spaces() {
        let pretty = format_json(b"{\"b\":1,\"a\":[true,null]}").unwrap();
        assert_eq!(pretty, "{\n  \"b\": 1,\n  \"a\": [\n    true,\n    null\n  ]\n}");
    }

    #[test]
    fn test_format_json_keeps_number_text() {
        let pretty = format_json(b"{\"big\":12345678901234567890123,\"price\":1.50}").unwrap();
        assert_eq!(pretty, "{\n  \"big\": 12345678901234567890123,\n  \"price\": 1.50\n}");
    }

    #[test]
    fn test_format_json_rejects_non_json() {
        assert!(format_json(b"<html></html>").is_err());
        assert!(format_json(b"").is_err());
    }
}
