use crate::utils::path::normalize_prefix;
use crate::utils::validation::is_empty_or_whitespace;
use anyhow::{Result, anyhow};
use hyper::Uri;
use serde::Serialize;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

pub const DEFAULT_SOURCE_DIR: &str = ".";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RELAY_PREFIX: &str = "/api/";
pub const DEFAULT_UPSTREAM_SCHEME: &str = "http";

/// Everything the server needs at startup; immutable once the listener is bound.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    // Directory served by the static handler
    pub(crate) source: PathBuf,
    // Port bound on all interfaces
    pub(crate) port: u16,
    // Relay is disabled when no destination was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) relay: Option<RelayRoute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayRoute {
    pub(crate) prefix: String,
    pub(crate) strip_prefix: bool,
    pub(crate) origin: UpstreamOrigin,
}

/// Fixed (scheme, host) pair that relayed requests are re-targeted to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamOrigin {
    pub(crate) scheme: String,
    pub(crate) authority: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_DIR, DEFAULT_PORT)
    }
}

impl ServerConfig {
    pub fn new(source: impl AsRef<Path>, port: u16) -> Self {
        Self { source: source.as_ref().to_path_buf(), port, relay: None }
    }

    /// Build a config from raw command line values, resolving the optional destination
    pub fn from_args(source: impl AsRef<Path>, port: u16, dest: Option<&str>) -> Result<Self> {
        let mut config = Self::new(source, port);
        if let Some(origin) = dest.map(UpstreamOrigin::from_dest).transpose()?.flatten() {
            config.relay = Some(RelayRoute::new(origin));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_relay(mut self, relay: RelayRoute) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn get_source(&self) -> &PathBuf {
        &self.source
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_relay(&self) -> Option<&RelayRoute> {
        self.relay.as_ref()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port)
    }
}

impl RelayRoute {
    pub fn new(origin: UpstreamOrigin) -> Self {
        Self { prefix: DEFAULT_RELAY_PREFIX.to_string(), strip_prefix: false, origin }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = normalize_prefix(prefix.into());
        self
    }

    /// Remove the route prefix from the path before forwarding
    pub fn with_strip_prefix(mut self, strip: bool) -> Self {
        self.strip_prefix = strip;
        self
    }

    pub fn get_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn get_origin(&self) -> &UpstreamOrigin {
        &self.origin
    }

    pub fn is_strip_prefix(&self) -> bool {
        self.strip_prefix
    }

    /// True when the request path belongs to this route
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(self.prefix.as_str())
    }

    /// The prefix without its trailing slash, e.g. `/api`
    pub fn bare_prefix(&self) -> &str {
        self.prefix.strip_suffix('/').unwrap_or(&self.prefix)
    }

    /// Path the upstream should see for an inbound request path
    pub fn upstream_path<'a>(&self, path: &'a str) -> &'a str {
        if !self.strip_prefix {
            return path;
        }
        match path.strip_prefix(self.bare_prefix()) {
            Some("") | None => "/",
            Some(rest) => rest,
        }
    }
}

impl UpstreamOrigin {
    pub fn new(scheme: impl Into<String>, authority: impl Into<String>) -> Self {
        Self { scheme: scheme.into(), authority: authority.into() }
    }

    /// Parse a `host[:port]` destination. Empty input means the relay is disabled.
    pub fn from_dest(dest: &str) -> Result<Option<Self>> {
        if is_empty_or_whitespace(dest) {
            return Ok(None);
        }
        let dest = dest.trim();
        let authority = match dest.split_once("://") {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case(DEFAULT_UPSTREAM_SCHEME) => rest,
            Some((scheme, _)) => return Err(anyhow!("Unsupported destination scheme '{}', only http is relayed", scheme)),
            None => dest,
        };
        let authority = authority.trim_end_matches('/');
        Self::validate_authority(authority).map_err(|e| anyhow!("Invalid destination '{}': {}", dest, e))?;
        Ok(Some(Self::new(DEFAULT_UPSTREAM_SCHEME, authority)))
    }

    pub fn get_authority(&self) -> &str {
        &self.authority
    }

    /// Absolute URI on this origin for the given path and query
    pub fn to_uri(&self, path_and_query: &str) -> Result<Uri> {
        Ok(Uri::builder().scheme(self.scheme.as_str()).authority(self.authority.as_str()).path_and_query(path_and_query).build()?)
    }
}

impl Display for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json)
    }
}

impl Display for UpstreamOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}
