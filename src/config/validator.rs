use crate::config::types::{ServerConfig, UpstreamOrigin};
use crate::utils::validation::{validate_hostname_chars, validate_port_range};
use anyhow::{Result, bail};
use std::net::Ipv6Addr;

impl ServerConfig {
    /// Check that the source directory exists and the relay route is usable
    pub fn validate(&self) -> Result<()> {
        if !self.source.is_dir() {
            bail!("Source directory does not exist or is not a directory: {}", self.source.display());
        }
        if let Some(relay) = &self.relay {
            if let Err(err) = UpstreamOrigin::validate_authority(relay.get_origin().get_authority()) {
                bail!("Invalid relay destination: {}", err);
            }
            if !relay.get_prefix().starts_with('/') || !relay.get_prefix().ends_with('/') {
                bail!("Relay prefix must start and end with '/': {}", relay.get_prefix());
            }
        }
        Ok(())
    }
}

impl UpstreamOrigin {
    /// Validate a `host[:port]` authority. Bracketed IPv6 literals are accepted.
    pub fn validate_authority(authority: &str) -> Result<(), String> {
        if authority.is_empty() {
            return Err("Destination host is empty".to_string());
        }
        if authority.contains(['/', '?', '#', '@']) {
            return Err("Destination must be host[:port] without path or credentials".to_string());
        }

        let (host, port) = split_host_port(authority)?;
        if let Some(port) = port {
            let port = port.parse::<u16>().map_err(|_| format!("Invalid port '{}'", port))?;
            validate_port_range(port)?;
        }

        let is_valid_host = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            Some(v6) => v6.parse::<Ipv6Addr>().is_ok(),
            None => validate_hostname_chars(host),
        };
        if !is_valid_host {
            return Err(format!("Invalid host '{}'", host));
        }
        Ok(())
    }
}

fn split_host_port(authority: &str) -> Result<(&str, Option<&str>), String> {
    if authority.starts_with('[') {
        let end = authority.find(']').ok_or_else(|| "Unterminated IPv6 literal".to_string())?;
        let (host, rest) = authority.split_at(end + 1);
        return match rest.strip_prefix(':') {
            Some(port) => Ok((host, Some(port))),
            None if rest.is_empty() => Ok((host, None)),
            None => Err(format!("Unexpected characters after IPv6 literal: '{}'", rest)),
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => Ok((host, Some(port))),
        None => Ok((authority, None)),
    }
}
