//! Request origin resolution

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

use crate::errors::GatewayError;

pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolve the client address: `X-Real-IP`, then the first `X-Forwarded-For`
/// element, then the transport peer. Empty headers count as absent.
pub fn resolve_origin(headers: &HeaderMap, peer: Option<SocketAddr>) -> Result<IpAddr, GatewayError> {
    if let Some(real_ip) = header_str(headers, X_REAL_IP) {
        return parse_address(real_ip);
    }

    if let Some(forwarded) = header_str(headers, X_FORWARDED_FOR) {
        let first = forwarded.split(',').next().map(str::trim).unwrap_or("");
        if first.is_empty() {
            return Err(GatewayError::UnresolvedOrigin);
        }
        return parse_address(first);
    }

    peer.map(|addr| addr.ip().to_canonical())
        .ok_or(GatewayError::UnresolvedOrigin)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_address(address: &str) -> Result<IpAddr, GatewayError> {
    address
        .parse::<IpAddr>()
        .map(|ip| ip.to_canonical())
        .map_err(|_| GatewayError::InvalidAddress {
            address: address.to_string(),
        })
}
