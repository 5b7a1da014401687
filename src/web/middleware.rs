//! HTTP middleware
//!
//! Request logging, the geographic access gateway and authentication.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, Method, Uri},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, info, warn};

use super::extractors::AuthenticatedPrincipal;
use super::responses::{access_denied, internal_error, unauthorized};
use super::AppState;
use crate::security::{resolve_origin, Credentials, Verdict};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request logging middleware
///
/// Logs all incoming requests with timing information
pub async fn request_logging_middleware(
    method: Method,
    uri: Uri,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    // Generate request ID for tracing
    let request_id = uuid::Uuid::new_v4().to_string();

    debug!(
        method = %method,
        uri = %uri,
        request_id = %request_id,
        "HTTP request started"
    );

    let mut response = next.run(request).await;
    let status = response.status().as_u16();
    let duration = start.elapsed();

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    if status >= 400 {
        warn!(
            method = %method,
            uri = %uri,
            status = status,
            request_id = %request_id,
            duration_ms = duration.as_millis(),
            "HTTP request completed with error"
        );
    } else {
        info!(
            method = %method,
            uri = %uri,
            status = status,
            request_id = %request_id,
            duration_ms = duration.as_millis(),
            "HTTP request completed"
        );
    }

    response
}

/// Geographic access gateway
///
/// Without a geo dataset every request passes. Otherwise trusted networks
/// pass, whitelisted countries pass, everyone else gets 403. Failing to
/// resolve the origin or to look it up is a 500.
pub async fn geo_gateway_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let policy = state.policy.current().await;
    if !policy.geo_enabled() {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let ip = match resolve_origin(request.headers(), peer) {
        Ok(ip) => ip,
        Err(e) => {
            warn!("Rejecting request: {}", e);
            return internal_error();
        }
    };

    match policy.evaluate(ip) {
        Ok(Verdict::Deny { country }) => {
            warn!(
                "Access Denied: {}, Country: {}",
                ip,
                country.as_deref().unwrap_or("unknown")
            );
            access_denied()
        }
        Ok(verdict) => {
            debug!("Gateway verdict for {}: {:?}", ip, verdict);
            next.run(request).await
        }
        Err(e) => {
            error!("Rejecting request: {}", e);
            internal_error()
        }
    }
}

/// Authentication middleware
///
/// A no-op unless authentication is configured. Then requests need valid
/// Basic credentials or a known bearer token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    credentials: Credentials,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(authenticator) = state.auth.as_ref() else {
        return next.run(request).await;
    };

    match authenticator.authorize(&credentials).await {
        Some(principal) => {
            request
                .extensions_mut()
                .insert(AuthenticatedPrincipal(principal));
            next.run(request).await
        }
        None => {
            if let Some(username) = credentials.username() {
                warn!("Authentication failed for user '{}'", username);
            }
            unauthorized()
        }
    }
}
