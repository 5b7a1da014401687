//! Web server
//!
//! Serves the merged catalog behind the access gateway.
//!
//! Routes:
//! - `GET /health` (never gated)
//! - `GET /playlist.m3u`
//! - `GET /api/v1/channels`
//! - `GET|POST|DELETE /api/v1/users`
//! - `PUT|DELETE /api/v1/users/{name}`
//!
//! Layers, outermost first: CORS, request logging, geo gateway, auth.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, put},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

use crate::auth::Authenticator;
use crate::errors::{AppError, AppResult};
use crate::proxy::M3uGenerator;
use crate::security::{CorsPolicy, PolicyHandle};
use crate::services::CatalogStore;

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod responses;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogStore>,
    pub policy: PolicyHandle,
    /// `None` disables authentication
    pub auth: Option<Authenticator>,
    pub generator: M3uGenerator,
}

impl AppState {
    pub fn new(catalog: Arc<CatalogStore>, policy: PolicyHandle, auth: Option<Authenticator>) -> Self {
        Self {
            catalog,
            policy,
            auth,
            generator: M3uGenerator::new(),
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState, cors: &CorsPolicy) -> AppResult<Router> {
    let gated = Router::new()
        .route("/playlist.m3u", get(handlers::playlist))
        .route("/api/v1/channels", get(handlers::channels))
        .route(
            "/api/v1/users",
            get(handlers::users)
                .post(handlers::create_user)
                .delete(handlers::drop_users),
        )
        .route(
            "/api/v1/users/{name}",
            put(handlers::change_password).delete(handlers::remove_user),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::auth_middleware))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::geo_gateway_middleware,
        ));

    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(gated)
        .layer(from_fn(middleware::request_logging_middleware))
        .with_state(state);

    Ok(match cors_layer(cors)? {
        Some(layer) => app.layer(layer),
        None => app,
    })
}

fn cors_layer(cors: &CorsPolicy) -> AppResult<Option<CorsLayer>> {
    if cors.disabled {
        return Ok(None);
    }

    let allow_origin = if cors.origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = cors
            .origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|e| {
                    AppError::configuration(format!("Invalid CORS origin '{origin}': {e}"))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any),
    ))
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, app: Router) -> Self {
        Self { addr, app }
    }

    /// Serve until the token is cancelled, then drain in-flight requests
    pub async fn serve_with_cancellation(self, cancellation_token: CancellationToken) -> AppResult<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| AppError::configuration(format!("Failed to bind to {}: {e}", self.addr)))?;
        info!("Listening on {}", self.addr);

        let shutdown_signal = async move {
            cancellation_token.cancelled().await;
            info!("Web server received cancellation signal, shutting down gracefully");
        };

        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}
