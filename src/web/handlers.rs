//! Route handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{debug, info};

use super::extractors::AuthenticatedPrincipal;
use super::responses::{api_error, ApiResponse};
use super::AppState;
use crate::auth::UserStore;

pub const M3U_CONTENT_TYPE: &str = "audio/x-mpegurl";

pub async fn health() -> &'static str {
    "OK"
}

/// The merged catalog as extended M3U
pub async fn playlist(State(state): State<AppState>) -> Response {
    let snapshot = state.catalog.snapshot().await;
    let body = state.generator.render(&snapshot);
    ([(header::CONTENT_TYPE, M3U_CONTENT_TYPE)], body).into_response()
}

/// The merged catalog as JSON entries
pub async fn channels(State(state): State<AppState>) -> Response {
    let snapshot = state.catalog.snapshot().await;
    ApiResponse::success(&snapshot.entries).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
}

fn user_store(state: &AppState) -> Result<Arc<dyn UserStore>, Response> {
    state
        .auth
        .as_ref()
        .map(|auth| auth.users().clone())
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Authentication is not configured"))
}

/// Known user names
pub async fn users(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Response {
    debug!("User list requested by {:?}", principal);
    let names = match state.auth.as_ref() {
        Some(auth) => auth.users().list_users().await,
        None => Vec::new(),
    };
    ApiResponse::success(names).into_response()
}

pub async fn create_user(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(request): Json<CreateUserRequest>,
) -> Response {
    let store = match user_store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };
    if request.username.trim().is_empty() || request.password.is_empty() {
        return api_error(
            StatusCode::BAD_REQUEST,
            "username and password must not be empty",
        );
    }

    match store.add_user(&request.username, &request.password).await {
        Ok(()) => {
            info!("User '{}' added by {:?}", request.username, principal);
            (
                StatusCode::CREATED,
                ApiResponse::success(request.username),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(username): Path<String>,
    Json(request): Json<ChangePasswordRequest>,
) -> Response {
    let store = match user_store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };
    if request.password.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "password must not be empty");
    }

    match store.change_password(&username, &request.password).await {
        Ok(()) => {
            info!("Password of '{}' changed by {:?}", username, principal);
            ApiResponse::success(username).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn remove_user(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(username): Path<String>,
) -> Response {
    let store = match user_store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };

    match store.remove_user(&username).await {
        Ok(()) => {
            info!("User '{}' removed by {:?}", username, principal);
            ApiResponse::success(username).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Remove every user. Bearer tokens keep working afterwards.
pub async fn drop_users(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Response {
    let store = match user_store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };

    let removed = store.list_users().await.len();
    match store.drop_users().await {
        Ok(()) => {
            info!("All {} users dropped by {:?}", removed, principal);
            ApiResponse::success(removed).into_response()
        }
        Err(e) => e.into_response(),
    }
}
