//! Caller identification middleware.
//!
//! Users are identified by the `X-User-Id` header set by the upstream identity
//! layer. Gateways authenticate callbacks with `X-Gateway-Api-Key`, checked
//! against SHA-256 hashes of the configured keys.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use paygate_repo::security::{hash_api_key, verify_api_key};
use paygate_types::{AppError, GatewayId, TransactionStore, UserId};

use super::handlers::{ApiError, AppState};

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const GATEWAY_KEY_HEADER: &str = "X-Gateway-Api-Key";

/// Hashed API keys of the gateways allowed to post callbacks.
#[derive(Debug, Clone, Default)]
pub struct GatewayCredentials {
    keys: Vec<(GatewayId, String)>,
}

impl GatewayCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a raw key for `gateway`. Only its hash is kept.
    pub fn with_key(mut self, gateway: GatewayId, raw_key: &str) -> Self {
        self.keys.push((gateway, hash_api_key(raw_key)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Resolves a presented key. Every stored hash is compared so the lookup
    /// time does not depend on which entry matches.
    pub fn authenticate(&self, raw_key: &str) -> Option<GatewayId> {
        let mut found = None;
        for (gateway, hash) in &self.keys {
            if verify_api_key(raw_key, hash) && found.is_none() {
                found = Some(*gateway);
            }
        }
        found
    }
}

fn header<'a>(request: &'a Request<Body>, name: &str) -> Option<&'a str> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Attaches the caller's [`UserId`] to the request.
pub async fn user_auth_middleware(
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let user_id = header(&request, USER_ID_HEADER)
        .and_then(|v| v.parse::<UserId>().ok())
        .filter(|id| id.is_valid());

    match user_id {
        Some(user_id) => {
            request.extensions_mut().insert(user_id);
            next.run(request).await
        }
        None => ApiError(AppError::Unauthorized("User ID not found in request".into()))
            .into_response(),
    }
}

/// Attaches the authenticated gateway's [`GatewayId`] to the request.
pub async fn gateway_auth_middleware<S: TransactionStore>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(raw_key) = header(&request, GATEWAY_KEY_HEADER) else {
        return ApiError(AppError::Unauthorized("Gateway API key is required".into()))
            .into_response();
    };

    match state.gateways.authenticate(raw_key) {
        Some(gateway_id) => {
            request.extensions_mut().insert(gateway_id);
            next.run(request).await
        }
        None => {
            tracing::warn!("Rejected callback with unknown gateway key");
            ApiError(AppError::Unauthorized("Invalid gateway API key".into())).into_response()
        }
    }
}
