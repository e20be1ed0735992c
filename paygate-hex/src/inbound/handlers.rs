//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use paygate_types::{
    ApiErrorBody, ApiResponse, AppError, GatewayId, PaymentCallback, PaymentResult, Transaction,
    TransactionRequest, TransactionStore, UserId,
};

use super::auth::GatewayCredentials;
use crate::PaymentService;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Application state shared across handlers.
pub struct AppState<S: TransactionStore> {
    pub service: PaymentService<S>,
    pub gateways: GatewayCredentials,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.0, "Request failed");
        }

        let body = ApiErrorBody {
            status_code: status.as_u16(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health<S: TransactionStore>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "event_bus": state.service.publisher().circuit_state().as_str(),
    }))
}

fn idempotency_key(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("Idempotency-Key header is required".into()))
}

/// Decodes and checks a deposit/withdraw body for the authenticated user.
fn transaction_request(
    user_id: UserId,
    headers: &HeaderMap,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<TransactionRequest, AppError> {
    let Json(mut req) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected transaction body");
        AppError::Validation("Could not parse data".into())
    })?;
    req.user_id = user_id;
    req.validate()?;
    req.idempotency_key = Some(idempotency_key(headers)?);
    Ok(req)
}

fn payment_result(tx: Transaction) -> Result<PaymentResult, AppError> {
    let transaction_id = tx
        .id
        .ok_or_else(|| AppError::Internal("Stored transaction has no id".into()))?;
    Ok(PaymentResult { transaction_id })
}

/// Initiates a deposit.
#[tracing::instrument(skip_all, fields(user_id = %user_id))]
pub async fn deposit<S: TransactionStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user_id): Extension<UserId>,
    headers: HeaderMap,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = transaction_request(user_id, &headers, payload)?;
    let tx = state.service.deposit(req).await?;
    Ok(Json(ApiResponse::ok(
        "Deposit initiated",
        Some(payment_result(tx)?),
    )))
}

/// Initiates a withdrawal.
#[tracing::instrument(skip_all, fields(user_id = %user_id))]
pub async fn withdraw<S: TransactionStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user_id): Extension<UserId>,
    headers: HeaderMap,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = transaction_request(user_id, &headers, payload)?;
    let tx = state.service.withdraw(req).await?;
    Ok(Json(ApiResponse::ok(
        "Withdrawal initiated",
        Some(payment_result(tx)?),
    )))
}

/// Receives a gateway's outcome notification.
#[tracing::instrument(skip_all, fields(gateway_id = %gateway_id))]
pub async fn payment_callback<S: TransactionStore>(
    State(state): State<Arc<AppState<S>>>,
    Extension(gateway_id): Extension<GatewayId>,
    payload: Result<Json<PaymentCallback>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(mut callback) = payload.map_err(|_| {
        AppError::Validation("Invalid data. It should include transaction ID and status".into())
    })?;
    callback.gateway_id = gateway_id;

    state.service.handle_callback(callback).await?;
    Ok(Json(ApiResponse::<()>::ok(
        "Callback processed successfully",
        None,
    )))
}
