use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use uuid::Uuid;

use service_core::error::AppError;

use crate::dtos::payments::{CreatePaymentRequest, PaymentListQuery, PaymentResponse, SimulatePaymentRequest};
use crate::middleware::AuthUser;
use crate::models::Capability;
use crate::services::checkout::SIGNATURE_HEADER;
use crate::AppState;

pub async fn list_payments(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    auth.0.require(Capability::Invoicing)?;

    let payments = state.payments.list(&query).await?;
    Ok(Json(
        payments.into_iter().map(PaymentResponse::from).collect(),
    ))
}

pub async fn get_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, AppError> {
    auth.0.require(Capability::Invoicing)?;

    let payment = state.payments.get(id).await?;
    Ok(Json(PaymentResponse::from(payment)))
}

pub async fn create_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    auth.0.require(Capability::Invoicing)?;

    let operator = auth.operator()?;
    let (payment, redirect_url) = state.payments.create(request, &operator).await?;

    let mut response = PaymentResponse::from(payment);
    response.redirect_url = redirect_url;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Completes a pending payment without the provider (dev/demo path).
pub async fn simulate_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SimulatePaymentRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    auth.0.require(Capability::Invoicing)?;

    let payment = state.payments.simulate(request.payment_id).await?;
    Ok(Json(PaymentResponse::from(payment)))
}

/// Provider webhook. Signature is verified over the raw body before
/// anything is parsed.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing webhook signature header");
            AppError::Unauthorized(anyhow::anyhow!("Missing webhook signature"))
        })?;

    let is_valid = state
        .checkout
        .verify_webhook_signature(&body, signature)
        .map_err(|e| {
            tracing::error!(error = %e, "Webhook signature verification error");
            AppError::InternalError(anyhow::anyhow!("Webhook verification failed"))
        })?;
    if !is_valid {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Invalid webhook signature"
        )));
    }

    let event = state.checkout.parse_webhook_event(&body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse webhook event");
        AppError::BadRequest(anyhow::anyhow!("Invalid webhook payload"))
    })?;

    tracing::info!(event_type = %event.event, session_id = %event.session_id, "Processing checkout webhook");
    state.payments.apply_webhook(event).await?;

    Ok(StatusCode::OK)
}
