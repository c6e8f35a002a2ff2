use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use crate::dtos::invoices::{
    CancelInvoiceRequest, CreateInvoiceRequest, DeleteInvoiceRequest, InvoiceListQuery,
    InvoiceResponse, MarkPaidRequest,
};
use crate::middleware::AuthUser;
use crate::models::Capability;
use crate::AppState;

pub async fn list_invoices(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    auth.0.require(Capability::Invoicing)?;

    let invoices = state.invoices.list(&query).await?;
    Ok(Json(
        invoices.into_iter().map(InvoiceResponse::from).collect(),
    ))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    auth.0.require(Capability::Invoicing)?;

    let invoice = state.invoices.get(id).await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    auth.0.require(Capability::Invoicing)?;
    request.validate()?;

    let operator = auth.operator()?;
    let invoice = state.invoices.create(request, &operator).await?;
    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(invoice))))
}

pub async fn send_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    auth.0.require(Capability::Invoicing)?;

    let invoice = state.invoices.send(id).await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

pub async fn pay_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    request: Option<Json<MarkPaidRequest>>,
) -> Result<Json<InvoiceResponse>, AppError> {
    auth.0.require(Capability::Invoicing)?;

    let payment_id = request.map(|Json(r)| r.payment_id).unwrap_or_default();
    let invoice = state.invoices.mark_paid(id, payment_id).await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

pub async fn cancel_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    auth.0.require(Capability::ManageSales)?;
    request.validate()?;

    let operator = auth.operator()?;
    let invoice = state.invoices.cancel(id, &request.reason, &operator).await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<DeleteInvoiceRequest>,
) -> Result<StatusCode, AppError> {
    auth.0.require(Capability::ManageSales)?;
    request.validate()?;

    let operator = auth.operator()?;
    state.invoices.delete(id, &request.reason, &operator).await?;
    Ok(StatusCode::NO_CONTENT)
}
