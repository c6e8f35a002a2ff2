use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use crate::dtos::invoices::InvoiceResponse;
use crate::dtos::quotes::{
    CreateQuoteRequest, QuoteListQuery, QuoteResponse, SetQuoteStatusRequest,
};
use crate::middleware::AuthUser;
use crate::models::Capability;
use crate::AppState;

pub async fn list_quotes(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<QuoteListQuery>,
) -> Result<Json<Vec<QuoteResponse>>, AppError> {
    auth.0.require(Capability::ManageSales)?;

    let quotes = state.quotes.list(&query).await?;
    Ok(Json(quotes.into_iter().map(QuoteResponse::from).collect()))
}

pub async fn get_quote(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<QuoteResponse>, AppError> {
    auth.0.require(Capability::ManageSales)?;

    let quote = state.quotes.get(id).await?;
    Ok(Json(QuoteResponse::from(quote)))
}

pub async fn create_quote(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateQuoteRequest>,
) -> Result<(StatusCode, Json<QuoteResponse>), AppError> {
    auth.0.require(Capability::ManageSales)?;
    request.validate()?;

    let operator = auth.operator()?;
    let quote = state.quotes.create(request, &operator).await?;
    Ok((StatusCode::CREATED, Json(QuoteResponse::from(quote))))
}

/// Statuses are freely settable; only conversion is transition-guarded.
pub async fn set_quote_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetQuoteStatusRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    auth.0.require(Capability::ManageSales)?;

    let quote = state.quotes.set_status(id, request.statut).await?;
    Ok(Json(QuoteResponse::from(quote)))
}

pub async fn convert_quote(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    auth.0.require(Capability::ManageSales)?;

    let operator = auth.operator()?;
    let invoice = state.quotes.convert_to_invoice(id, &operator).await?;
    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(invoice))))
}
