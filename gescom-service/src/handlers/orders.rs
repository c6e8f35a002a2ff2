use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use crate::dtos::orders::{
    CreateOrderRequest, OrderListQuery, OrderResponse, SetOrderStatusRequest,
};
use crate::middleware::AuthUser;
use crate::models::{Capability, Order, OrderLine, OrderStatus};
use crate::services::{pricing, DomainError};
use crate::AppState;

pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    auth.0.require(Capability::ManageSales)?;

    let mut filter = doc! {};
    if let Some(status) = query.statut {
        filter.insert("status", status.as_str());
    }
    if let Some(client_id) = query.client_id {
        filter.insert("client_id", client_id.to_string());
    }

    let options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();
    let mut cursor = state
        .db
        .orders()
        .find(filter, options)
        .await
        .map_err(AppError::from)?;

    let mut orders = Vec::new();
    while let Some(order) = cursor.try_next().await.map_err(AppError::from)? {
        orders.push(OrderResponse::from(order));
    }
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    auth.0.require(Capability::ManageSales)?;

    let order = find_order(&state, id).await?;
    Ok(Json(OrderResponse::from(order)))
}

/// Orders snapshot names and prices but never touch stock; stock moves
/// when the order becomes an invoice.
pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    auth.0.require(Capability::ManageSales)?;
    request.validate()?;
    let operator = auth.operator()?;

    let client = state
        .db
        .clients()
        .find_one(
            doc! { "_id": request.client_id.to_string(), "active": true },
            None,
        )
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| DomainError::NotFound("Client introuvable ou desactive".to_string()))?;

    let rate = state.rates.current().await?;
    let mut lines = Vec::with_capacity(request.lines.len());
    let mut total_usd = 0.0;
    for input in &request.lines {
        let product = state
            .db
            .products()
            .find_one(doc! { "_id": input.product_id.to_string() }, None)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Produit {} introuvable", input.product_id))
            })?;
        if !product.active {
            return Err(DomainError::NotApplicable(format!(
                "Le produit {} est desactive",
                product.name
            ))
            .into());
        }

        let unit_price_usd = input.unit_price_usd.unwrap_or(product.unit_price_usd);
        let line_total = unit_price_usd * input.quantity;
        total_usd += line_total;
        lines.push(OrderLine {
            product_id: product.id,
            product_name: product.name,
            quantity: input.quantity,
            unit_price_usd,
            total_usd: line_total,
        });
    }

    let now = chrono::Utc::now();
    let order = Order {
        id: Uuid::new_v4(),
        number: state.db.next_reference("CMD").await?,
        client_id: client.id,
        client_name: client.name,
        lines,
        total_usd,
        total_fc: pricing::usd_to_fc(total_usd, rate.rate),
        status: OrderStatus::Pending,
        created_by: operator.id,
        created_at: now,
        updated_at: now,
    };

    state
        .db
        .orders()
        .insert_one(&order, None)
        .await
        .map_err(AppError::from)?;

    metrics::counter!("orders_created_total").increment(1);
    tracing::info!(order_id = %order.id, number = %order.number, "Order created");
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// Forward-only transitions; the current-status guard travels in the
/// update filter.
pub async fn set_order_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetOrderStatusRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    auth.0.require(Capability::ManageSales)?;

    let next = request.statut;
    let allowed_from: Vec<&str> = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ]
    .iter()
    .filter(|from| from.can_become(next))
    .map(|from| from.as_str())
    .collect();

    if allowed_from.is_empty() {
        let order = find_order(&state, id).await?;
        return Err(DomainError::InvalidTransition {
            from: order.status.as_str().to_string(),
            action: format!("passer en {}", next.as_str()),
        }
        .into());
    }

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = state
        .db
        .orders()
        .find_one_and_update(
            doc! {
                "_id": id.to_string(),
                "status": { "$in": allowed_from },
            },
            doc! { "$set": {
                "status": next.as_str(),
                "updated_at": mongodb::bson::DateTime::now(),
            } },
            options,
        )
        .await
        .map_err(AppError::from)?;

    match updated {
        Some(order) => Ok(Json(OrderResponse::from(order))),
        None => {
            let order = find_order(&state, id).await?;
            Err(DomainError::InvalidTransition {
                from: order.status.as_str().to_string(),
                action: format!("passer en {}", next.as_str()),
            }
            .into())
        }
    }
}

async fn find_order(state: &AppState, id: Uuid) -> Result<Order, AppError> {
    state
        .db
        .orders()
        .find_one(doc! { "_id": id.to_string() }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| DomainError::NotFound("Commande introuvable".to_string()).into())
}
