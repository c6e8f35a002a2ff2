use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Order, OrderLine, OrderStatus};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderLineInput {
    pub product_id: Uuid,

    #[validate(range(min = 0.000001, message = "La quantite doit etre positive"))]
    pub quantity: f64,

    /// Negotiated unit price; defaults to the catalog price.
    #[validate(range(min = 0.0, message = "Le prix unitaire doit etre positif"))]
    pub unit_price_usd: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub client_id: Uuid,

    #[validate(length(min = 1, message = "Au moins une ligne est requise"), nested)]
    pub lines: Vec<OrderLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct SetOrderStatusRequest {
    pub statut: OrderStatus,
}

#[derive(Debug, Deserialize, Default)]
pub struct OrderListQuery {
    pub statut: Option<OrderStatus>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub number: String,
    pub client_id: Uuid,
    pub client_name: String,
    pub lines: Vec<OrderLine>,
    pub total_usd: f64,
    pub total_fc: f64,
    pub status: OrderStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            number: order.number,
            client_id: order.client_id,
            client_name: order.client_name,
            lines: order.lines,
            total_usd: order.total_usd,
            total_fc: order.total_fc,
            status: order.status,
            created_by: order.created_by,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
