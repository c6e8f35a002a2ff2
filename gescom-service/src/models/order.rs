use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "en_attente")]
    Pending,
    #[serde(rename = "confirmee")]
    Confirmed,
    #[serde(rename = "livree")]
    Delivered,
    #[serde(rename = "annulee")]
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "en_attente",
            OrderStatus::Confirmed => "confirmee",
            OrderStatus::Delivered => "livree",
            OrderStatus::Cancelled => "annulee",
        }
    }

    /// Orders move forward only; delivered and cancelled are terminal.
    pub fn can_become(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Delivered) | (Confirmed, Cancelled)
        )
    }
}

/// Order lines stay pre-tax; taxation happens on the invoice raised from
/// the order, not here.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price_usd: f64,
    pub total_usd: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Human reference, format CMD-YYYYMMDD-XXXX.
    pub number: String,
    pub client_id: Uuid,
    pub client_name: String,
    pub lines: Vec<OrderLine>,
    pub total_usd: f64,
    pub total_fc: f64,
    pub status: OrderStatus,
    pub created_by: Uuid,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_only_move_forward() {
        use OrderStatus::*;
        assert!(Pending.can_become(Confirmed));
        assert!(Pending.can_become(Cancelled));
        assert!(Confirmed.can_become(Delivered));
        assert!(Confirmed.can_become(Cancelled));
        assert!(!Confirmed.can_become(Pending));
        assert!(!Delivered.can_become(Cancelled));
        assert!(!Cancelled.can_become(Pending));
        assert!(!Pending.can_become(Delivered));
    }
}
