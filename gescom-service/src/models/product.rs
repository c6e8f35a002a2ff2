use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock tracking block, present only on products that manage stock.
/// Invariant: 0 <= current <= maximum for every committed write.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StockInfo {
    pub current: i64,
    pub minimum: i64,
    pub maximum: i64,
}

impl StockInfo {
    pub fn is_low(&self) -> bool {
        self.current < self.minimum
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Catalog price, authored in USD.
    pub unit_price_usd: f64,
    /// FC price derived from the exchange rate effective at the last write.
    pub unit_price_fc: f64,
    /// Tax percentage applied on invoice lines, e.g. 16.0 for 16%.
    pub tax_rate: f64,
    pub stock: Option<StockInfo>,
    pub active: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn manages_stock(&self) -> bool {
        self.stock.is_some()
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock.as_ref().map(StockInfo::is_low).unwrap_or(false)
    }
}
