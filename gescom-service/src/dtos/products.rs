use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{MovementKind, Product, StockInfo, StockMovement};
use crate::services::stock::StockAdjustment;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Le nom est obligatoire"))]
    pub name: String,

    pub description: Option<String>,
    pub category: Option<String>,

    #[validate(range(min = 0.0, message = "Le prix doit etre positif"))]
    pub unit_price_usd: f64,

    #[validate(range(min = 0.0, max = 100.0, message = "Le taux de TVA doit etre entre 0 et 100"))]
    pub tax_rate: f64,

    /// Enables the stock ledger for this product.
    #[serde(default)]
    pub manage_stock: bool,

    #[validate(range(min = 0, message = "Le stock initial doit etre positif"))]
    pub initial_stock: Option<i64>,

    #[validate(range(min = 0, message = "Le stock minimum doit etre positif"))]
    pub minimum_stock: Option<i64>,

    #[validate(range(min = 1, message = "Le stock maximum doit etre d'au moins 1"))]
    pub maximum_stock: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Le nom est obligatoire"))]
    pub name: Option<String>,

    pub description: Option<String>,
    pub category: Option<String>,

    #[validate(range(min = 0.0, message = "Le prix doit etre positif"))]
    pub unit_price_usd: Option<f64>,

    #[validate(range(min = 0.0, max = 100.0, message = "Le taux de TVA doit etre entre 0 et 100"))]
    pub tax_rate: Option<f64>,

    /// Thresholds only. The current level moves exclusively through the
    /// stock endpoint so every change leaves a movement behind.
    #[validate(range(min = 0, message = "Le stock minimum doit etre positif"))]
    pub minimum_stock: Option<i64>,

    #[validate(range(min = 1, message = "Le stock maximum doit etre d'au moins 1"))]
    pub maximum_stock: Option<i64>,

    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdjustStockRequest {
    /// Signed quantity; positive receives stock, negative issues it.
    pub delta: i64,

    /// Defaults to `entree`/`sortie` from the sign of `delta`;
    /// `correction` must be explicit.
    pub kind: Option<MovementKind>,

    #[validate(length(min = 1, max = 500, message = "Le motif est obligatoire"))]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub actif: Option<bool>,
    /// Case-insensitive name search.
    pub q: Option<String>,
    /// Restrict to products below their minimum stock.
    pub stock_bas: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit_price_usd: f64,
    pub unit_price_fc: f64,
    pub tax_rate: f64,
    pub stock: Option<StockInfo>,
    pub low_stock: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        let low_stock = product.is_low_stock();
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            category: product.category,
            unit_price_usd: product.unit_price_usd,
            unit_price_fc: product.unit_price_fc,
            tax_rate: product.tax_rate,
            stock: product.stock,
            low_stock,
            active: product.active,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StockMovementResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub delta: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub kind: MovementKind,
    pub operator_id: Uuid,
    pub operator_name: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl From<StockMovement> for StockMovementResponse {
    fn from(movement: StockMovement) -> Self {
        Self {
            id: movement.id,
            product_id: movement.product_id,
            product_name: movement.product_name,
            delta: movement.delta,
            stock_before: movement.stock_before,
            stock_after: movement.stock_after,
            kind: movement.kind,
            operator_id: movement.operator_id,
            operator_name: movement.operator_name,
            reason: movement.reason,
            created_at: movement.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StockAdjustmentResponse {
    pub product_id: Uuid,
    pub new_level: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub movement: StockMovementResponse,
}

impl From<StockAdjustment> for StockAdjustmentResponse {
    fn from(adjustment: StockAdjustment) -> Self {
        Self {
            product_id: adjustment.movement.product_id,
            new_level: adjustment.new_level,
            warning: adjustment.warning,
            movement: adjustment.movement.into(),
        }
    }
}
