use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{MovementKind, Product, StockMovement};
use crate::services::database::GescomDb;
use crate::services::error::DomainError;
use crate::services::Operator;

/// Outcome of a committed adjustment.
#[derive(Debug)]
pub struct StockAdjustment {
    pub movement: StockMovement,
    pub new_level: i64,
    /// Set when the level has fallen below the configured minimum.
    pub warning: Option<String>,
}

/// All product stock goes through here. The counter is only ever moved by
/// a conditional `$inc`, so two concurrent requests cannot overdraw or
/// overfill no matter how they interleave.
#[derive(Clone)]
pub struct StockService {
    db: GescomDb,
}

impl StockService {
    pub fn new(db: GescomDb) -> Self {
        Self { db }
    }

    pub async fn adjust(
        &self,
        product_id: Uuid,
        delta: i64,
        kind: MovementKind,
        reason: &str,
        operator: &Operator,
    ) -> Result<StockAdjustment, AppError> {
        if reason.trim().is_empty() {
            return Err(
                DomainError::Validation("Un motif est obligatoire pour tout mouvement".into())
                    .into(),
            );
        }
        if delta == 0 {
            return Err(
                DomainError::Validation("Le delta d'un mouvement ne peut pas etre nul".into())
                    .into(),
            );
        }

        let product = self.load_stock_managed(product_id).await?;
        let maximum = product
            .stock
            .as_ref()
            .map(|s| s.maximum)
            .unwrap_or_default();

        // The guard rides inside the filter: a debit requires enough stock,
        // a credit requires headroom below the ceiling. A miss means the
        // condition did not hold at write time.
        let filter = if delta < 0 {
            doc! {
                "_id": product_id.to_string(),
                "stock.current": { "$gte": -delta },
            }
        } else {
            doc! {
                "_id": product_id.to_string(),
                "stock.current": { "$lte": maximum - delta },
            }
        };
        let update = doc! {
            "$inc": { "stock.current": delta },
            "$set": { "updated_at": mongodb::bson::DateTime::now() },
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .db
            .products()
            .find_one_and_update(filter, update, options)
            .await?;

        let updated = match updated {
            Some(product) => product,
            None => return Err(self.classify_miss(product_id, delta).await),
        };

        let info = updated.stock.as_ref().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Stock block missing after guarded update"))
        })?;

        let movement = StockMovement {
            id: Uuid::new_v4(),
            product_id,
            product_name: updated.name.clone(),
            delta,
            stock_before: info.current - delta,
            stock_after: info.current,
            kind,
            operator_id: operator.id,
            operator_name: operator.name.clone(),
            reason: reason.trim().to_string(),
            created_at: Utc::now(),
        };
        self.db.stock_movements().insert_one(&movement, None).await?;

        metrics::counter!("stock_movements_total", "kind" => kind.as_str()).increment(1);

        let warning = info.is_low().then(|| {
            format!(
                "Stock bas pour {}: {} restant(s), minimum {}",
                updated.name, info.current, info.minimum
            )
        });
        if let Some(message) = &warning {
            tracing::warn!(product_id = %product_id, level = info.current, "{}", message);
        }

        Ok(StockAdjustment {
            new_level: info.current,
            warning,
            movement,
        })
    }

    /// Movements for one product, newest first.
    pub async fn history(&self, product_id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        self.load_stock_managed(product_id).await?;

        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self
            .db
            .stock_movements()
            .find(doc! { "product_id": product_id.to_string() }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Unconditional credit used by compensation and cancellation paths.
    /// Those flows give back exactly what an earlier debit took, and must
    /// not fail on the ceiling even if it moved in between.
    pub async fn credit_unchecked(
        &self,
        product_id: Uuid,
        quantity: i64,
        kind: MovementKind,
        reason: &str,
        operator: &Operator,
    ) -> Result<(), AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .db
            .products()
            .find_one_and_update(
                doc! { "_id": product_id.to_string(), "stock": { "$ne": null } },
                doc! {
                    "$inc": { "stock.current": quantity },
                    "$set": { "updated_at": mongodb::bson::DateTime::now() },
                },
                options,
            )
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Produit {product_id} introuvable pour restitution"))
            })?;

        let info = updated.stock.as_ref().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Stock block missing after credit"))
        })?;

        let movement = StockMovement {
            id: Uuid::new_v4(),
            product_id,
            product_name: updated.name.clone(),
            delta: quantity,
            stock_before: info.current - quantity,
            stock_after: info.current,
            kind,
            operator_id: operator.id,
            operator_name: operator.name.clone(),
            reason: reason.to_string(),
            created_at: Utc::now(),
        };
        self.db.stock_movements().insert_one(&movement, None).await?;

        metrics::counter!("stock_movements_total", "kind" => kind.as_str()).increment(1);
        Ok(())
    }

    async fn load_stock_managed(&self, product_id: Uuid) -> Result<Product, AppError> {
        let product = self
            .db
            .products()
            .find_one(doc! { "_id": product_id.to_string() }, None)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Produit {product_id} introuvable")))?;

        if !product.manages_stock() {
            return Err(DomainError::NotApplicable(format!(
                "Le produit {} ne gere pas de stock",
                product.name
            ))
            .into());
        }
        Ok(product)
    }

    async fn classify_miss(&self, product_id: Uuid, delta: i64) -> AppError {
        match self
            .db
            .products()
            .find_one(doc! { "_id": product_id.to_string() }, None)
            .await
        {
            Ok(Some(product)) => match product.stock.as_ref() {
                Some(info) if delta < 0 => DomainError::InsufficientStock {
                    available: info.current,
                    requested: -delta,
                }
                .into(),
                Some(info) => DomainError::StockCeilingExceeded {
                    maximum: info.maximum,
                    current: info.current,
                    requested: delta,
                }
                .into(),
                None => DomainError::NotApplicable(format!(
                    "Le produit {} ne gere pas de stock",
                    product.name
                ))
                .into(),
            },
            Ok(None) => DomainError::NotFound(format!("Produit {product_id} introuvable")).into(),
            Err(e) => e.into(),
        }
    }
}
