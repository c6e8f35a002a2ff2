//! Dashboard aggregates over invoices, quotes, payments, clients and
//! stock levels.

use std::collections::BTreeMap;

use futures::TryStreamExt;
use mongodb::bson::{doc, Document};

use service_core::error::AppError;

use crate::dtos::stats::{
    ClientStats, CountsByStatus, InvoiceStats, LowStockProduct, ProductStats, StatsResponse,
};
use crate::models::{InvoiceStatus, PaymentStatus, QuoteStatus};
use crate::services::database::GescomDb;

#[derive(Clone)]
pub struct StatsService {
    db: GescomDb,
}

impl StatsService {
    pub fn new(db: GescomDb) -> Self {
        Self { db }
    }

    pub async fn collect(&self) -> Result<StatsResponse, AppError> {
        let invoices = self.invoice_stats().await?;
        let quotes = self
            .counts_by_status(
                self.db.quotes().clone_with_type::<Document>(),
                &[
                    QuoteStatus::Draft.as_str(),
                    QuoteStatus::Sent.as_str(),
                    QuoteStatus::Accepted.as_str(),
                    QuoteStatus::Refused.as_str(),
                    QuoteStatus::Expired.as_str(),
                ],
            )
            .await?;
        let payments = self
            .counts_by_status(
                self.db.payments().clone_with_type::<Document>(),
                &[
                    PaymentStatus::Pending.as_str(),
                    PaymentStatus::Completed.as_str(),
                    PaymentStatus::Failed.as_str(),
                    PaymentStatus::Cancelled.as_str(),
                ],
            )
            .await?;
        let clients = self.client_stats().await?;
        let products = self.product_stats().await?;

        Ok(StatsResponse {
            invoices,
            quotes,
            payments,
            clients,
            products,
        })
    }

    async fn invoice_stats(&self) -> Result<InvoiceStats, AppError> {
        let counts = self
            .counts_by_status(
                self.db.invoices().clone_with_type::<Document>(),
                &[
                    InvoiceStatus::Draft.as_str(),
                    InvoiceStatus::Sent.as_str(),
                    InvoiceStatus::Paid.as_str(),
                    InvoiceStatus::Cancelled.as_str(),
                ],
            )
            .await?;

        let pipeline = vec![
            doc! { "$match": { "status": InvoiceStatus::Paid.as_str() } },
            doc! { "$group": {
                "_id": null,
                "usd": { "$sum": "$totals.total_ttc_usd" },
                "fc": { "$sum": "$totals.total_ttc_fc" },
            } },
        ];
        let mut cursor = self
            .db
            .invoices()
            .aggregate(pipeline, None)
            .await
            .map_err(AppError::from)?;

        let (mut revenue_usd, mut revenue_fc) = (0.0, 0.0);
        if let Some(group) = cursor.try_next().await.map_err(AppError::from)? {
            revenue_usd = group.get_f64("usd").unwrap_or(0.0);
            revenue_fc = group.get_f64("fc").unwrap_or(0.0);
        }

        Ok(InvoiceStats {
            total: counts.total,
            by_status: counts.by_status,
            revenue_usd,
            revenue_fc,
        })
    }

    async fn counts_by_status(
        &self,
        collection: mongodb::Collection<Document>,
        statuses: &[&str],
    ) -> Result<CountsByStatus, AppError> {
        let mut by_status = BTreeMap::new();
        let mut total = 0;
        for status in statuses {
            let count = collection
                .count_documents(doc! { "status": *status }, None)
                .await
                .map_err(AppError::from)?;
            total += count;
            by_status.insert((*status).to_string(), count);
        }
        Ok(CountsByStatus { total, by_status })
    }

    async fn client_stats(&self) -> Result<ClientStats, AppError> {
        let total = self
            .db
            .clients()
            .count_documents(None, None)
            .await
            .map_err(AppError::from)?;
        let active = self
            .db
            .clients()
            .count_documents(doc! { "active": true }, None)
            .await
            .map_err(AppError::from)?;
        Ok(ClientStats { total, active })
    }

    async fn product_stats(&self) -> Result<ProductStats, AppError> {
        let total = self
            .db
            .products()
            .count_documents(None, None)
            .await
            .map_err(AppError::from)?;

        // Stock-managed products strictly below their minimum, matching
        // the `stock_bas` filter on the product listing.
        let filter = doc! {
            "active": true,
            "stock": { "$ne": null },
            "$expr": { "$lt": ["$stock.current", "$stock.minimum"] },
        };
        let mut cursor = self
            .db
            .products()
            .find(filter, None)
            .await
            .map_err(AppError::from)?;

        let mut low_stock = Vec::new();
        while let Some(product) = cursor.try_next().await.map_err(AppError::from)? {
            if let Some(stock) = &product.stock {
                low_stock.push(LowStockProduct {
                    id: product.id,
                    name: product.name.clone(),
                    current: stock.current,
                    minimum: stock.minimum,
                });
            }
        }

        Ok(ProductStats { total, low_stock })
    }
}
