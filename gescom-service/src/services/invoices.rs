use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{CreateInvoiceRequest, InvoiceListQuery};
use crate::models::{Invoice, InvoiceStatus, MovementKind, Product};
use crate::services::database::GescomDb;
use crate::services::error::DomainError;
use crate::services::rates::RateService;
use crate::services::stock::StockService;
use crate::services::{pricing, Operator};

/// Invoice lifecycle. Stock debits and the insert form a compensating
/// saga: any failure credits back what was already taken, in reverse
/// order, so creation is all-or-nothing from the caller's point of view.
#[derive(Clone)]
pub struct InvoiceService {
    db: GescomDb,
    stock: StockService,
    rates: RateService,
}

impl InvoiceService {
    pub fn new(db: GescomDb, stock: StockService, rates: RateService) -> Self {
        Self { db, stock, rates }
    }

    pub async fn create(
        &self,
        req: CreateInvoiceRequest,
        operator: &Operator,
    ) -> Result<Invoice, AppError> {
        let client = self
            .db
            .clients()
            .find_one(doc! { "_id": req.client_id.to_string() }, None)
            .await?
            .ok_or_else(|| DomainError::NotFound("Client introuvable".to_string()))?;
        if !client.active {
            return Err(DomainError::Validation(format!(
                "Le client {} est desactive",
                client.name
            ))
            .into());
        }

        let rate = self.rates.current().await?.rate;

        let mut lines = Vec::with_capacity(req.lines.len());
        for input in &req.lines {
            let product = self.load_product(input.product_id).await?;
            if !product.active {
                return Err(DomainError::Validation(format!(
                    "Le produit {} est desactive",
                    product.name
                ))
                .into());
            }

            let unit_price = input.unit_price_usd.unwrap_or(product.unit_price_usd);
            let line = pricing::price_line(&product, input.quantity, unit_price, rate);
            pricing::check_claimed("total_ht_usd", input.total_ht_usd, line.total_ht_usd)?;
            pricing::check_claimed("total_ttc_usd", input.total_ttc_usd, line.total_ttc_usd)?;
            lines.push(line);
        }

        let totals = pricing::sum_lines(&lines);
        pricing::check_claimed("total_ht_usd", req.total_ht_usd, totals.total_ht_usd)?;
        pricing::check_claimed("total_ttc_usd", req.total_ttc_usd, totals.total_ttc_usd)?;

        let number = self.db.next_reference("FAC").await?;
        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            number,
            client_id: client.id,
            client_name: client.name,
            currency: req.currency.unwrap_or_default(),
            lines,
            totals,
            exchange_rate: rate,
            status: InvoiceStatus::Draft,
            due_date: req.due_date,
            sent_at: None,
            paid_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            payment_id: None,
            created_by: operator.id,
            created_at: now,
            updated_at: now,
        };

        self.insert_with_stock(invoice, operator).await
    }

    /// Debits stock for every stock-managed line, then inserts. Used by
    /// direct creation and by quote conversion, which must not reprice.
    pub async fn insert_with_stock(
        &self,
        invoice: Invoice,
        operator: &Operator,
    ) -> Result<Invoice, AppError> {
        let reason = format!("Facture {}", invoice.number);

        let mut debits: Vec<(Uuid, i64)> = Vec::new();
        for line in &invoice.lines {
            let product = self.load_product(line.product_id).await?;
            if product.manages_stock() {
                // Fractional quantities reserve whole units.
                debits.push((line.product_id, line.quantity.ceil() as i64));
            }
        }

        let mut applied: Vec<(Uuid, i64)> = Vec::new();
        for (product_id, quantity) in &debits {
            match self
                .stock
                .adjust(
                    *product_id,
                    -quantity,
                    MovementKind::Exit,
                    &reason,
                    operator,
                )
                .await
            {
                Ok(_) => applied.push((*product_id, *quantity)),
                Err(err) => {
                    self.compensate(&applied, &invoice.number, operator).await;
                    return Err(err);
                }
            }
        }

        if let Err(err) = self.db.invoices().insert_one(&invoice, None).await {
            self.compensate(&applied, &invoice.number, operator).await;
            return Err(err.into());
        }

        metrics::counter!("invoices_created_total").increment(1);
        tracing::info!(number = %invoice.number, total_usd = invoice.totals.total_ttc_usd, "Invoice created");
        Ok(invoice)
    }

    /// Reverse-order rollback of already-applied debits. Failures are
    /// logged and skipped; the remaining credits still run.
    async fn compensate(&self, applied: &[(Uuid, i64)], number: &str, operator: &Operator) {
        for (product_id, quantity) in applied.iter().rev() {
            let reason = format!("Compensation creation facture {number}");
            if let Err(err) = self
                .stock
                .credit_unchecked(
                    *product_id,
                    *quantity,
                    MovementKind::Correction,
                    &reason,
                    operator,
                )
                .await
            {
                tracing::error!(
                    product_id = %product_id,
                    quantity,
                    "Stock compensation failed: {}", err
                );
            }
        }
    }

    pub async fn list(&self, query: &InvoiceListQuery) -> Result<Vec<Invoice>, AppError> {
        let mut filter = Document::new();
        if let Some(status) = query.statut {
            filter.insert("status", status.as_str());
        }
        if let Some(client_id) = query.client_id {
            filter.insert("client_id", client_id.to_string());
        }
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self.db.invoices().find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Invoice, AppError> {
        self.db
            .invoices()
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?
            .ok_or_else(|| DomainError::NotFound("Facture introuvable".to_string()).into())
    }

    pub async fn send(&self, id: Uuid) -> Result<Invoice, AppError> {
        let now = mongodb::bson::DateTime::now();
        let update = doc! { "$set": {
            "status": InvoiceStatus::Sent.as_str(),
            "sent_at": now,
            "updated_at": now,
        } };
        self.transition(id, doc! { "status": InvoiceStatus::Draft.as_str() }, update, "envoyer")
            .await
    }

    pub async fn mark_paid(
        &self,
        id: Uuid,
        payment_id: Option<Uuid>,
    ) -> Result<Invoice, AppError> {
        let now = mongodb::bson::DateTime::now();
        let mut set = doc! {
            "status": InvoiceStatus::Paid.as_str(),
            "paid_at": now,
            "updated_at": now,
        };
        if let Some(payment_id) = payment_id {
            set.insert("payment_id", payment_id.to_string());
        }
        let invoice = self
            .transition(
                id,
                doc! { "status": { "$in": [
                    InvoiceStatus::Draft.as_str(),
                    InvoiceStatus::Sent.as_str(),
                ] } },
                doc! { "$set": set },
                "encaisser",
            )
            .await?;

        metrics::counter!("invoices_paid_total").increment(1);
        Ok(invoice)
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        reason: &str,
        operator: &Operator,
    ) -> Result<Invoice, AppError> {
        if reason.trim().is_empty() {
            return Err(DomainError::Validation("Le motif d'annulation est obligatoire".into()).into());
        }

        let now = mongodb::bson::DateTime::now();
        let update = doc! { "$set": {
            "status": InvoiceStatus::Cancelled.as_str(),
            "cancelled_at": now,
            "cancellation_reason": reason.trim(),
            "updated_at": now,
        } };
        let invoice = self
            .transition(
                id,
                doc! { "status": { "$in": [
                    InvoiceStatus::Draft.as_str(),
                    InvoiceStatus::Sent.as_str(),
                ] } },
                update,
                "annuler",
            )
            .await?;

        // Only the request that won the status swap reaches this point,
        // so the restore runs exactly once.
        let restore_reason = format!("Annulation facture {}: {}", invoice.number, reason.trim());
        self.restore_lines(&invoice, &restore_reason, operator).await;

        metrics::counter!("invoices_cancelled_total").increment(1);
        Ok(invoice)
    }

    pub async fn delete(&self, id: Uuid, reason: &str, operator: &Operator) -> Result<(), AppError> {
        if reason.trim().is_empty() {
            return Err(DomainError::Validation("Le motif de suppression est obligatoire".into()).into());
        }

        let invoice = self.get(id).await?;
        if !invoice.status.is_deletable() {
            return Err(DomainError::InvalidTransition {
                from: invoice.status.as_str().to_string(),
                action: "supprimer".to_string(),
            }
            .into());
        }

        // Claim the document first; whoever wins the delete owns the
        // restore, so a concurrent delete cannot double-credit.
        let deleted = self
            .db
            .invoices()
            .delete_one(
                doc! { "_id": id.to_string(), "status": invoice.status.as_str() },
                None,
            )
            .await?;
        if deleted.deleted_count == 0 {
            return Err(DomainError::NotFound("Facture introuvable".to_string()).into());
        }

        // A cancelled invoice already gave its stock back at cancellation.
        if invoice.status == InvoiceStatus::Draft {
            let restore_reason =
                format!("Suppression facture {}: {}", invoice.number, reason.trim());
            self.restore_lines(&invoice, &restore_reason, operator).await;
        }

        tracing::info!(number = %invoice.number, "Invoice deleted");
        Ok(())
    }

    async fn restore_lines(&self, invoice: &Invoice, reason: &str, operator: &Operator) {
        for line in &invoice.lines {
            let quantity = line.quantity.ceil() as i64;
            if quantity <= 0 {
                continue;
            }
            match self.load_product(line.product_id).await {
                Ok(product) if product.manages_stock() => {
                    if let Err(err) = self
                        .stock
                        .credit_unchecked(
                            line.product_id,
                            quantity,
                            MovementKind::Entry,
                            reason,
                            operator,
                        )
                        .await
                    {
                        tracing::error!(
                            product_id = %line.product_id,
                            quantity,
                            "Stock restore failed: {}", err
                        );
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        product_id = %line.product_id,
                        "Skipping restore, product lookup failed: {}", err
                    );
                }
            }
        }
    }

    /// Guarded status swap. The expected status rides in the filter so two
    /// concurrent transitions cannot both win; on a miss the invoice is
    /// re-read to answer with the precise error.
    async fn transition(
        &self,
        id: Uuid,
        status_guard: Document,
        update: Document,
        action: &str,
    ) -> Result<Invoice, AppError> {
        let mut filter = doc! { "_id": id.to_string() };
        filter.extend(status_guard);

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .db
            .invoices()
            .find_one_and_update(filter, update, options)
            .await?;

        match updated {
            Some(invoice) => Ok(invoice),
            None => {
                let current = self.get(id).await?;
                Err(DomainError::InvalidTransition {
                    from: current.status.as_str().to_string(),
                    action: action.to_string(),
                }
                .into())
            }
        }
    }

    async fn load_product(&self, product_id: Uuid) -> Result<Product, AppError> {
        self.db
            .products()
            .find_one(doc! { "_id": product_id.to_string() }, None)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Produit {product_id} introuvable")).into()
            })
    }
}
