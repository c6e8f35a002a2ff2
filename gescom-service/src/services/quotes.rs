use chrono::{Duration, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{CreateQuoteRequest, QuoteListQuery};
use crate::models::{Invoice, InvoiceStatus, Quote, QuoteStatus};
use crate::services::database::GescomDb;
use crate::services::error::DomainError;
use crate::services::invoices::InvoiceService;
use crate::services::rates::RateService;
use crate::services::{pricing, Operator};

const DEFAULT_VALIDITY_DAYS: i64 = 30;

/// Quotes price exactly like invoices but never touch stock; only the
/// conversion to an invoice debits it.
#[derive(Clone)]
pub struct QuoteService {
    db: GescomDb,
    rates: RateService,
    invoices: InvoiceService,
}

impl QuoteService {
    pub fn new(db: GescomDb, rates: RateService, invoices: InvoiceService) -> Self {
        Self { db, rates, invoices }
    }

    pub async fn create(
        &self,
        req: CreateQuoteRequest,
        operator: &Operator,
    ) -> Result<Quote, AppError> {
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
            let product = self
                .db
                .products()
                .find_one(doc! { "_id": input.product_id.to_string() }, None)
                .await?
                .ok_or_else(|| {
                    DomainError::NotFound(format!("Produit {} introuvable", input.product_id))
                })?;
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

        let validity_days = req.validity_days.unwrap_or(DEFAULT_VALIDITY_DAYS);
        let now = Utc::now();
        let quote = Quote {
            id: Uuid::new_v4(),
            number: self.db.next_reference("DEV").await?,
            client_id: client.id,
            client_name: client.name,
            currency: req.currency.unwrap_or_default(),
            lines,
            totals,
            exchange_rate: rate,
            status: QuoteStatus::Draft,
            validity_days,
            expires_at: now + Duration::days(validity_days),
            invoice_id: None,
            created_by: operator.id,
            created_at: now,
            updated_at: now,
        };
        self.db.quotes().insert_one(&quote, None).await?;

        metrics::counter!("quotes_created_total").increment(1);
        tracing::info!(number = %quote.number, "Quote created");
        Ok(quote)
    }

    pub async fn list(&self, query: &QuoteListQuery) -> Result<Vec<Quote>, AppError> {
        let mut filter = Document::new();
        if let Some(status) = query.statut {
            filter.insert("status", status.as_str());
        }
        if let Some(client_id) = query.client_id {
            filter.insert("client_id", client_id.to_string());
        }
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        let cursor = self.db.quotes().find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Quote, AppError> {
        self.db
            .quotes()
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?
            .ok_or_else(|| DomainError::NotFound("Devis introuvable".to_string()).into())
    }

    /// Statuses carry no ordering; the caller sets whichever applies.
    pub async fn set_status(&self, id: Uuid, status: QuoteStatus) -> Result<Quote, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.db
            .quotes()
            .find_one_and_update(
                doc! { "_id": id.to_string() },
                doc! { "$set": {
                    "status": status.as_str(),
                    "updated_at": mongodb::bson::DateTime::now(),
                } },
                options,
            )
            .await?
            .ok_or_else(|| DomainError::NotFound("Devis introuvable".to_string()).into())
    }

    /// Turns an accepted quote into a draft invoice. Client snapshot,
    /// lines, totals and the captured exchange rate are copied verbatim;
    /// stock is debited through the same saga as direct invoice creation.
    pub async fn convert_to_invoice(
        &self,
        id: Uuid,
        operator: &Operator,
    ) -> Result<Invoice, AppError> {
        let quote = self.get(id).await?;
        if !quote.is_convertible() {
            let action = if quote.invoice_id.is_some() {
                "convertir a nouveau"
            } else {
                "convertir"
            };
            return Err(DomainError::InvalidTransition {
                from: quote.status.as_str().to_string(),
                action: action.to_string(),
            }
            .into());
        }

        // Claim the conversion slot first so only one request builds the
        // invoice, then roll the claim back if anything fails after it.
        let invoice_id = Uuid::new_v4();
        let claimed = self
            .db
            .quotes()
            .update_one(
                doc! {
                    "_id": id.to_string(),
                    "status": QuoteStatus::Accepted.as_str(),
                    "invoice_id": null,
                },
                doc! { "$set": {
                    "invoice_id": invoice_id.to_string(),
                    "updated_at": mongodb::bson::DateTime::now(),
                } },
                None,
            )
            .await?;
        if claimed.modified_count == 0 {
            let current = self.get(id).await?;
            return Err(DomainError::InvalidTransition {
                from: current.status.as_str().to_string(),
                action: "convertir".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let invoice = Invoice {
            id: invoice_id,
            number: self.db.next_reference("FAC").await?,
            client_id: quote.client_id,
            client_name: quote.client_name.clone(),
            currency: quote.currency,
            lines: quote.lines.clone(),
            totals: quote.totals.clone(),
            exchange_rate: quote.exchange_rate,
            status: InvoiceStatus::Draft,
            due_date: None,
            sent_at: None,
            paid_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            payment_id: None,
            created_by: operator.id,
            created_at: now,
            updated_at: now,
        };

        match self.invoices.insert_with_stock(invoice, operator).await {
            Ok(invoice) => {
                metrics::counter!("quotes_converted_total").increment(1);
                tracing::info!(quote = %quote.number, invoice = %invoice.number, "Quote converted");
                Ok(invoice)
            }
            Err(err) => {
                // Give the conversion slot back; the quote stays accepted.
                if let Err(rollback) = self
                    .db
                    .quotes()
                    .update_one(
                        doc! { "_id": id.to_string(), "invoice_id": invoice_id.to_string() },
                        doc! {
                            "$unset": { "invoice_id": "" },
                            "$set": { "updated_at": mongodb::bson::DateTime::now() },
                        },
                        None,
                    )
                    .await
                {
                    tracing::error!(quote = %quote.number, "Failed to release conversion claim: {}", rollback);
                }
                Err(err)
            }
        }
    }
}
