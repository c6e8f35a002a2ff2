use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Currency, Invoice, InvoiceLine, InvoiceStatus, Totals};

/// A line as submitted by the caller. Prices and totals are optional:
/// the server prices every line itself and only checks that whatever the
/// caller claimed agrees with the recomputation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvoiceLineInput {
    pub product_id: Uuid,

    #[validate(range(min = 0.000001, message = "La quantite doit etre positive"))]
    pub quantity: f64,

    /// Negotiated unit price; defaults to the catalog price.
    #[validate(range(min = 0.0, message = "Le prix unitaire doit etre positif"))]
    pub unit_price_usd: Option<f64>,

    pub total_ht_usd: Option<f64>,
    pub total_ttc_usd: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub client_id: Uuid,

    pub currency: Option<Currency>,

    pub due_date: Option<DateTime<Utc>>,

    #[validate(length(min = 1, message = "Au moins une ligne est requise"), nested)]
    pub lines: Vec<InvoiceLineInput>,

    pub total_ht_usd: Option<f64>,
    pub total_ttc_usd: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MarkPaidRequest {
    pub payment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelInvoiceRequest {
    #[validate(length(min = 1, max = 500, message = "Le motif est obligatoire"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteInvoiceRequest {
    #[validate(length(min = 1, max = 500, message = "Le motif est obligatoire"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct InvoiceListQuery {
    pub statut: Option<InvoiceStatus>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub number: String,
    pub client_id: Uuid,
    pub client_name: String,
    pub currency: Currency,
    pub lines: Vec<InvoiceLine>,
    pub totals: Totals,
    pub exchange_rate: f64,
    pub status: InvoiceStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub payment_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            number: invoice.number,
            client_id: invoice.client_id,
            client_name: invoice.client_name,
            currency: invoice.currency,
            lines: invoice.lines,
            totals: invoice.totals,
            exchange_rate: invoice.exchange_rate,
            status: invoice.status,
            due_date: invoice.due_date,
            sent_at: invoice.sent_at,
            paid_at: invoice.paid_at,
            cancelled_at: invoice.cancelled_at,
            cancellation_reason: invoice.cancellation_reason,
            payment_id: invoice.payment_id,
            created_by: invoice.created_by,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}
