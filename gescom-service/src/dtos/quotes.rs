use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::dtos::invoices::InvoiceLineInput;
use crate::models::{Currency, InvoiceLine, Quote, QuoteStatus, Totals};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuoteRequest {
    pub client_id: Uuid,

    pub currency: Option<Currency>,

    /// Defaults to 30 days.
    #[validate(range(min = 1, max = 365, message = "La validite doit etre entre 1 et 365 jours"))]
    pub validity_days: Option<i64>,

    #[validate(length(min = 1, message = "Au moins une ligne est requise"), nested)]
    pub lines: Vec<InvoiceLineInput>,

    pub total_ht_usd: Option<f64>,
    pub total_ttc_usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SetQuoteStatusRequest {
    pub statut: QuoteStatus,
}

#[derive(Debug, Deserialize, Default)]
pub struct QuoteListQuery {
    pub statut: Option<QuoteStatus>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub id: Uuid,
    pub number: String,
    pub client_id: Uuid,
    pub client_name: String,
    pub currency: Currency,
    pub lines: Vec<InvoiceLine>,
    pub totals: Totals,
    pub exchange_rate: f64,
    pub status: QuoteStatus,
    pub validity_days: i64,
    pub expires_at: DateTime<Utc>,
    /// Computed against the clock at response time; the stored status is
    /// not rewritten by reads.
    pub expired: bool,
    pub invoice_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Quote> for QuoteResponse {
    fn from(quote: Quote) -> Self {
        let expired = quote.is_expired(Utc::now());
        Self {
            id: quote.id,
            number: quote.number,
            client_id: quote.client_id,
            client_name: quote.client_name,
            currency: quote.currency,
            lines: quote.lines,
            totals: quote.totals,
            exchange_rate: quote.exchange_rate,
            status: quote.status,
            validity_days: quote.validity_days,
            expires_at: quote.expires_at,
            expired,
            invoice_id: quote.invoice_id,
            created_by: quote.created_by,
            created_at: quote.created_at,
            updated_at: quote.updated_at,
        }
    }
}
