use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::invoice::{InvoiceLine, Totals};
use super::Currency;

/// Quote statuses carry no ordering; any status can be set directly.
/// Conversion to an invoice is the only guarded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteStatus {
    #[serde(rename = "brouillon")]
    Draft,
    #[serde(rename = "envoye")]
    Sent,
    #[serde(rename = "accepte")]
    Accepted,
    #[serde(rename = "refuse")]
    Refused,
    #[serde(rename = "expire")]
    Expired,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "brouillon",
            QuoteStatus::Sent => "envoye",
            QuoteStatus::Accepted => "accepte",
            QuoteStatus::Refused => "refuse",
            QuoteStatus::Expired => "expire",
        }
    }
}

/// Structurally an invoice with a validity window instead of a lifecycle.
/// Quotes never touch stock; only conversion does.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Quote {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Human reference, format DEV-YYYYMMDD-XXXX.
    pub number: String,
    pub client_id: Uuid,
    pub client_name: String,
    pub currency: Currency,
    pub lines: Vec<InvoiceLine>,
    pub totals: Totals,
    pub exchange_rate: f64,
    pub status: QuoteStatus,
    pub validity_days: i64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
    /// Set once the quote has been converted; a converted quote can never
    /// be converted again.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<Uuid>,
    pub created_by: Uuid,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_convertible(&self) -> bool {
        self.status == QuoteStatus::Accepted && self.invoice_id.is_none()
    }
}
