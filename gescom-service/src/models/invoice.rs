use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    #[serde(rename = "brouillon")]
    Draft,
    #[serde(rename = "envoyee")]
    Sent,
    #[serde(rename = "payee")]
    Paid,
    #[serde(rename = "annulee")]
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "brouillon",
            InvoiceStatus::Sent => "envoyee",
            InvoiceStatus::Paid => "payee",
            InvoiceStatus::Cancelled => "annulee",
        }
    }

    /// Lifecycle matrix. `Paid` and `Cancelled` are terminal.
    pub fn can_become(self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Draft, Sent) | (Draft, Paid) | (Sent, Paid) | (Draft, Cancelled) | (Sent, Cancelled)
        )
    }

    /// Deletion is only allowed before sending or after cancellation.
    pub fn is_deletable(self) -> bool {
        matches!(self, InvoiceStatus::Draft | InvoiceStatus::Cancelled)
    }
}

/// Priced line. Every monetary field is stored in both currencies; values
/// are computed server-side and frozen once the invoice exists.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InvoiceLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price_usd: f64,
    pub unit_price_fc: f64,
    pub tax_rate: f64,
    pub total_ht_usd: f64,
    pub total_ht_fc: f64,
    pub tax_usd: f64,
    pub tax_fc: f64,
    pub total_ttc_usd: f64,
    pub total_ttc_fc: f64,
}

/// Aggregate amounts, always the sum of the line values.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Totals {
    pub total_ht_usd: f64,
    pub total_ht_fc: f64,
    pub tax_usd: f64,
    pub tax_fc: f64,
    pub total_ttc_usd: f64,
    pub total_ttc_fc: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Human reference, format FAC-YYYYMMDD-XXXX.
    pub number: String,
    pub client_id: Uuid,
    pub client_name: String,
    pub currency: Currency,
    pub lines: Vec<InvoiceLine>,
    pub totals: Totals,
    /// FC per USD rate captured at creation; never re-read afterwards.
    pub exchange_rate: f64,
    pub status: InvoiceStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::opt_chrono_datetime_as_bson_datetime"
    )]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::opt_chrono_datetime_as_bson_datetime"
    )]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::opt_chrono_datetime_as_bson_datetime"
    )]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::opt_chrono_datetime_as_bson_datetime"
    )]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<Uuid>,
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
    fn draft_can_be_sent_paid_or_cancelled() {
        use InvoiceStatus::*;
        assert!(Draft.can_become(Sent));
        assert!(Draft.can_become(Paid));
        assert!(Draft.can_become(Cancelled));
    }

    #[test]
    fn sent_can_only_be_paid_or_cancelled() {
        use InvoiceStatus::*;
        assert!(Sent.can_become(Paid));
        assert!(Sent.can_become(Cancelled));
        assert!(!Sent.can_become(Draft));
        assert!(!Sent.can_become(Sent));
    }

    #[test]
    fn paid_and_cancelled_are_terminal() {
        use InvoiceStatus::*;
        for next in [Draft, Sent, Paid, Cancelled] {
            assert!(!Paid.can_become(next));
            assert!(!Cancelled.can_become(next));
        }
    }

    #[test]
    fn only_draft_and_cancelled_are_deletable() {
        use InvoiceStatus::*;
        assert!(Draft.is_deletable());
        assert!(Cancelled.is_deletable());
        assert!(!Sent.is_deletable());
        assert!(!Paid.is_deletable());
    }

    #[test]
    fn status_uses_french_wire_names() {
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::Sent).unwrap(),
            "\"envoyee\""
        );
        let parsed: InvoiceStatus = serde_json::from_str("\"payee\"").unwrap();
        assert_eq!(parsed, InvoiceStatus::Paid);
    }
}
