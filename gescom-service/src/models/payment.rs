use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "especes")]
    Cash,
    #[serde(rename = "mobile_money")]
    MobileMoney,
    #[serde(rename = "carte")]
    Card,
    #[serde(rename = "virement")]
    BankTransfer,
    #[serde(rename = "cheque")]
    Cheque,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "especes",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Card => "carte",
            PaymentMethod::BankTransfer => "virement",
            PaymentMethod::Cheque => "cheque",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "en_attente")]
    Pending,
    #[serde(rename = "complete")]
    Completed,
    #[serde(rename = "echoue")]
    Failed,
    #[serde(rename = "annule")]
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "en_attente",
            PaymentStatus::Completed => "complete",
            PaymentStatus::Failed => "echoue",
            PaymentStatus::Cancelled => "annule",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// Payment attempt against an invoice. Amounts are copied from the invoice
/// totals at creation and kept in both currencies.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub amount_usd: f64,
    pub amount_fc: f64,
    pub currency: Currency,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Provider-side transaction reference, set on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Hosted checkout session/order id when the provider is involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_session_id: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::opt_chrono_datetime_as_bson_datetime"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}
