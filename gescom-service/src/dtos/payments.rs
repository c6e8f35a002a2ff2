use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Currency, Payment, PaymentMethod, PaymentStatus};

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub invoice_id: Uuid,
    pub method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct SimulatePaymentRequest {
    pub payment_id: Uuid,
}

#[derive(Debug, Deserialize, Default)]
pub struct PaymentListQuery {
    pub statut: Option<PaymentStatus>,
    pub invoice_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub amount_usd: f64,
    pub amount_fc: f64,
    pub currency: Currency,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub provider_session_id: Option<String>,
    /// Hosted checkout URL, present only when a session was opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            invoice_id: payment.invoice_id,
            invoice_number: payment.invoice_number,
            amount_usd: payment.amount_usd,
            amount_fc: payment.amount_fc,
            currency: payment.currency,
            method: payment.method,
            status: payment.status,
            transaction_id: payment.transaction_id,
            provider_session_id: payment.provider_session_id,
            redirect_url: None,
            completed_at: payment.completed_at,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}
