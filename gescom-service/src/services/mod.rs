pub mod auth;
pub mod checkout;
pub mod database;
pub mod error;
pub mod invoices;
pub mod jwt;
pub mod metrics;
pub mod payments;
pub mod pricing;
pub mod quotes;
pub mod rates;
pub mod stats;
pub mod stock;

pub use auth::AuthService;
pub use checkout::CheckoutClient;
pub use database::GescomDb;
pub use error::DomainError;
pub use invoices::InvoiceService;
pub use jwt::JwtService;
pub use metrics::{init_metrics, render_metrics};
pub use payments::PaymentService;
pub use quotes::QuoteService;
pub use rates::RateService;
pub use stats::StatsService;
pub use stock::StockService;

use uuid::Uuid;

/// Identity stamped on audit records (stock movements, rate changes,
/// references to who created what). Built from the authenticated
/// claims by the handlers.
#[derive(Debug, Clone)]
pub struct Operator {
    pub id: Uuid,
    pub name: String,
}
