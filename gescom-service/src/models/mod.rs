pub mod client;
pub mod invoice;
pub mod opportunity;
pub mod order;
pub mod payment;
pub mod product;
pub mod quote;
pub mod settings;
pub mod stock;
pub mod tool;
pub mod user;

pub use client::Client;
pub use invoice::{Invoice, InvoiceLine, InvoiceStatus, Totals};
pub use opportunity::{Opportunity, OpportunityStage};
pub use order::{Order, OrderLine, OrderStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use product::{Product, StockInfo};
pub use quote::{Quote, QuoteStatus};
pub use settings::{
    CompanySettings, ExchangeRate, RateChange, COMPANY_SETTINGS_DOC_ID, DEFAULT_EXCHANGE_RATE,
    EXCHANGE_RATE_DOC_ID,
};
pub use stock::{MovementKind, StockMovement};
pub use tool::{AssignmentStatus, Tool, ToolAssignment, ToolMovement, ToolMovementKind};
pub use user::{Capability, Role, User};

use serde::{Deserialize, Serialize};

/// BSON serde helper for `Option<DateTime<Utc>>` fields. The driver only
/// ships the non-optional variant.
pub mod opt_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => bson::DateTime::from_chrono(*dt).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt.map(|dt| dt.to_chrono()))
    }
}

/// Billing currency. Amounts are always persisted in both currencies;
/// this records which one the client is invoiced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Cdf,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Cdf => "CDF",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Usd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_uses_iso_codes_on_the_wire() {
        assert_eq!(serde_json::to_string(&Currency::Usd).unwrap(), "\"USD\"");
        assert_eq!(serde_json::to_string(&Currency::Cdf).unwrap(), "\"CDF\"");
        let parsed: Currency = serde_json::from_str("\"CDF\"").unwrap();
        assert_eq!(parsed, Currency::Cdf);
    }
}
