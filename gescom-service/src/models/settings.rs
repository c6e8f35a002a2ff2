use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// FC per USD when no rate has ever been configured.
pub const DEFAULT_EXCHANGE_RATE: f64 = 2800.0;

pub const EXCHANGE_RATE_DOC_ID: &str = "taux_change";
pub const COMPANY_SETTINGS_DOC_ID: &str = "entreprise";

/// Singleton configuration document. `version` increments on every update
/// and writes are compare-and-swapped on it, so two concurrent updates
/// cannot silently overwrite each other.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExchangeRate {
    #[serde(rename = "_id")]
    pub id: String,
    /// FC per USD.
    pub rate: f64,
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Uuid>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn bootstrap() -> Self {
        Self {
            id: EXCHANGE_RATE_DOC_ID.to_string(),
            rate: DEFAULT_EXCHANGE_RATE,
            version: 1,
            updated_by: None,
            updated_at: Utc::now(),
        }
    }
}

/// Append-only audit record for exchange-rate updates.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateChange {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub old_rate: f64,
    pub new_rate: f64,
    /// Version the rate document carries after this change.
    pub version: i64,
    pub changed_by: Uuid,
    pub changed_by_name: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Singleton company profile used on printed documents.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CompanySettings {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub rccm: Option<String>,
    pub logo_url: Option<String>,
    pub invoice_footer: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl CompanySettings {
    pub fn bootstrap() -> Self {
        Self {
            id: COMPANY_SETTINGS_DOC_ID.to_string(),
            name: "Mon Entreprise".to_string(),
            address: None,
            city: None,
            phone: None,
            email: None,
            rccm: None,
            logo_url: None,
            invoice_footer: None,
            updated_at: Utc::now(),
        }
    }
}
