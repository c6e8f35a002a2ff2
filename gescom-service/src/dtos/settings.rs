use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CompanySettings, Currency, ExchangeRate};

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRateRequest {
    #[validate(range(min = 0.000001, message = "Le taux doit etre strictement positif"))]
    pub taux: f64,

    /// Version read from `GET /taux-change`; the update is rejected with
    /// 409 when it no longer matches.
    pub version: i64,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub taux: f64,
    pub version: i64,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl From<ExchangeRate> for RateResponse {
    fn from(rate: ExchangeRate) -> Self {
        Self {
            taux: rate.rate,
            version: rate.version,
            updated_by: rate.updated_by,
            updated_at: rate.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConversionQuery {
    pub montant: f64,
    pub de: Currency,
    pub vers: Currency,
}

#[derive(Debug, Serialize)]
pub struct ConversionResponse {
    pub montant: f64,
    pub de: Currency,
    pub vers: Currency,
    pub resultat: f64,
    pub taux: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(length(min = 1, max = 200, message = "Le nom est obligatoire"))]
    pub name: Option<String>,

    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,

    #[validate(email(message = "Email invalide"))]
    pub email: Option<String>,

    pub rccm: Option<String>,

    #[validate(url(message = "URL de logo invalide"))]
    pub logo_url: Option<String>,

    pub invoice_footer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub rccm: Option<String>,
    pub logo_url: Option<String>,
    pub invoice_footer: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<CompanySettings> for SettingsResponse {
    fn from(settings: CompanySettings) -> Self {
        Self {
            name: settings.name,
            address: settings.address,
            city: settings.city,
            phone: settings.phone,
            email: settings.email,
            rccm: settings.rccm,
            logo_url: settings.logo_url,
            invoice_footer: settings.invoice_footer,
            updated_at: settings.updated_at,
        }
    }
}
