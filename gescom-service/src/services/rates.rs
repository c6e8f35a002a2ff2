use chrono::Utc;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Currency, ExchangeRate, RateChange, EXCHANGE_RATE_DOC_ID};
use crate::services::database::GescomDb;
use crate::services::error::DomainError;
use crate::services::{pricing, Operator};

/// Versioned FC/USD rate. Reads bootstrap the document on first use;
/// writes are compare-and-swapped on `version` and audited.
#[derive(Clone)]
pub struct RateService {
    db: GescomDb,
}

impl RateService {
    pub fn new(db: GescomDb) -> Self {
        Self { db }
    }

    pub async fn current(&self) -> Result<ExchangeRate, AppError> {
        if let Some(rate) = self
            .db
            .exchange_rates()
            .find_one(doc! { "_id": EXCHANGE_RATE_DOC_ID }, None)
            .await?
        {
            return Ok(rate);
        }

        let bootstrap = ExchangeRate::bootstrap();
        match self.db.exchange_rates().insert_one(&bootstrap, None).await {
            Ok(_) => {
                tracing::info!(rate = bootstrap.rate, "Bootstrapped exchange rate document");
                Ok(bootstrap)
            }
            // Lost a bootstrap race; somebody else inserted first.
            Err(_) => self
                .db
                .exchange_rates()
                .find_one(doc! { "_id": EXCHANGE_RATE_DOC_ID }, None)
                .await?
                .ok_or_else(|| {
                    AppError::DatabaseError(anyhow::anyhow!("Exchange rate document unavailable"))
                }),
        }
    }

    /// Compare-and-swap update. `expected_version` must match the stored
    /// document; a mismatch means a concurrent update won and the caller
    /// has to re-read before retrying.
    pub async fn update(
        &self,
        new_rate: f64,
        expected_version: i64,
        operator: &Operator,
    ) -> Result<ExchangeRate, AppError> {
        if !new_rate.is_finite() || new_rate <= 0.0 {
            return Err(
                DomainError::Validation("Le taux doit etre strictement positif".into()).into(),
            );
        }

        // Make sure the document exists before the CAS so a version
        // mismatch is unambiguous.
        self.current().await?;

        let now = Utc::now();
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let before = self
            .db
            .exchange_rates()
            .find_one_and_update(
                doc! { "_id": EXCHANGE_RATE_DOC_ID, "version": expected_version },
                doc! { "$set": {
                    "rate": new_rate,
                    "version": expected_version + 1,
                    "updated_by": operator.id.to_string(),
                    "updated_at": mongodb::bson::DateTime::from_chrono(now),
                } },
                options,
            )
            .await?
            .ok_or_else(|| {
                AppError::Conflict(anyhow::anyhow!(
                    "Le taux a change entre-temps (version attendue {expected_version}); relire puis reessayer"
                ))
            })?;

        let change = RateChange {
            id: Uuid::new_v4(),
            old_rate: before.rate,
            new_rate,
            version: expected_version + 1,
            changed_by: operator.id,
            changed_by_name: operator.name.clone(),
            created_at: now,
        };
        self.db.rate_changes().insert_one(&change, None).await?;

        tracing::info!(
            old_rate = before.rate,
            new_rate,
            version = change.version,
            operator = %operator.name,
            "Exchange rate updated"
        );

        Ok(ExchangeRate {
            id: EXCHANGE_RATE_DOC_ID.to_string(),
            rate: new_rate,
            version: expected_version + 1,
            updated_by: Some(operator.id),
            updated_at: now,
        })
    }

    /// Pure conversion at the currently stored rate. Returns the converted
    /// amount together with the rate used.
    pub async fn convert(
        &self,
        amount: f64,
        from: Currency,
        to: Currency,
    ) -> Result<(f64, f64), AppError> {
        let rate = self.current().await?.rate;
        let converted = match (from, to) {
            (Currency::Usd, Currency::Cdf) => pricing::usd_to_fc(amount, rate),
            (Currency::Cdf, Currency::Usd) => pricing::fc_to_usd(amount, rate),
            _ => amount,
        };
        Ok((converted, rate))
    }
}
