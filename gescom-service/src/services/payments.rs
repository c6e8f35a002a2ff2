//! Payment lifecycle: creation against an invoice, hosted checkout
//! hand-off, simulated completion and webhook-driven completion.

use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use uuid::Uuid;

use service_core::error::AppError;

use crate::dtos::payments::{CreatePaymentRequest, PaymentListQuery};
use crate::models::{Invoice, InvoiceStatus, Payment, PaymentMethod, PaymentStatus};
use crate::services::checkout::{CheckoutClient, CheckoutEvent, EVENT_COMPLETED, EVENT_FAILED};
use crate::services::database::GescomDb;
use crate::services::error::DomainError;
use crate::services::invoices::InvoiceService;
use crate::services::Operator;

#[derive(Clone)]
pub struct PaymentService {
    db: GescomDb,
    invoices: InvoiceService,
    checkout: CheckoutClient,
}

impl PaymentService {
    pub fn new(db: GescomDb, invoices: InvoiceService, checkout: CheckoutClient) -> Self {
        Self {
            db,
            invoices,
            checkout,
        }
    }

    /// Creates a pending payment for an invoice. Card and mobile-money
    /// payments additionally open a hosted checkout session when the
    /// provider is configured; the redirect URL is returned alongside
    /// the payment and the session id is stored for webhook matching.
    pub async fn create(
        &self,
        request: CreatePaymentRequest,
        _operator: &Operator,
    ) -> Result<(Payment, Option<String>), AppError> {
        let invoice = self.load_invoice(request.invoice_id).await?;
        match invoice.status {
            InvoiceStatus::Paid => {
                return Err(DomainError::NotApplicable(format!(
                    "La facture {} est deja payee",
                    invoice.number
                ))
                .into());
            }
            InvoiceStatus::Cancelled => {
                return Err(DomainError::NotApplicable(format!(
                    "La facture {} est annulee",
                    invoice.number
                ))
                .into());
            }
            InvoiceStatus::Draft | InvoiceStatus::Sent => {}
        }

        let mut payment = Payment {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            invoice_number: invoice.number.clone(),
            amount_usd: invoice.totals.total_ttc_usd,
            amount_fc: invoice.totals.total_ttc_fc,
            currency: invoice.currency,
            method: request.method,
            status: PaymentStatus::Pending,
            transaction_id: None,
            provider_session_id: None,
            completed_at: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let redirect_url = if self.wants_hosted_session(request.method) {
            let amount = match payment.currency {
                crate::models::Currency::Usd => payment.amount_usd,
                crate::models::Currency::Cdf => payment.amount_fc,
            };
            let session = self
                .checkout
                .create_session(amount, payment.currency.as_str(), &invoice.number)
                .await
                .map_err(|e| AppError::BadGateway(format!("Fournisseur de paiement: {e}")))?;
            payment.provider_session_id = Some(session.id);
            Some(session.redirect_url)
        } else {
            None
        };

        self.db
            .payments()
            .insert_one(&payment, None)
            .await
            .map_err(AppError::from)?;

        metrics::counter!(
            "payments_created_total",
            "method" => payment.method.as_str()
        )
        .increment(1);
        tracing::info!(
            payment_id = %payment.id,
            invoice = %payment.invoice_number,
            method = payment.method.as_str(),
            "Payment created"
        );

        Ok((payment, redirect_url))
    }

    pub async fn get(&self, id: Uuid) -> Result<Payment, AppError> {
        self.db
            .payments()
            .find_one(doc! { "_id": id.to_string() }, None)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| DomainError::NotFound("Paiement introuvable".to_string()).into())
    }

    pub async fn list(&self, query: &PaymentListQuery) -> Result<Vec<Payment>, AppError> {
        let mut filter = doc! {};
        if let Some(status) = query.statut {
            filter.insert("status", status.as_str());
        }
        if let Some(invoice_id) = query.invoice_id {
            filter.insert("invoice_id", invoice_id.to_string());
        }

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let mut cursor = self
            .db
            .payments()
            .find(filter, options)
            .await
            .map_err(AppError::from)?;

        let mut payments = Vec::new();
        while let Some(payment) = cursor.try_next().await.map_err(AppError::from)? {
            payments.push(payment);
        }
        Ok(payments)
    }

    /// Manually completes a pending payment, standing in for the
    /// provider when no hosted checkout is configured.
    pub async fn simulate(&self, payment_id: Uuid) -> Result<Payment, AppError> {
        let transaction_id = format!("SIM-{}", Uuid::new_v4().simple());
        let payment = self
            .mark_completed(doc! { "_id": payment_id.to_string() }, &transaction_id)
            .await?;
        self.settle_invoice(&payment).await;
        Ok(payment)
    }

    /// Applies a verified provider webhook. Unknown sessions and
    /// event types are logged and dropped so the provider sees a 2xx
    /// and stops retrying.
    pub async fn apply_webhook(&self, event: CheckoutEvent) -> Result<(), AppError> {
        let filter = doc! {
            "provider_session_id": &event.session_id,
            "status": PaymentStatus::Pending.as_str(),
        };
        match event.event.as_str() {
            EVENT_COMPLETED => {
                let transaction_id = event
                    .transaction_id
                    .unwrap_or_else(|| event.session_id.clone());
                match self.mark_completed(filter, &transaction_id).await {
                    Ok(payment) => self.settle_invoice(&payment).await,
                    Err(e) => {
                        tracing::warn!(
                            session_id = %event.session_id,
                            error = %e,
                            "Webhook completion matched no pending payment"
                        );
                    }
                }
            }
            EVENT_FAILED => {
                let update = doc! {
                    "$set": {
                        "status": PaymentStatus::Failed.as_str(),
                        "updated_at": mongodb::bson::DateTime::now(),
                    }
                };
                let result = self
                    .db
                    .payments()
                    .update_one(filter, update, None)
                    .await
                    .map_err(AppError::from)?;
                if result.modified_count == 1 {
                    metrics::counter!("payments_failed_total").increment(1);
                } else {
                    tracing::warn!(
                        session_id = %event.session_id,
                        "Webhook failure matched no pending payment"
                    );
                }
            }
            other => {
                tracing::warn!(event = other, "Ignoring unknown webhook event");
            }
        }
        Ok(())
    }

    /// Moves a pending payment to completed. The pending guard lives
    /// in the filter so concurrent completions cannot double-apply.
    async fn mark_completed(
        &self,
        mut filter: mongodb::bson::Document,
        transaction_id: &str,
    ) -> Result<Payment, AppError> {
        filter.insert("status", PaymentStatus::Pending.as_str());
        let now = mongodb::bson::DateTime::now();
        let update = doc! {
            "$set": {
                "status": PaymentStatus::Completed.as_str(),
                "transaction_id": transaction_id,
                "completed_at": now,
                "updated_at": now,
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .db
            .payments()
            .find_one_and_update(filter, update, options)
            .await
            .map_err(AppError::from)?;

        match updated {
            Some(payment) => {
                metrics::counter!("payments_completed_total").increment(1);
                tracing::info!(
                    payment_id = %payment.id,
                    invoice = %payment.invoice_number,
                    "Payment completed"
                );
                Ok(payment)
            }
            None => Err(DomainError::NotApplicable(
                "Paiement introuvable ou deja traite".to_string(),
            )
            .into()),
        }
    }

    /// Drives the invoice to paid after a completed payment. A miss is
    /// logged, not surfaced: the money is in either way.
    async fn settle_invoice(&self, payment: &Payment) {
        if let Err(e) = self
            .invoices
            .mark_paid(payment.invoice_id, Some(payment.id))
            .await
        {
            tracing::warn!(
                invoice_id = %payment.invoice_id,
                payment_id = %payment.id,
                error = %e,
                "Completed payment could not settle its invoice"
            );
        }
    }

    fn wants_hosted_session(&self, method: PaymentMethod) -> bool {
        matches!(
            method,
            PaymentMethod::Card | PaymentMethod::MobileMoney
        ) && self.checkout.is_configured()
    }

    async fn load_invoice(&self, id: Uuid) -> Result<Invoice, AppError> {
        self.db
            .invoices()
            .find_one(doc! { "_id": id.to_string() }, None)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| DomainError::NotFound("Facture introuvable".to_string()).into())
    }
}
