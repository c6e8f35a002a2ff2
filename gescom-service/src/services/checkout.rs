//! Hosted checkout provider client.
//!
//! Opens payment sessions for card and mobile-money payments and
//! verifies webhook signatures. The provider is optional: without
//! credentials every call short-circuits and payments stay manual.

use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::CheckoutConfig;

/// Header carrying the hex HMAC-SHA256 of the raw webhook body.
pub const SIGNATURE_HEADER: &str = "x-checkout-signature";

pub const EVENT_COMPLETED: &str = "payment.completed";
pub const EVENT_FAILED: &str = "payment.failed";

#[derive(Clone)]
pub struct CheckoutClient {
    client: Client,
    config: CheckoutConfig,
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    amount: f64,
    currency: &'a str,
    reference: &'a str,
}

/// Session opened at the provider; the caller is redirected to
/// `redirect_url` to pay.
#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub redirect_url: String,
}

/// Terminal webhook notification.
#[derive(Debug, Deserialize)]
pub struct CheckoutEvent {
    pub event: String,
    pub session_id: String,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: String,
}

impl CheckoutClient {
    pub fn new(config: CheckoutConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Credentials present; hosted sessions can be opened.
    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
            && !self.config.api_secret.expose_secret().is_empty()
            && !self.config.api_base_url.is_empty()
    }

    pub async fn create_session(
        &self,
        amount: f64,
        currency: &str,
        reference: &str,
    ) -> Result<CheckoutSession> {
        if !self.is_configured() {
            return Err(anyhow!("Checkout provider not configured"));
        }

        let request = CreateSessionRequest {
            amount,
            currency,
            reference,
        };
        let url = format!("{}/sessions", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.api_key,
                Some(self.config.api_secret.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Checkout create_session response");

        if status.is_success() {
            let session: CheckoutSession = serde_json::from_str(&body)?;
            tracing::info!(
                session_id = %session.id,
                amount,
                currency,
                reference,
                "Checkout session opened"
            );
            Ok(session)
        } else {
            let error: ProviderError = serde_json::from_str(&body).unwrap_or(ProviderError {
                error: body.clone(),
            });
            tracing::error!(error = %error.error, "Checkout session creation failed");
            Err(anyhow!("Checkout error: {}", error.error))
        }
    }

    /// Webhook signature: hex HMAC-SHA256 of the raw request body keyed
    /// with the webhook secret.
    pub fn verify_webhook_signature(&self, body: &str, signature: &str) -> Result<bool> {
        let expected = self.compute_signature(body, self.config.webhook_secret.expose_secret())?;
        let is_valid = expected == signature;
        if !is_valid {
            tracing::warn!("Webhook signature verification failed");
        }
        Ok(is_valid)
    }

    pub fn parse_webhook_event(&self, body: &str) -> Result<CheckoutEvent> {
        Ok(serde_json::from_str(body)?)
    }

    fn compute_signature(&self, payload: &str, secret: &str) -> Result<String> {
        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| anyhow!("Invalid key length"))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> CheckoutConfig {
        CheckoutConfig {
            api_key: "ck_test_123".to_string(),
            api_secret: Secret::new("test_secret".to_string()),
            webhook_secret: Secret::new("webhook_secret".to_string()),
            api_base_url: base_url.to_string(),
        }
    }

    #[test]
    fn unconfigured_client_reports_it() {
        let client = CheckoutClient::new(CheckoutConfig {
            api_key: String::new(),
            api_secret: Secret::new(String::new()),
            webhook_secret: Secret::new(String::new()),
            api_base_url: String::new(),
        });
        assert!(!client.is_configured());

        let client = CheckoutClient::new(test_config("https://checkout.example.com/v1"));
        assert!(client.is_configured());
    }

    #[tokio::test]
    async fn create_session_parses_provider_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "sess_42",
                "redirect_url": "https://checkout.example.com/pay/sess_42"
            })))
            .mount(&server)
            .await;

        let client = CheckoutClient::new(test_config(&server.uri()));
        let session = client
            .create_session(58.0, "USD", "FAC-20260101-0001")
            .await
            .unwrap();

        assert_eq!(session.id, "sess_42");
        assert!(session.redirect_url.ends_with("sess_42"));
    }

    #[tokio::test]
    async fn create_session_surfaces_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({ "error": "amount too small" })),
            )
            .mount(&server)
            .await;

        let client = CheckoutClient::new(test_config(&server.uri()));
        let err = client
            .create_session(0.0, "USD", "FAC-20260101-0002")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("amount too small"));
    }

    #[test]
    fn webhook_signature_round_trips() {
        let client = CheckoutClient::new(test_config("https://checkout.example.com/v1"));
        let body = r#"{"event":"payment.completed","session_id":"sess_42"}"#;

        let signature = client.compute_signature(body, "webhook_secret").unwrap();
        assert!(client.verify_webhook_signature(body, &signature).unwrap());
        assert!(!client.verify_webhook_signature(body, "deadbeef").unwrap());
        assert!(!client
            .verify_webhook_signature(&format!("{body} "), &signature)
            .unwrap());
    }

    #[test]
    fn webhook_event_parses() {
        let client = CheckoutClient::new(test_config("https://checkout.example.com/v1"));
        let event = client
            .parse_webhook_event(
                r#"{"event":"payment.completed","session_id":"sess_42","transaction_id":"tx_9"}"#,
            )
            .unwrap();
        assert_eq!(event.event, EVENT_COMPLETED);
        assert_eq!(event.session_id, "sess_42");
        assert_eq!(event.transaction_id.as_deref(), Some("tx_9"));
    }
}
