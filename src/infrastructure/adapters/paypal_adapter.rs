use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{CallbackChannel, Donation, DonationStatus, PaymentProvider};
use crate::infrastructure::config::PaymentConfig;
use crate::ports::payment_gateway_port::*;
use crate::ports::DonationRepositoryPort;

/// OAuth-capture adapter (PayPal orders API). There is no notify channel;
/// capture happens lazily when the payer returns, and cancellation trusts
/// the cancel callback without contacting the provider.
#[derive(Clone)]
pub struct PaypalAdapter<R: DonationRepositoryPort> {
    config: Arc<PaymentConfig>,
    repository: Arc<R>,
    client: Client,
}

impl<R: DonationRepositoryPort> PaypalAdapter<R> {
    pub fn new(config: Arc<PaymentConfig>, repository: Arc<R>) -> Self {
        Self {
            config,
            repository,
            client: Client::new(),
        }
    }

    /// Client-credentials exchange for a short-lived bearer token.
    async fn fetch_access_token(&self) -> DomainResult<String> {
        let paypal = &self.config.paypal;
        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", paypal.base_url))
            .basic_auth(&paypal.client_id, Some(&paypal.client_secret))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("PayPal token error: {text}");
            return Err(DomainError::ProviderError(format!(
                "PayPal token error: {text}"
            )));
        }

        let body: serde_json::Value = response.json().await?;
        body["access_token"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| DomainError::ProviderError("PayPal token response missing access_token".into()))
    }

    async fn post_json(
        &self,
        url: String,
        access_token: &str,
        payload: serde_json::Value,
    ) -> DomainResult<serde_json::Value> {
        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("PayPal request error: {text}");
            return Err(DomainError::ProviderError(format!(
                "PayPal request error: {text}"
            )));
        }
        Ok(response.json().await?)
    }

    fn extract_approve_url(response: &serde_json::Value) -> Option<String> {
        response["links"].as_array().and_then(|links| {
            links.iter().find_map(|link| {
                (link["rel"].as_str() == Some("approve"))
                    .then(|| link["href"].as_str().map(String::from))
                    .flatten()
            })
        })
    }

    /// The order id is not always the donation id once a provider-assigned
    /// id has taken over, so resolution falls back to the stored reference.
    async fn resolve_by_txn(&self, order_id: &str) -> DomainResult<Uuid> {
        if let Ok(id) = Uuid::parse_str(order_id) {
            return Ok(id);
        }
        self.repository
            .find_by_payment_txn_id(order_id)
            .await?
            .map(|donation| donation.id)
            .ok_or_else(|| DomainError::DonationNotFound(order_id.to_string()))
    }

    async fn resolve_donation_id(&self, response: &serde_json::Value) -> DomainResult<Uuid> {
        if let Some(reference) = response["purchase_units"][0]["reference_id"].as_str() {
            if let Ok(id) = Uuid::parse_str(reference) {
                return Ok(id);
            }
        }
        let order_id = response["id"].as_str().unwrap_or("");
        self.resolve_by_txn(order_id).await
    }

    async fn capture_order(&self, order_id: &str) -> DomainResult<PaymentResult> {
        let access_token = self.fetch_access_token().await?;
        let response = self
            .post_json(
                format!(
                    "{}/v2/checkout/orders/{order_id}/capture",
                    self.config.paypal.base_url
                ),
                &access_token,
                json!({}),
            )
            .await?;

        let status_text = response["status"].as_str().unwrap_or("").to_string();
        let donation_id = self.resolve_donation_id(&response).await?;
        let status = if status_text.eq_ignore_ascii_case("COMPLETED") {
            DonationStatus::Success
        } else {
            DonationStatus::Failed
        };

        Ok(PaymentResult {
            donation_id: Some(donation_id),
            status,
            payment_txn_id: Some(order_id.to_string()),
            provider: PaymentProvider::Paypal,
            message: status_text,
        })
    }

    /// No confirmation call is made; the cancel callback is trusted as-is.
    async fn cancel_order(&self, order_id: &str) -> DomainResult<PaymentResult> {
        let donation_id = self.resolve_by_txn(order_id).await?;
        Ok(PaymentResult::failed(
            Some(donation_id),
            Some(order_id.to_string()),
            PaymentProvider::Paypal,
            "CANCELLED",
        ))
    }
}

#[async_trait]
impl<R: DonationRepositoryPort> PaymentGatewayPort for PaypalAdapter<R> {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Paypal
    }

    async fn create_payment(
        &self,
        donation: &Donation,
        _ctx: &CheckoutContext,
    ) -> DomainResult<PaymentInitiation> {
        let paypal = &self.config.paypal;
        if !paypal.enabled {
            return Err(DomainError::ConfigurationError("PayPal is disabled".into()));
        }
        if paypal.client_id.is_empty() {
            return Err(DomainError::ConfigurationError(
                "PayPal client ID is missing".into(),
            ));
        }
        if paypal.client_secret.is_empty() {
            return Err(DomainError::ConfigurationError(
                "PayPal client secret is missing".into(),
            ));
        }

        let access_token = self.fetch_access_token().await?;
        let payload = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": donation.id.to_string(),
                "amount": {
                    "currency_code": donation.currency,
                    "value": donation.amount.to_string(),
                },
                "description": format!("Donation {}", donation.id),
            }],
            "application_context": {
                "return_url": format!("{}{}", self.config.server_base_url, paypal.return_path),
                "cancel_url": format!("{}{}", self.config.server_base_url, paypal.cancel_path),
                "brand_name": self.config.brand_name,
            },
        });

        debug!(donation_id = %donation.id, "Creating PayPal order");
        let response = self
            .post_json(
                format!("{}/v2/checkout/orders", paypal.base_url),
                &access_token,
                payload,
            )
            .await?;

        let order_id = response["id"].as_str().unwrap_or("").to_string();
        let approve_url = Self::extract_approve_url(&response).ok_or_else(|| {
            DomainError::ProviderError("PayPal approval link missing".into())
        })?;

        Ok(PaymentInitiation {
            payment_url: approve_url,
            provider_txn_id: order_id,
            provider: PaymentProvider::Paypal,
        })
    }

    async fn parse_callback(
        &self,
        channel: CallbackChannel,
        params: &HashMap<String, String>,
    ) -> DomainResult<PaymentResult> {
        let token = params.get("token").map(String::as_str).unwrap_or("");
        if token.is_empty() {
            return Ok(PaymentResult::failed(
                None,
                None,
                PaymentProvider::Paypal,
                "Missing order token",
            ));
        }

        match channel {
            CallbackChannel::Return => self.capture_order(token).await,
            CallbackChannel::Cancel => self.cancel_order(token).await,
            // There is no server-to-server channel for this provider.
            CallbackChannel::Notify => Ok(PaymentResult::failed(
                None,
                Some(token.to_string()),
                PaymentProvider::Paypal,
                "Unsupported callback channel",
            )),
        }
    }
}
