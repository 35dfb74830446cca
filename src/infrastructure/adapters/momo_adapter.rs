use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{CallbackChannel, Donation, DonationStatus, PaymentProvider};
use crate::infrastructure::config::PaymentConfig;
use crate::infrastructure::signature::{sign, MacAlgorithm};
use crate::ports::payment_gateway_port::*;

/// Wallet-redirect adapter (MoMo captureWallet flow).
#[derive(Clone)]
pub struct MomoAdapter {
    config: Arc<PaymentConfig>,
    client: Client,
}

impl MomoAdapter {
    pub fn new(config: Arc<PaymentConfig>) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Amount is sent as a whole-unit plain string. The rounding happens
    /// exactly once; the same string goes into the signed canonical string
    /// and the JSON payload, or the remote signature check fails.
    fn normalize_amount(amount: Decimal) -> String {
        amount
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
            .to_string()
    }

    /// Canonical string for callback verification. The field set and order
    /// differ from the creation string; both channels share this layout.
    fn callback_canonical(&self, params: &HashMap<String, String>) -> String {
        let get = |key: &str| params.get(key).map(String::as_str).unwrap_or("");
        format!(
            "accessKey={}&amount={}&extraData={}&orderId={}&orderInfo={}&orderType={}\
             &partnerCode={}&payType={}&requestId={}&responseTime={}&resultCode={}&transId={}",
            self.config.momo.access_key,
            get("amount"),
            get("extraData"),
            get("orderId"),
            get("orderInfo"),
            get("orderType"),
            get("partnerCode"),
            get("payType"),
            get("requestId"),
            get("responseTime"),
            get("resultCode"),
            get("transId"),
        )
    }
}

#[async_trait]
impl PaymentGatewayPort for MomoAdapter {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Momo
    }

    fn notify_ack(&self) -> serde_json::Value {
        serde_json::json!({ "message": "success", "resultCode": 0 })
    }

    async fn create_payment(
        &self,
        donation: &Donation,
        _ctx: &CheckoutContext,
    ) -> DomainResult<PaymentInitiation> {
        let momo = &self.config.momo;
        if !momo.enabled {
            return Err(DomainError::ConfigurationError("MoMo is disabled".into()));
        }
        for (value, what) in [
            (&momo.partner_code, "MoMo partner code"),
            (&momo.access_key, "MoMo access key"),
            (&momo.secret_key, "MoMo secret key"),
        ] {
            if value.is_empty() {
                return Err(DomainError::ConfigurationError(format!("{what} is missing")));
            }
        }

        let order_id = donation.id.to_string();
        let request_id = order_id.clone();
        let order_info = format!("Donation {order_id}");
        let redirect_url = format!("{}{}", self.config.server_base_url, momo.return_path);
        let ipn_url = format!("{}{}", self.config.server_base_url, momo.ipn_path);
        let request_type = "captureWallet";
        let extra_data = "";
        let amount = Self::normalize_amount(donation.amount);

        let canonical = format!(
            "accessKey={}&amount={amount}&extraData={extra_data}&ipnUrl={ipn_url}\
             &orderId={order_id}&orderInfo={order_info}&partnerCode={}\
             &redirectUrl={redirect_url}&requestId={request_id}&requestType={request_type}",
            momo.access_key, momo.partner_code,
        );
        let signature = sign(MacAlgorithm::HmacSha256, &momo.secret_key, &canonical)?;

        let payload = json!({
            "partnerCode": momo.partner_code,
            "partnerName": self.config.brand_name,
            "storeId": self.config.brand_name,
            "requestId": request_id,
            "amount": amount,
            "orderId": order_id,
            "orderInfo": order_info,
            "redirectUrl": redirect_url,
            "ipnUrl": ipn_url,
            "lang": "vi",
            "requestType": request_type,
            "extraData": extra_data,
            "signature": signature,
        });

        debug!(%order_id, "Sending MoMo create-payment request");
        let response = self.client.post(&momo.endpoint).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!(%status, "MoMo API error: {text}");
            return Err(DomainError::ProviderError(format!(
                "MoMo API returned {status}: {text}"
            )));
        }

        let body: serde_json::Value = response.json().await?;
        if body["resultCode"].as_i64() == Some(0) {
            let pay_url = body["payUrl"].as_str().ok_or_else(|| {
                DomainError::ProviderError("MoMo response missing payUrl".into())
            })?;
            return Ok(PaymentInitiation {
                payment_url: pay_url.to_string(),
                provider_txn_id: order_id,
                provider: PaymentProvider::Momo,
            });
        }

        let message = body["message"].as_str().unwrap_or("unknown");
        Err(DomainError::ProviderError(format!(
            "MoMo payment request failed: {message}"
        )))
    }

    async fn parse_callback(
        &self,
        _channel: CallbackChannel,
        params: &HashMap<String, String>,
    ) -> DomainResult<PaymentResult> {
        let get = |key: &str| params.get(key).map(String::as_str).unwrap_or("");
        let order_id = get("orderId");
        let donation_id = match Uuid::parse_str(order_id) {
            Ok(id) => id,
            Err(_) => {
                return Ok(PaymentResult::failed(
                    None,
                    None,
                    PaymentProvider::Momo,
                    "Invalid donation reference",
                ));
            }
        };

        let signature = get("signature");
        if !signature.is_empty() && !self.config.momo.secret_key.is_empty() {
            let expected = sign(
                MacAlgorithm::HmacSha256,
                &self.config.momo.secret_key,
                &self.callback_canonical(params),
            )?;
            if expected != signature {
                return Ok(PaymentResult::failed(
                    Some(donation_id),
                    Some(order_id.to_string()),
                    PaymentProvider::Momo,
                    "Invalid signature",
                ));
            }
        }

        let status = if get("resultCode") == "0" {
            DonationStatus::Success
        } else {
            DonationStatus::Failed
        };

        // Prefer the wallet's final transaction id over the initial order id.
        let txn_id = [get("transId"), get("requestId"), order_id]
            .into_iter()
            .find(|v| !v.is_empty())
            .unwrap_or(order_id);

        Ok(PaymentResult {
            donation_id: Some(donation_id),
            status,
            payment_txn_id: Some(txn_id.to_string()),
            provider: PaymentProvider::Momo,
            message: get("message").to_string(),
        })
    }
}
