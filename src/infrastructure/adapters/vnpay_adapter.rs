use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{CallbackChannel, Donation, DonationStatus, PaymentProvider};
use crate::infrastructure::config::PaymentConfig;
use crate::infrastructure::signature::{sign, MacAlgorithm};
use crate::ports::payment_gateway_port::*;

const VNPAY_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Bank-redirect adapter (VNPay hosted checkout page). Initiation is a pure
/// URL construction; the gateway is only ever contacted by the payer's
/// browser.
#[derive(Clone)]
pub struct VnpayAdapter {
    config: Arc<PaymentConfig>,
}

impl VnpayAdapter {
    pub fn new(config: Arc<PaymentConfig>) -> Self {
        Self { config }
    }

    /// The gateway's reference field cannot carry a hyphenated UUID, so the
    /// donation id travels as its 32-character hex form.
    pub fn uuid_to_txn_ref(id: Uuid) -> String {
        id.simple().to_string()
    }

    /// Reconstitutes a donation id by re-inserting separators at fixed
    /// offsets. A stripped length other than 32 is an invalid reference,
    /// not a signature problem.
    pub fn txn_ref_to_uuid(txn_ref: &str) -> DomainResult<Uuid> {
        let value = txn_ref.replace('-', "");
        if value.len() != 32 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidReference(
                "Invalid VNPay transaction reference".into(),
            ));
        }
        let uuid = format!(
            "{}-{}-{}-{}-{}",
            &value[0..8],
            &value[8..12],
            &value[12..16],
            &value[16..20],
            &value[20..]
        );
        Uuid::parse_str(&uuid).map_err(|_| {
            DomainError::InvalidReference("Invalid VNPay transaction reference".into())
        })
    }

    /// Lexicographically sorted, URL-encoded query string. The signature is
    /// computed over this exact serialization.
    fn build_query(params: &BTreeMap<String, String>) -> String {
        params
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[async_trait]
impl PaymentGatewayPort for VnpayAdapter {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Bank
    }

    fn notify_ack(&self) -> serde_json::Value {
        serde_json::json!({ "RspCode": "00", "Message": "OK" })
    }

    async fn create_payment(
        &self,
        donation: &Donation,
        ctx: &CheckoutContext,
    ) -> DomainResult<PaymentInitiation> {
        let vnpay = &self.config.vnpay;
        if !vnpay.enabled {
            return Err(DomainError::ConfigurationError("VNPay is disabled".into()));
        }
        if vnpay.tmn_code.is_empty() {
            return Err(DomainError::ConfigurationError(
                "VNPay TMN code is missing".into(),
            ));
        }
        if vnpay.hash_secret.is_empty() {
            return Err(DomainError::ConfigurationError(
                "VNPay hash secret is missing".into(),
            ));
        }

        let txn_ref = Self::uuid_to_txn_ref(donation.id);
        // VNPay expects the amount in the smallest currency subunit.
        let amount = (donation.amount * Decimal::from(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
            .to_string();
        let now = Utc::now();
        let client_ip = if ctx.client_ip.is_empty() {
            "127.0.0.1"
        } else {
            ctx.client_ip.as_str()
        };

        let mut params = BTreeMap::new();
        params.insert("vnp_Version".to_string(), "2.1.0".to_string());
        params.insert("vnp_Command".to_string(), "pay".to_string());
        params.insert("vnp_TmnCode".to_string(), vnpay.tmn_code.clone());
        params.insert("vnp_Amount".to_string(), amount);
        params.insert("vnp_CurrCode".to_string(), "VND".to_string());
        params.insert("vnp_TxnRef".to_string(), txn_ref.clone());
        params.insert(
            "vnp_OrderInfo".to_string(),
            format!("Donation {}", donation.id),
        );
        params.insert("vnp_OrderType".to_string(), "other".to_string());
        params.insert("vnp_Locale".to_string(), "vn".to_string());
        params.insert(
            "vnp_ReturnUrl".to_string(),
            format!("{}{}", self.config.server_base_url, vnpay.return_path),
        );
        params.insert("vnp_IpAddr".to_string(), client_ip.to_string());
        params.insert(
            "vnp_CreateDate".to_string(),
            now.format(VNPAY_TIME_FORMAT).to_string(),
        );
        params.insert(
            "vnp_ExpireDate".to_string(),
            (now + Duration::minutes(15)).format(VNPAY_TIME_FORMAT).to_string(),
        );
        params.insert(
            "vnp_IpnUrl".to_string(),
            format!("{}{}", self.config.server_base_url, vnpay.ipn_path),
        );

        let query = Self::build_query(&params);
        let secure_hash = sign(MacAlgorithm::HmacSha512, &vnpay.hash_secret, &query)?;
        let payment_url = format!("{}?{query}&vnp_SecureHash={secure_hash}", vnpay.endpoint);

        debug!(%txn_ref, "Built VNPay payment URL");
        Ok(PaymentInitiation {
            payment_url,
            provider_txn_id: txn_ref,
            provider: PaymentProvider::Bank,
        })
    }

    async fn parse_callback(
        &self,
        _channel: CallbackChannel,
        params: &HashMap<String, String>,
    ) -> DomainResult<PaymentResult> {
        let get = |key: &str| params.get(key).map(String::as_str).unwrap_or("");
        let txn_ref = get("vnp_TxnRef");
        let donation_id = match Self::txn_ref_to_uuid(txn_ref) {
            Ok(id) => id,
            Err(_) => {
                return Ok(PaymentResult::failed(
                    None,
                    None,
                    PaymentProvider::Bank,
                    "Invalid transaction reference",
                ));
            }
        };

        let secure_hash = get("vnp_SecureHash");
        if !secure_hash.is_empty() {
            // The signature and its algorithm-name field are excluded from
            // the string being re-signed.
            let filtered: BTreeMap<String, String> = params
                .iter()
                .filter(|(key, _)| {
                    !key.eq_ignore_ascii_case("vnp_SecureHash")
                        && !key.eq_ignore_ascii_case("vnp_SecureHashType")
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            let expected = sign(
                MacAlgorithm::HmacSha512,
                &self.config.vnpay.hash_secret,
                &Self::build_query(&filtered),
            )?;
            if !expected.eq_ignore_ascii_case(secure_hash) {
                return Ok(PaymentResult::failed(
                    Some(donation_id),
                    Some(txn_ref.to_string()),
                    PaymentProvider::Bank,
                    "Invalid signature",
                ));
            }
        }

        let status = if get("vnp_ResponseCode") == "00" {
            DonationStatus::Success
        } else {
            DonationStatus::Failed
        };

        Ok(PaymentResult {
            donation_id: Some(donation_id),
            status,
            payment_txn_id: Some(txn_ref.to_string()),
            provider: PaymentProvider::Bank,
            message: get("vnp_Message").to_string(),
        })
    }
}
