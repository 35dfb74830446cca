use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::PaymentProvider;

/// Checkout request body. Field names follow the client's wire contract.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub donor_name: String,

    /// Exact decimal amount, must be > 0.
    pub amount: Decimal,

    /// 3-letter currency code.
    pub currency: String,

    pub message: Option<String>,

    /// Requested provider; normalized to the MOMO/BANK/PAYPAL vocabulary.
    pub payment_method: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub donation_id: Uuid,

    /// Where the payer's browser must be sent.
    pub payment_url: String,

    pub provider: PaymentProvider,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
