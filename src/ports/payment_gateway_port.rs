use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::{CallbackChannel, Donation, DonationStatus, PaymentProvider};

/// Per-request data the adapters may need at checkout time.
#[derive(Debug, Clone, Default)]
pub struct CheckoutContext {
    pub client_ip: String,
}

/// Result of asking a provider to start a payment. Ephemeral, not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInitiation {
    /// Where the payer's browser must be sent.
    pub payment_url: String,
    pub provider_txn_id: String,
    pub provider: PaymentProvider,
}

/// Normalized outcome of any callback, regardless of provider or channel.
///
/// `donation_id` is `None` exactly when the callback's donation reference is
/// malformed; the processor then skips the ledger write but still produces
/// the redirect or acknowledgment.
#[derive(Debug, Clone)]
pub struct PaymentResult {
    pub donation_id: Option<Uuid>,
    pub status: DonationStatus,
    pub payment_txn_id: Option<String>,
    pub provider: PaymentProvider,
    pub message: String,
}

impl PaymentResult {
    pub fn failed(
        donation_id: Option<Uuid>,
        payment_txn_id: Option<String>,
        provider: PaymentProvider,
        message: impl Into<String>,
    ) -> Self {
        Self {
            donation_id,
            status: DonationStatus::Failed,
            payment_txn_id,
            provider,
            message: message.into(),
        }
    }
}

/// Capability interface every payment provider implements. Callers never
/// branch on provider identity except to pick the variant.
#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    /// The acknowledgment payload this provider's webhook expects. Returned
    /// to the provider independent of the internal outcome, so that a
    /// permanently-invalid callback is not retried forever.
    fn notify_ack(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    /// Initiates a payment for a freshly created pending donation.
    ///
    /// Fails with `ConfigurationError` when the provider is disabled or a
    /// credential is missing, and with `ProviderError` when the gateway
    /// itself reports a failure. No retry is attempted here.
    async fn create_payment(
        &self,
        donation: &Donation,
        ctx: &CheckoutContext,
    ) -> DomainResult<PaymentInitiation>;

    /// Translates an untrusted callback payload into a normalized result.
    ///
    /// Verification failures (signature mismatch, malformed reference) are
    /// returned as a `FAILED` result carrying a diagnostic message, never as
    /// an error; provider-API and donation-not-found errors propagate.
    async fn parse_callback(
        &self,
        channel: CallbackChannel,
        params: &HashMap<String, String>,
    ) -> DomainResult<PaymentResult>;
}
