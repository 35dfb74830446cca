use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::dto::{CheckoutRequest, CheckoutResponse};
use crate::domain::errors::DomainResult;
use crate::domain::{CallbackChannel, Donation, DonationStatus, PaymentProvider};
use crate::infrastructure::config::PaymentConfig;
use crate::ports::payment_gateway_port::{CheckoutContext, PaymentGatewayPort, PaymentResult};
use crate::ports::DonationRepositoryPort;

/// Checkout orchestrator and callback processor.
///
/// Every checkout and every callback is an independent unit of work; the
/// donation ledger is the only coordination point between them.
pub struct PaymentService<R: DonationRepositoryPort> {
    config: Arc<PaymentConfig>,
    repository: Arc<R>,
    momo: Arc<dyn PaymentGatewayPort>,
    vnpay: Arc<dyn PaymentGatewayPort>,
    paypal: Arc<dyn PaymentGatewayPort>,
}

impl<R: DonationRepositoryPort> PaymentService<R> {
    pub fn new(
        config: Arc<PaymentConfig>,
        repository: Arc<R>,
        momo: Arc<dyn PaymentGatewayPort>,
        vnpay: Arc<dyn PaymentGatewayPort>,
        paypal: Arc<dyn PaymentGatewayPort>,
    ) -> Self {
        Self {
            config,
            repository,
            momo,
            vnpay,
            paypal,
        }
    }

    fn gateway_for(&self, provider: PaymentProvider) -> &Arc<dyn PaymentGatewayPort> {
        match provider {
            PaymentProvider::Momo => &self.momo,
            PaymentProvider::Bank => &self.vnpay,
            PaymentProvider::Paypal => &self.paypal,
        }
    }

    /// Creates a pending ledger entry, then asks the selected provider for a
    /// redirect URL. The pending row is written first so a provider outage
    /// still leaves an auditable record; it is deliberately not rolled back
    /// when initiation fails.
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
        client_ip: String,
    ) -> DomainResult<CheckoutResponse> {
        let provider = PaymentProvider::parse(&request.payment_method)?;
        info!(%provider, "Creating donation checkout");

        let donation = Donation::new(
            request.donor_name,
            request.amount,
            request.currency,
            request.message,
            provider,
        )?;
        self.repository.save(&donation).await?;
        debug!(donation_id = %donation.id, "Pending donation recorded");

        let ctx = CheckoutContext { client_ip };
        let initiation = self
            .gateway_for(provider)
            .create_payment(&donation, &ctx)
            .await?;

        // Give both callback channels a value to correlate against before
        // either of them arrives.
        if !initiation.provider_txn_id.is_empty() {
            self.repository
                .update_status_and_txn(
                    donation.id,
                    DonationStatus::Pending,
                    Some(&initiation.provider_txn_id),
                )
                .await?;
        }

        info!(donation_id = %donation.id, "Checkout initiated");
        Ok(CheckoutResponse {
            donation_id: donation.id,
            payment_url: initiation.payment_url,
            provider: initiation.provider,
        })
    }

    /// Browser-mediated callback: applies the outcome and produces the
    /// client-facing redirect target.
    pub async fn handle_return(
        &self,
        provider: PaymentProvider,
        channel: CallbackChannel,
        params: &HashMap<String, String>,
    ) -> DomainResult<String> {
        let result = self.gateway_for(provider).parse_callback(channel, params).await?;
        self.apply_result(&result).await?;
        Ok(self.build_redirect_url(&result))
    }

    /// Server-to-server callback: applies the outcome and returns the
    /// acknowledgment the provider's webhook contract expects, even when
    /// verification failed (acking stops retry storms on permanently
    /// invalid callbacks).
    pub async fn handle_notify(
        &self,
        provider: PaymentProvider,
        params: &HashMap<String, String>,
    ) -> DomainResult<serde_json::Value> {
        let gateway = self.gateway_for(provider);
        let result = gateway.parse_callback(CallbackChannel::Notify, params).await?;
        self.apply_result(&result).await?;
        Ok(gateway.notify_ack())
    }

    /// Idempotent merge into the ledger. A result without a donation id
    /// (malformed reference) is logged and skipped; the caller still gets
    /// its redirect or acknowledgment.
    async fn apply_result(&self, result: &PaymentResult) -> DomainResult<()> {
        match result.donation_id {
            Some(id) => {
                let donation = self
                    .repository
                    .update_status_and_txn(id, result.status, result.payment_txn_id.as_deref())
                    .await?;
                info!(
                    donation_id = %id,
                    status = %donation.status,
                    "Applied {} callback result",
                    result.provider
                );
            }
            None => {
                warn!(
                    provider = %result.provider,
                    message = %result.message,
                    "Callback without resolvable donation reference, ledger untouched"
                );
            }
        }
        Ok(())
    }

    fn build_redirect_url(&self, result: &PaymentResult) -> String {
        let status = if result.status == DonationStatus::Success {
            "success"
        } else {
            "fail"
        };
        let donation_id = result
            .donation_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        format!(
            "{}/donate?status={status}&donationId={donation_id}&method={}&message={}",
            self.config.client_base_url,
            result.provider,
            urlencoding::encode(&result.message),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::infrastructure::config::{MomoConfig, PaypalConfig, VnpayConfig};
    use crate::ports::payment_gateway_port::PaymentInitiation;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    struct InMemoryRepository {
        donations: Mutex<Vec<Donation>>,
    }

    impl InMemoryRepository {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                donations: Mutex::new(Vec::new()),
            })
        }

        async fn get(&self, id: Uuid) -> Donation {
            self.donations
                .lock()
                .await
                .iter()
                .find(|d| d.id == id)
                .cloned()
                .unwrap()
        }

        async fn count(&self) -> usize {
            self.donations.lock().await.len()
        }
    }

    #[async_trait]
    impl DonationRepositoryPort for InMemoryRepository {
        async fn save(&self, donation: &Donation) -> DomainResult<()> {
            self.donations.lock().await.push(donation.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Donation>> {
            Ok(self
                .donations
                .lock()
                .await
                .iter()
                .find(|d| d.id == id)
                .cloned())
        }

        async fn find_by_payment_txn_id(&self, txn_id: &str) -> DomainResult<Option<Donation>> {
            Ok(self
                .donations
                .lock()
                .await
                .iter()
                .find(|d| d.payment_txn_id.as_deref() == Some(txn_id))
                .cloned())
        }

        async fn update_status_and_txn(
            &self,
            id: Uuid,
            status: DonationStatus,
            txn_id: Option<&str>,
        ) -> DomainResult<Donation> {
            let mut donations = self.donations.lock().await;
            let donation = donations
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| DomainError::DonationNotFound(id.to_string()))?;
            donation.apply_payment_result(status, txn_id);
            Ok(donation.clone())
        }
    }

    /// Gateway double: counts initiations and replays queued callback results.
    struct StubGateway {
        provider: PaymentProvider,
        initiation: Option<PaymentInitiation>,
        results: Mutex<VecDeque<PaymentResult>>,
        create_calls: AtomicUsize,
    }

    impl StubGateway {
        fn new(provider: PaymentProvider, txn_id: &str) -> Arc<Self> {
            Arc::new(Self {
                provider,
                initiation: Some(PaymentInitiation {
                    payment_url: format!("https://gateway.example/{provider}"),
                    provider_txn_id: txn_id.to_string(),
                    provider,
                }),
                results: Mutex::new(VecDeque::new()),
                create_calls: AtomicUsize::new(0),
            })
        }

        fn failing(provider: PaymentProvider) -> Arc<Self> {
            Arc::new(Self {
                provider,
                initiation: None,
                results: Mutex::new(VecDeque::new()),
                create_calls: AtomicUsize::new(0),
            })
        }

        async fn queue(&self, result: PaymentResult) {
            self.results.lock().await.push_back(result);
        }
    }

    #[async_trait]
    impl PaymentGatewayPort for StubGateway {
        fn provider(&self) -> PaymentProvider {
            self.provider
        }

        fn notify_ack(&self) -> serde_json::Value {
            serde_json::json!({ "message": "success", "resultCode": 0 })
        }

        async fn create_payment(
            &self,
            _donation: &Donation,
            _ctx: &CheckoutContext,
        ) -> DomainResult<PaymentInitiation> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.initiation
                .clone()
                .ok_or_else(|| DomainError::ProviderError("gateway down".into()))
        }

        async fn parse_callback(
            &self,
            _channel: CallbackChannel,
            _params: &HashMap<String, String>,
        ) -> DomainResult<PaymentResult> {
            Ok(self.results.lock().await.pop_front().expect("queued result"))
        }
    }

    fn config() -> Arc<PaymentConfig> {
        Arc::new(PaymentConfig {
            client_base_url: "http://localhost:5173".into(),
            server_base_url: "http://localhost:8080".into(),
            brand_name: "DonationSite".into(),
            momo: MomoConfig {
                enabled: true,
                endpoint: String::new(),
                partner_code: String::new(),
                access_key: String::new(),
                secret_key: String::new(),
                return_path: String::new(),
                ipn_path: String::new(),
            },
            vnpay: VnpayConfig {
                enabled: true,
                endpoint: String::new(),
                tmn_code: String::new(),
                hash_secret: String::new(),
                return_path: String::new(),
                ipn_path: String::new(),
            },
            paypal: PaypalConfig {
                enabled: true,
                base_url: String::new(),
                client_id: String::new(),
                client_secret: String::new(),
                return_path: String::new(),
                cancel_path: String::new(),
            },
        })
    }

    struct Harness {
        repository: Arc<InMemoryRepository>,
        momo: Arc<StubGateway>,
        vnpay: Arc<StubGateway>,
        paypal: Arc<StubGateway>,
        service: PaymentService<InMemoryRepository>,
    }

    fn harness() -> Harness {
        let repository = InMemoryRepository::new();
        let momo = StubGateway::new(PaymentProvider::Momo, "MOMO-TXN");
        let vnpay = StubGateway::new(PaymentProvider::Bank, "BANKREF123");
        let paypal = StubGateway::new(PaymentProvider::Paypal, "PAYPAL-ORDER");
        let service = PaymentService::new(
            config(),
            repository.clone(),
            momo.clone(),
            vnpay.clone(),
            paypal.clone(),
        );
        Harness {
            repository,
            momo,
            vnpay,
            paypal,
            service,
        }
    }

    fn request(method: &str) -> CheckoutRequest {
        CheckoutRequest {
            donor_name: "Alice".into(),
            amount: dec!(50000),
            currency: "VND".into(),
            message: Some("Keep writing".into()),
            payment_method: method.into(),
        }
    }

    fn success_result(id: Uuid, provider: PaymentProvider, txn: &str) -> PaymentResult {
        PaymentResult {
            donation_id: Some(id),
            status: DonationStatus::Success,
            payment_txn_id: Some(txn.into()),
            provider,
            message: "Successful.".into(),
        }
    }

    #[tokio::test]
    async fn test_checkout_records_pending_and_txn_id() {
        let h = harness();
        let response = h.service.checkout(request("MOMO"), "1.2.3.4".into()).await.unwrap();

        let donation = h.repository.get(response.donation_id).await;
        assert_eq!(donation.status, DonationStatus::Pending);
        assert_eq!(donation.payment_txn_id.as_deref(), Some("MOMO-TXN"));
        assert_eq!(response.payment_url, "https://gateway.example/MOMO");
    }

    #[tokio::test]
    async fn test_lowercase_method_dispatches_to_paypal() {
        let h = harness();
        let response = h.service.checkout(request("paypal"), String::new()).await.unwrap();

        assert_eq!(response.provider, PaymentProvider::Paypal);
        assert_eq!(h.paypal.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.momo.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_method_is_rejected_before_persisting() {
        let h = harness();
        let result = h.service.checkout(request("STRIPE"), String::new()).await;

        assert!(matches!(result, Err(DomainError::UnsupportedProvider(_))));
        assert_eq!(h.repository.count().await, 0);
    }

    #[tokio::test]
    async fn test_gateway_failure_keeps_pending_row() {
        let repository = InMemoryRepository::new();
        let service = PaymentService::new(
            config(),
            repository.clone(),
            StubGateway::failing(PaymentProvider::Momo),
            StubGateway::failing(PaymentProvider::Bank),
            StubGateway::failing(PaymentProvider::Paypal),
        );

        let result = service.checkout(request("BANK"), String::new()).await;
        assert!(matches!(result, Err(DomainError::ProviderError(_))));

        // The pending entry stays for operators and late callbacks.
        assert_eq!(repository.count().await, 1);
        let donations = repository.donations.lock().await;
        assert_eq!(donations[0].status, DonationStatus::Pending);
    }

    #[tokio::test]
    async fn test_return_builds_redirect_and_applies_result() {
        let h = harness();
        let response = h.service.checkout(request("MOMO"), String::new()).await.unwrap();
        h.momo
            .queue(success_result(response.donation_id, PaymentProvider::Momo, "999"))
            .await;

        let redirect = h
            .service
            .handle_return(PaymentProvider::Momo, CallbackChannel::Return, &HashMap::new())
            .await
            .unwrap();

        assert_eq!(
            redirect,
            format!(
                "http://localhost:5173/donate?status=success&donationId={}&method=MOMO&message=Successful.",
                response.donation_id
            )
        );
        let donation = h.repository.get(response.donation_id).await;
        assert_eq!(donation.status, DonationStatus::Success);
        assert_eq!(donation.payment_txn_id.as_deref(), Some("999"));
    }

    #[tokio::test]
    async fn test_racing_channels_first_writer_wins() {
        let h = harness();
        let response = h.service.checkout(request("BANK"), String::new()).await.unwrap();
        let id = response.donation_id;

        h.vnpay
            .queue(PaymentResult::failed(
                Some(id),
                Some("BANKREF123".into()),
                PaymentProvider::Bank,
                "Customer cancelled",
            ))
            .await;
        h.vnpay
            .queue(success_result(id, PaymentProvider::Bank, "BANKREF123"))
            .await;

        // Notify lands first with FAILED, then the return claims SUCCESS.
        h.service.handle_notify(PaymentProvider::Bank, &HashMap::new()).await.unwrap();
        let redirect = h
            .service
            .handle_return(PaymentProvider::Bank, CallbackChannel::Return, &HashMap::new())
            .await
            .unwrap();

        assert!(redirect.contains("status=success"));
        assert_eq!(h.repository.get(id).await.status, DonationStatus::Failed);
    }

    #[tokio::test]
    async fn test_notify_on_terminal_donation_still_acks() {
        let h = harness();
        let response = h.service.checkout(request("MOMO"), String::new()).await.unwrap();
        let id = response.donation_id;

        h.momo.queue(success_result(id, PaymentProvider::Momo, "999")).await;
        h.momo.queue(success_result(id, PaymentProvider::Momo, "101010")).await;

        h.service.handle_notify(PaymentProvider::Momo, &HashMap::new()).await.unwrap();
        let ack = h
            .service
            .handle_notify(PaymentProvider::Momo, &HashMap::new())
            .await
            .unwrap();

        assert_eq!(ack, serde_json::json!({ "message": "success", "resultCode": 0 }));
        let donation = h.repository.get(id).await;
        assert_eq!(donation.status, DonationStatus::Success);
        // The id recorded by the first terminal callback is kept.
        assert_eq!(donation.payment_txn_id.as_deref(), Some("999"));
    }

    #[tokio::test]
    async fn test_unresolvable_reference_skips_ledger_but_redirects() {
        let h = harness();
        h.vnpay
            .queue(PaymentResult::failed(
                None,
                None,
                PaymentProvider::Bank,
                "Invalid transaction reference",
            ))
            .await;

        let redirect = h
            .service
            .handle_return(PaymentProvider::Bank, CallbackChannel::Return, &HashMap::new())
            .await
            .unwrap();

        assert!(redirect.contains("status=fail"));
        assert!(redirect.contains("donationId=&"));
        assert!(redirect.contains("message=Invalid%20transaction%20reference"));
    }

    #[tokio::test]
    async fn test_unknown_donation_id_propagates_not_found() {
        let h = harness();
        h.momo
            .queue(success_result(Uuid::new_v4(), PaymentProvider::Momo, "999"))
            .await;

        let result = h
            .service
            .handle_notify(PaymentProvider::Momo, &HashMap::new())
            .await;
        assert!(matches!(result, Err(DomainError::DonationNotFound(_))));
    }
}
