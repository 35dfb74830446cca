use std::sync::Arc;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}

/// Payment configuration, loaded once at startup. Credentials are allowed to
/// be empty here; each adapter reports a configuration error at call time so
/// a disabled provider never blocks startup.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Base URL of the user-facing client, target of return redirects.
    pub client_base_url: String,
    /// Public base URL of this service, used to build callback URLs.
    pub server_base_url: String,
    /// Brand name shown on provider-hosted pages.
    pub brand_name: String,

    pub momo: MomoConfig,
    pub vnpay: VnpayConfig,
    pub paypal: PaypalConfig,
}

#[derive(Debug, Clone)]
pub struct MomoConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub partner_code: String,
    pub access_key: String,
    pub secret_key: String,
    pub return_path: String,
    pub ipn_path: String,
}

#[derive(Debug, Clone)]
pub struct VnpayConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub tmn_code: String,
    pub hash_secret: String,
    pub return_path: String,
    pub ipn_path: String,
}

#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub enabled: bool,
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub return_path: String,
    pub cancel_path: String,
}

impl PaymentConfig {
    pub fn from_env() -> Arc<Self> {
        Arc::new(Self {
            client_base_url: env_or("CLIENT_BASE_URL", "http://localhost:5173"),
            server_base_url: env_or("SERVER_BASE_URL", "http://localhost:8080"),
            brand_name: env_or("PAYMENT_BRAND_NAME", "DonationSite"),
            momo: MomoConfig {
                enabled: env_flag("MOMO_ENABLED"),
                endpoint: env_or(
                    "MOMO_ENDPOINT",
                    "https://test-payment.momo.vn/v2/gateway/api/create",
                ),
                partner_code: env_or("MOMO_PARTNER_CODE", ""),
                access_key: env_or("MOMO_ACCESS_KEY", ""),
                secret_key: env_or("MOMO_SECRET_KEY", ""),
                return_path: env_or("MOMO_RETURN_PATH", "/api/payments/momo/return"),
                ipn_path: env_or("MOMO_IPN_PATH", "/api/payments/momo/notify"),
            },
            vnpay: VnpayConfig {
                enabled: env_flag("VNPAY_ENABLED"),
                endpoint: env_or(
                    "VNPAY_ENDPOINT",
                    "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
                ),
                tmn_code: env_or("VNPAY_TMN_CODE", ""),
                hash_secret: env_or("VNPAY_HASH_SECRET", ""),
                return_path: env_or("VNPAY_RETURN_PATH", "/api/payments/vnpay/return"),
                ipn_path: env_or("VNPAY_IPN_PATH", "/api/payments/vnpay/notify"),
            },
            paypal: PaypalConfig {
                enabled: env_flag("PAYPAL_ENABLED"),
                base_url: env_or("PAYPAL_BASE_URL", "https://api-m.sandbox.paypal.com"),
                client_id: env_or("PAYPAL_CLIENT_ID", ""),
                client_secret: env_or("PAYPAL_CLIENT_SECRET", ""),
                return_path: env_or("PAYPAL_RETURN_PATH", "/api/payments/paypal/return"),
                cancel_path: env_or("PAYPAL_CANCEL_PATH", "/api/payments/paypal/cancel"),
            },
        })
    }
}
