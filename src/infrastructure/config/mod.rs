pub mod payment_config;

pub use payment_config::{MomoConfig, PaymentConfig, PaypalConfig, VnpayConfig};
