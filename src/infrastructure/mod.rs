pub mod adapters;
pub mod config;
pub mod signature;

pub use adapters::{MomoAdapter, MySqlDonationRepository, PaypalAdapter, VnpayAdapter};
pub use config::PaymentConfig;
