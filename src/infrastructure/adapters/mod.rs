pub mod momo_adapter;
pub mod mysql_donation_repository;
pub mod paypal_adapter;
pub mod vnpay_adapter;

pub use momo_adapter::MomoAdapter;
pub use mysql_donation_repository::MySqlDonationRepository;
pub use paypal_adapter::PaypalAdapter;
pub use vnpay_adapter::VnpayAdapter;
