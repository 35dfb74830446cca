pub mod dto;
pub mod payment_service;

pub use dto::{CheckoutRequest, CheckoutResponse, ErrorResponse};
pub use payment_service::PaymentService;
