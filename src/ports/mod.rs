pub mod donation_repository_port;
pub mod payment_gateway_port;

pub use donation_repository_port::DonationRepositoryPort;
pub use payment_gateway_port::{
    CheckoutContext, PaymentGatewayPort, PaymentInitiation, PaymentResult,
};
