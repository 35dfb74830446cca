pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::Donation;
pub use errors::{DomainError, DomainResult};
pub use value_objects::{CallbackChannel, DonationStatus, PaymentProvider};
