use thiserror::Error;

/// Error taxonomy for the donation core.
///
/// Verification problems on callbacks (bad signature, malformed reference)
/// never surface through this type across the callback boundary; adapters
/// downgrade them to a `FAILED` payment result so the ledger always receives
/// a decision and the provider always receives its acknowledgment.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unsupported payment method: {0}")]
    UnsupportedProvider(String),

    #[error("Donation not found: {0}")]
    DonationNotFound(String),

    /// Provider disabled or credential missing. Fatal, never retried.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Gateway-reported failure during initiation or capture. The caller
    /// decides whether to retry the whole checkout.
    #[error("Payment provider error: {0}")]
    ProviderError(String),

    #[error("Signature error: {0}")]
    SignatureError(String),

    /// Callback reference that cannot identify a donation. Adapters convert
    /// this to a `FAILED` result before it reaches the processor.
    #[error("Invalid payment reference: {0}")]
    InvalidReference(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
