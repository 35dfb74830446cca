use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;

/// Donation lifecycle status. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DonationStatus {
    Pending,
    Success,
    Failed,
}

impl DonationStatus {
    /// Terminal states absorb any later callback.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DonationStatus::Success | DonationStatus::Failed)
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DonationStatus::Pending => write!(f, "PENDING"),
            DonationStatus::Success => write!(f, "SUCCESS"),
            DonationStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for DonationStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(DonationStatus::Pending),
            "SUCCESS" => Ok(DonationStatus::Success),
            "FAILED" => Ok(DonationStatus::Failed),
            other => Err(DomainError::ValidationError(format!(
                "Unknown donation status: {other}"
            ))),
        }
    }
}

/// Payment provider selected at checkout, fixed for the donation's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProvider {
    Momo,
    Bank,
    Paypal,
}

impl PaymentProvider {
    /// Normalizes a client-supplied method string (trim + uppercase).
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MOMO" => Ok(PaymentProvider::Momo),
            "BANK" => Ok(PaymentProvider::Bank),
            "PAYPAL" => Ok(PaymentProvider::Paypal),
            other => Err(DomainError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentProvider::Momo => write!(f, "MOMO"),
            PaymentProvider::Bank => write!(f, "BANK"),
            PaymentProvider::Paypal => write!(f, "PAYPAL"),
        }
    }
}

impl FromStr for PaymentProvider {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PaymentProvider::parse(value)
    }
}

/// Which of the callback paths a payload arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackChannel {
    /// Browser redirect after the payer leaves the gateway.
    Return,
    /// Server-to-server webhook.
    Notify,
    /// Explicit user cancellation (OAuth-capture provider only).
    Cancel,
}

impl fmt::Display for CallbackChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackChannel::Return => write!(f, "return"),
            CallbackChannel::Notify => write!(f, "notify"),
            CallbackChannel::Cancel => write!(f, "cancel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse_normalizes_case() {
        assert_eq!(
            PaymentProvider::parse("paypal").unwrap(),
            PaymentProvider::Paypal
        );
        assert_eq!(
            PaymentProvider::parse("  MoMo ").unwrap(),
            PaymentProvider::Momo
        );
        assert!(PaymentProvider::parse("STRIPE").is_err());
    }

    #[test]
    fn test_status_terminality() {
        assert!(!DonationStatus::Pending.is_terminal());
        assert!(DonationStatus::Success.is_terminal());
        assert!(DonationStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            DonationStatus::Pending,
            DonationStatus::Success,
            DonationStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<DonationStatus>().unwrap(), status);
        }
    }
}
