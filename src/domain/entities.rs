use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{DonationStatus, PaymentProvider};

/// A single monetary contribution, tracked from initiation to terminal outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    /// Internal id, generated at creation and used as the cross-reference key
    /// towards every provider.
    pub id: Uuid,

    pub donor_name: String,

    /// Exact decimal amount, never mutated after creation.
    pub amount: Decimal,

    /// ISO-style 3-letter code.
    pub currency: String,

    pub message: Option<String>,

    /// Provider chosen at checkout, fixed for the donation's lifetime.
    pub payment_method: PaymentProvider,

    /// Provider-side transaction/order reference. Set once by the checkout
    /// orchestrator; a callback may replace it only with a more specific id.
    pub payment_txn_id: Option<String>,

    pub status: DonationStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Donation {
    pub fn new(
        donor_name: String,
        amount: Decimal,
        currency: String,
        message: Option<String>,
        payment_method: PaymentProvider,
    ) -> DomainResult<Self> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::ValidationError(
                "Amount must be greater than 0".to_string(),
            ));
        }

        // Character counts, to match the column widths of the ledger.
        if donor_name.is_empty() || donor_name.chars().count() > 150 {
            return Err(DomainError::ValidationError(
                "Donor name must be 1-150 characters".to_string(),
            ));
        }

        let currency = currency.trim().to_ascii_uppercase();
        if currency.len() != 3 {
            return Err(DomainError::ValidationError(
                "Currency must be a 3-letter code".to_string(),
            ));
        }

        if let Some(ref message) = message {
            if message.chars().count() > 500 {
                return Err(DomainError::ValidationError(
                    "Message must be at most 500 characters".to_string(),
                ));
            }
        }

        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            donor_name,
            amount,
            currency,
            message,
            payment_method,
            payment_txn_id: None,
            status: DonationStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Idempotent merge of a callback outcome. Status moves only out of
    /// `Pending`; on an already-terminal donation only transaction-id
    /// refinement is possible, and only when no id was previously known.
    ///
    /// Returns `true` when anything changed. The MySQL repository applies
    /// the same rule atomically in SQL; this method is the in-memory
    /// reference used by tests and by the in-process ledger double.
    pub fn apply_payment_result(
        &mut self,
        status: DonationStatus,
        payment_txn_id: Option<&str>,
    ) -> bool {
        let mut changed = false;

        if self.status == DonationStatus::Pending {
            if self.status != status {
                self.status = status;
                changed = true;
            }
            if let Some(txn_id) = payment_txn_id {
                if !txn_id.is_empty() && self.payment_txn_id.as_deref() != Some(txn_id) {
                    self.payment_txn_id = Some(txn_id.to_string());
                    changed = true;
                }
            }
        } else if self.payment_txn_id.as_deref().unwrap_or("").is_empty() {
            if let Some(txn_id) = payment_txn_id {
                if !txn_id.is_empty() {
                    self.payment_txn_id = Some(txn_id.to_string());
                    changed = true;
                }
            }
        }

        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn donation() -> Donation {
        Donation::new(
            "Alice".to_string(),
            dec!(50000),
            "VND".to_string(),
            Some("Keep writing".to_string()),
            PaymentProvider::Momo,
        )
        .unwrap()
    }

    #[test]
    fn test_new_donation_is_pending() {
        let d = donation();
        assert_eq!(d.status, DonationStatus::Pending);
        assert!(d.payment_txn_id.is_none());
        assert!(!d.is_terminal());
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let result = Donation::new(
            "Alice".to_string(),
            dec!(0),
            "VND".to_string(),
            None,
            PaymentProvider::Bank,
        );
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_name_limit_counts_characters_not_bytes() {
        // 125 characters but 167 bytes.
        let name = "Nguyễn Thị Ánh Tuyết ".repeat(6).trim_end().to_string();
        assert!(name.chars().count() <= 150);
        assert!(name.len() > 150);
        let result = Donation::new(
            name,
            dec!(10),
            "VND".to_string(),
            None,
            PaymentProvider::Bank,
        );
        assert!(result.is_ok());

        let result = Donation::new(
            "a".repeat(151),
            dec!(10),
            "VND".to_string(),
            None,
            PaymentProvider::Bank,
        );
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_bad_currency() {
        let result = Donation::new(
            "Alice".to_string(),
            dec!(10),
            "DONG".to_string(),
            None,
            PaymentProvider::Bank,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_first_terminal_result_wins() {
        let mut d = donation();
        assert!(d.apply_payment_result(DonationStatus::Success, Some("TX1")));
        assert_eq!(d.status, DonationStatus::Success);

        // The racing second channel degrades to a no-op on status.
        assert!(!d.apply_payment_result(DonationStatus::Failed, Some("TX2")));
        assert_eq!(d.status, DonationStatus::Success);
        assert_eq!(d.payment_txn_id.as_deref(), Some("TX1"));
    }

    #[test]
    fn test_failed_is_also_terminal() {
        let mut d = donation();
        d.apply_payment_result(DonationStatus::Failed, None);
        assert!(!d.apply_payment_result(DonationStatus::Success, None));
        assert_eq!(d.status, DonationStatus::Failed);
    }

    #[test]
    fn test_txn_id_refinement_on_terminal_without_id() {
        let mut d = donation();
        d.apply_payment_result(DonationStatus::Success, None);
        assert!(d.payment_txn_id.is_none());

        // A replayed callback may still fill in the missing reference.
        assert!(d.apply_payment_result(DonationStatus::Failed, Some("999")));
        assert_eq!(d.status, DonationStatus::Success);
        assert_eq!(d.payment_txn_id.as_deref(), Some("999"));
    }
}
