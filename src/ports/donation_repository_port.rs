use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::{Donation, DonationStatus};

/// Donation ledger port. The ledger is the only coordination point between
/// the checkout path and the two racing callback channels.
#[async_trait]
pub trait DonationRepositoryPort: Send + Sync {
    /// Persists a freshly created pending donation.
    async fn save(&self, donation: &Donation) -> DomainResult<()>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Donation>>;

    /// Looks a donation up by the provider's transaction reference.
    async fn find_by_payment_txn_id(&self, txn_id: &str) -> DomainResult<Option<Donation>>;

    /// Idempotent status/txn-id merge, atomic per donation row.
    ///
    /// Status is written only while the row is still `PENDING`; on an
    /// already-terminal donation the transaction id may still be recorded
    /// when none was previously known. Unknown ids are `DonationNotFound`.
    async fn update_status_and_txn(
        &self,
        id: Uuid,
        status: DonationStatus,
        txn_id: Option<&str>,
    ) -> DomainResult<Donation>;
}
