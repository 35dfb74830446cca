use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{Donation, DonationStatus};
use crate::ports::donation_repository_port::DonationRepositoryPort;

const SELECT_COLUMNS: &str = r#"
    SELECT id, donor_name, amount, currency, message,
           payment_method, payment_txn_id, status,
           created_at, updated_at
    FROM donations
"#;

/// MySQL-backed donation ledger.
#[derive(Clone)]
pub struct MySqlDonationRepository {
    pool: Arc<Pool<MySql>>,
}

impl MySqlDonationRepository {
    pub fn new(pool: Arc<Pool<MySql>>) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(&self, id: Uuid) -> DomainResult<Option<Donation>> {
        let row = sqlx::query_as::<_, DonationRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;
        row.map(DonationRow::into_donation).transpose()
    }
}

#[async_trait]
impl DonationRepositoryPort for MySqlDonationRepository {
    async fn save(&self, donation: &Donation) -> DomainResult<()> {
        let query = r#"
            INSERT INTO donations (
                id, donor_name, amount, currency, message,
                payment_method, payment_txn_id, status,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        sqlx::query(query)
            .bind(donation.id)
            .bind(&donation.donor_name)
            .bind(donation.amount)
            .bind(&donation.currency)
            .bind(&donation.message)
            .bind(donation.payment_method.to_string())
            .bind(&donation.payment_txn_id)
            .bind(donation.status.to_string())
            .bind(donation.created_at)
            .bind(donation.updated_at)
            .execute(self.pool.as_ref())
            .await?;

        debug!(donation_id = %donation.id, "Donation saved");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Donation>> {
        self.fetch_by_id(id).await
    }

    async fn find_by_payment_txn_id(&self, txn_id: &str) -> DomainResult<Option<Donation>> {
        let row = sqlx::query_as::<_, DonationRow>(&format!(
            "{SELECT_COLUMNS} WHERE payment_txn_id = ?"
        ))
        .bind(txn_id)
        .fetch_optional(self.pool.as_ref())
        .await?;
        row.map(DonationRow::into_donation).transpose()
    }

    /// Single-statement conditional update: the status column is only ever
    /// written while the row is still PENDING, which makes racing return and
    /// notify callbacks first-writer-wins without any explicit locking.
    async fn update_status_and_txn(
        &self,
        id: Uuid,
        status: DonationStatus,
        txn_id: Option<&str>,
    ) -> DomainResult<Donation> {
        let updated = sqlx::query(
            r#"
            UPDATE donations
            SET status = ?, payment_txn_id = COALESCE(?, payment_txn_id), updated_at = ?
            WHERE id = ? AND status = 'PENDING'
            "#,
        )
        .bind(status.to_string())
        .bind(txn_id)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool.as_ref())
        .await?
        .rows_affected();

        if updated == 0 {
            // Terminal row (or unknown id). Status stays put; the transaction
            // id may still be recorded when none was previously known.
            if let Some(txn_id) = txn_id.filter(|t| !t.is_empty()) {
                sqlx::query(
                    r#"
                    UPDATE donations
                    SET payment_txn_id = ?, updated_at = ?
                    WHERE id = ? AND (payment_txn_id IS NULL OR payment_txn_id = '')
                    "#,
                )
                .bind(txn_id)
                .bind(Utc::now())
                .bind(id)
                .execute(self.pool.as_ref())
                .await?;
            }
            debug!(donation_id = %id, "Donation already terminal, status untouched");
        }

        self.fetch_by_id(id)
            .await?
            .ok_or_else(|| DomainError::DonationNotFound(id.to_string()))
    }
}

#[derive(sqlx::FromRow)]
struct DonationRow {
    id: Uuid,
    donor_name: String,
    amount: Decimal,
    currency: String,
    message: Option<String>,
    payment_method: String,
    payment_txn_id: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DonationRow {
    fn into_donation(self) -> DomainResult<Donation> {
        Ok(Donation {
            id: self.id,
            donor_name: self.donor_name,
            amount: self.amount,
            currency: self.currency,
            message: self.message,
            payment_method: self.payment_method.parse()?,
            payment_txn_id: self.payment_txn_id,
            status: self.status.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
