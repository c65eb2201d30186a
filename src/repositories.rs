use async_trait::async_trait;

use crate::models::{
    referrals::{NewReferral, Referral, ReferralWithReferrer},
    referrers::{NewReferrer, Referrer, ReferrerStats},
};

#[cfg(test)]
pub mod memory;
pub mod referrals;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    /// A unique key was taken by a concurrent transaction.
    #[error("Unique constraint conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

/// Scoped unit of work over the store.
///
/// Nothing written through a transaction is visible to others until
/// [`ReferralTransaction::commit`] succeeds. Dropping the transaction without
/// committing discards every write made through it.
#[async_trait]
pub trait ReferralTransaction: Send {
    async fn find_referrer_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<Referrer>, StoreError>;

    /// Inserts a referrer with a count of one.
    async fn create_referrer(&mut self, referrer: &NewReferrer) -> Result<Referrer, StoreError>;

    /// Bumps the count by one and overwrites name and phone.
    async fn increment_referrer(
        &mut self,
        id: i32,
        referrer: &NewReferrer,
    ) -> Result<Referrer, StoreError>;

    async fn create_referral(
        &mut self,
        referrer_id: i32,
        referral: &NewReferral,
    ) -> Result<Referral, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ReferralStore: Send + Sync + 'static {
    async fn begin(&self) -> Result<Box<dyn ReferralTransaction>, StoreError>;

    /// All referrals, newest first.
    async fn list_referrals(&self) -> Result<Vec<ReferralWithReferrer>, StoreError>;

    async fn get_referral(&self, id: i32) -> Result<Option<ReferralWithReferrer>, StoreError>;

    async fn get_referrer_stats(&self, id: i32) -> Result<Option<ReferrerStats>, StoreError>;

    async fn update_referral_status(
        &self,
        id: i32,
        status: &str,
    ) -> Result<Option<Referral>, StoreError>;
}
