use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{ReferralStore, ReferralTransaction, StoreError};
use crate::models::{
    referrals::{
        NewReferral, Referral, ReferralSummary, ReferralWithReferrer, DEFAULT_REFERRAL_STATUS,
    },
    referrers::{NewReferrer, Referrer, ReferrerStats},
};

#[derive(Clone, Default)]
pub struct MemoryState {
    pub referrers: Vec<Referrer>,
    pub referrals: Vec<Referral>,
    ticks: i64,
}

/// In-memory store. A transaction holds the state lock until it is
/// committed or dropped, so transactions are fully serialized.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    pending_conflicts: Arc<AtomicUsize>,
    fail_referral_inserts: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` referrer inserts fail with a uniqueness conflict.
    pub fn inject_conflicts(&self, count: usize) {
        self.pending_conflicts.store(count, Ordering::SeqCst);
    }

    pub fn fail_referral_inserts(&self, fail: bool) {
        self.fail_referral_inserts.store(fail, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    fn joined(state: &MemoryState, referral: &Referral) -> Option<ReferralWithReferrer> {
        state
            .referrers
            .iter()
            .find(|r| r.id == referral.referrer_id)
            .map(|referrer| ReferralWithReferrer {
                referral: referral.clone(),
                referrer: referrer.clone(),
            })
    }
}

#[async_trait]
impl ReferralStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn ReferralTransaction>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();

        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            pending_conflicts: self.pending_conflicts.clone(),
            fail_referral_inserts: self.fail_referral_inserts.load(Ordering::SeqCst),
        }))
    }

    async fn list_referrals(&self) -> Result<Vec<ReferralWithReferrer>, StoreError> {
        let state = self.state.lock().await;
        let mut referrals: Vec<ReferralWithReferrer> = state
            .referrals
            .iter()
            .filter_map(|r| Self::joined(&state, r))
            .collect();
        referrals.sort_by(|a, b| {
            (b.referral.created_at, b.referral.id).cmp(&(a.referral.created_at, a.referral.id))
        });

        Ok(referrals)
    }

    async fn get_referral(&self, id: i32) -> Result<Option<ReferralWithReferrer>, StoreError> {
        let state = self.state.lock().await;

        Ok(state
            .referrals
            .iter()
            .find(|r| r.id == id)
            .and_then(|r| Self::joined(&state, r)))
    }

    async fn get_referrer_stats(&self, id: i32) -> Result<Option<ReferrerStats>, StoreError> {
        let state = self.state.lock().await;
        let Some(referrer) = state.referrers.iter().find(|r| r.id == id).cloned() else {
            return Ok(None);
        };

        let mut owned: Vec<&Referral> = state
            .referrals
            .iter()
            .filter(|r| r.referrer_id == id)
            .collect();
        owned.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let referrals = owned
            .into_iter()
            .map(|r| ReferralSummary {
                status: r.status.clone(),
                program: r.program.clone(),
                created_at: r.created_at,
            })
            .collect();

        Ok(Some(ReferrerStats {
            referrer,
            referrals,
        }))
    }

    async fn update_referral_status(
        &self,
        id: i32,
        status: &str,
    ) -> Result<Option<Referral>, StoreError> {
        let mut state = self.state.lock().await;

        Ok(state.referrals.iter_mut().find(|r| r.id == id).map(|r| {
            r.status = status.to_string();
            r.clone()
        }))
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    pending_conflicts: Arc<AtomicUsize>,
    fail_referral_inserts: bool,
}

#[async_trait]
impl ReferralTransaction for MemoryTransaction {
    async fn find_referrer_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<Referrer>, StoreError> {
        Ok(self
            .working
            .referrers
            .iter()
            .find(|r| r.email == email)
            .cloned())
    }

    async fn create_referrer(&mut self, referrer: &NewReferrer) -> Result<Referrer, StoreError> {
        let conflicted = self
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflicted || self.working.referrers.iter().any(|r| r.email == referrer.email) {
            return Err(StoreError::Conflict(format!(
                "referrer email {} already exists",
                referrer.email
            )));
        }

        let created = Referrer {
            id: self.working.referrers.len() as i32 + 1,
            name: referrer.name.clone(),
            email: referrer.email.clone(),
            phone: referrer.phone.clone(),
            referral_count: 1,
        };
        self.working.referrers.push(created.clone());

        Ok(created)
    }

    async fn increment_referrer(
        &mut self,
        id: i32,
        referrer: &NewReferrer,
    ) -> Result<Referrer, StoreError> {
        let existing = self
            .working
            .referrers
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::Database(format!("referrer {} not found", id)))?;

        existing.referral_count += 1;
        existing.name = referrer.name.clone();
        existing.phone = referrer.phone.clone();

        Ok(existing.clone())
    }

    async fn create_referral(
        &mut self,
        referrer_id: i32,
        referral: &NewReferral,
    ) -> Result<Referral, StoreError> {
        if self.fail_referral_inserts {
            return Err(StoreError::Database("referral insert failed".to_string()));
        }

        // Distinct, increasing timestamps keep newest-first ordering stable.
        self.working.ticks += 1;
        let created = Referral {
            id: self.working.referrals.len() as i32 + 1,
            name: referral.name.clone(),
            email: referral.email.clone(),
            phone: referral.phone.clone(),
            field_of_work: referral.field_of_work.clone(),
            program: referral.program.clone(),
            status: DEFAULT_REFERRAL_STATUS.to_string(),
            created_at: Utc::now() + Duration::milliseconds(self.working.ticks),
            referrer_id,
        };
        self.working.referrals.push(created.clone());

        Ok(created)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;

        Ok(())
    }
}
