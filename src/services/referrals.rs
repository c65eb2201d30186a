use std::sync::Arc;

use super::{
    notifications::{self, Mailer},
    validation::{self, ValidSubmission},
    ServiceError,
};
use crate::{
    models::{
        referrals::{Referral, ReferralSubmission, ReferralWithReferrer},
        referrers::{Referrer, ReferrerStats},
    },
    repositories::{ReferralStore, StoreError},
    settings::FailurePolicy,
};

/// Attempts of the intake transaction when a concurrent submission from the
/// same referrer email wins the insert.
const MAX_SUBMIT_ATTEMPTS: usize = 3;

#[derive(Debug)]
pub struct SubmissionOutcome {
    pub referrer: Referrer,
    pub referral: ReferralWithReferrer,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct ReferralRequestHandler {
    store: Arc<dyn ReferralStore>,
    mailer: Arc<dyn Mailer>,
    admin_email: String,
    failure_policy: FailurePolicy,
}

impl ReferralRequestHandler {
    pub fn new(
        store: Arc<dyn ReferralStore>,
        mailer: Arc<dyn Mailer>,
        admin_email: String,
        failure_policy: FailurePolicy,
    ) -> Self {
        ReferralRequestHandler {
            store,
            mailer,
            admin_email,
            failure_policy,
        }
    }

    pub async fn submit_referral(
        &self,
        submission: ReferralSubmission,
    ) -> Result<SubmissionOutcome, ServiceError> {
        let submission = validation::validate_submission(submission).inspect_err(|e| {
            log::info!("Rejected referral submission: {}", e);
        })?;

        let (referrer, referral) = self.persist_submission(&submission).await?;
        log::info!(
            "Stored referral {} for referrer {} (total referrals: {}).",
            referral.id,
            referrer.id,
            referrer.referral_count
        );

        let report = notifications::notify_submission(
            self.mailer.as_ref(),
            &self.admin_email,
            &referrer,
            &referral,
        )
        .await;

        if !report.is_clean() && self.failure_policy == FailurePolicy::Strict {
            return Err(ServiceError::Notification(format!(
                "referral {} was stored but {}",
                referral.id,
                report.failures.join(" ")
            )));
        }

        Ok(SubmissionOutcome {
            referral: ReferralWithReferrer {
                referral,
                referrer: referrer.clone(),
            },
            referrer,
            warnings: report.failures,
        })
    }

    async fn persist_submission(
        &self,
        submission: &ValidSubmission,
    ) -> Result<(Referrer, Referral), ServiceError> {
        let mut attempt = 1;

        loop {
            match self.try_persist_submission(submission).await {
                Err(StoreError::Conflict(detail)) if attempt < MAX_SUBMIT_ATTEMPTS => {
                    log::warn!(
                        "Referrer {} was created concurrently ({}), retrying attempt {}.",
                        submission.referrer.email,
                        detail,
                        attempt + 1
                    );
                    attempt += 1;
                }
                result => return result.map_err(ServiceError::from),
            }
        }
    }

    /// Find-or-create the referrer and attach a new referral to it, all in
    /// one transaction. Any early return drops the transaction uncommitted.
    async fn try_persist_submission(
        &self,
        submission: &ValidSubmission,
    ) -> Result<(Referrer, Referral), StoreError> {
        let mut tx = self.store.begin().await?;

        let referrer = match tx.find_referrer_by_email(&submission.referrer.email).await? {
            Some(existing) => {
                log::debug!("Found referrer {} for {}.", existing.id, existing.email);
                tx.increment_referrer(existing.id, &submission.referrer)
                    .await?
            }
            None => {
                log::debug!("Creating referrer for {}.", submission.referrer.email);
                tx.create_referrer(&submission.referrer).await?
            }
        };

        let referral = tx
            .create_referral(referrer.id, &submission.referral)
            .await?;
        tx.commit().await?;

        Ok((referrer, referral))
    }

    pub async fn list_referrals(&self) -> Result<Vec<ReferralWithReferrer>, ServiceError> {
        Ok(self.store.list_referrals().await?)
    }

    pub async fn get_referral(&self, id: i32) -> Result<ReferralWithReferrer, ServiceError> {
        self.store
            .get_referral(id)
            .await?
            .ok_or(ServiceError::NotFound("Referral"))
    }

    pub async fn get_referrer_stats(&self, id: i32) -> Result<ReferrerStats, ServiceError> {
        self.store
            .get_referrer_stats(id)
            .await?
            .ok_or(ServiceError::NotFound("Referrer"))
    }

    pub async fn update_referral_status(
        &self,
        id: i32,
        status: Option<String>,
    ) -> Result<Referral, ServiceError> {
        let status = validation::validate_status(status)?;

        let referral = self
            .store
            .update_referral_status(id, &status)
            .await?
            .ok_or(ServiceError::NotFound("Referral"))?;
        log::info!("Referral {} status set to {}.", referral.id, referral.status);

        Ok(referral)
    }
}
