use serde::{Deserialize, Serialize};

use super::referrals::ReferralSummary;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Referrer {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub referral_count: i32,
}

/// Values written to a referrer row on every submission, keyed by `email`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewReferrer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerStats {
    #[serde(flatten)]
    pub referrer: Referrer,
    pub referrals: Vec<ReferralSummary>,
}
