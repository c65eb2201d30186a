use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::referrers::Referrer;

pub const DEFAULT_REFERRAL_STATUS: &str = "pending";

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub field_of_work: String,
    pub program: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub referrer_id: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewReferral {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub field_of_work: String,
    pub program: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralWithReferrer {
    #[serde(flatten)]
    pub referral: Referral,
    pub referrer: Referrer,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSummary {
    pub status: String,
    pub program: String,
    pub created_at: DateTime<Utc>,
}

/// Raw submission body. Every field is optional so that presence can be
/// reported for all fields at once instead of failing on the first.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSubmission {
    pub referrer_name: Option<String>,
    pub referrer_email: Option<String>,
    pub referrer_phone: Option<String>,
    pub referee_name: Option<String>,
    pub referee_email: Option<String>,
    pub referee_phone: Option<String>,
    pub field_of_work: Option<String>,
    pub program: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}
