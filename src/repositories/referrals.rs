use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::{ReferralStore, ReferralTransaction, StoreError};
use crate::models::{
    referrals::{
        NewReferral, Referral, ReferralSummary, ReferralWithReferrer, DEFAULT_REFERRAL_STATUS,
    },
    referrers::{NewReferrer, Referrer, ReferrerStats},
};

const REFERRER_COLUMNS: &str = "id, name, email, phone, referral_count";
const REFERRAL_COLUMNS: &str =
    "id, name, email, phone, field_of_work, program, status, created_at, referrer_id";

const JOINED_REFERRAL_QUERY: &str = r#"
    SELECT
        rf.id, rf.name, rf.email, rf.phone, rf.field_of_work, rf.program,
        rf.status, rf.created_at, rf.referrer_id,
        rr.name AS referrer_name,
        rr.email AS referrer_email,
        rr.phone AS referrer_phone,
        rr.referral_count AS referrer_referral_count
    FROM referrals rf
    JOIN referrers rr ON rr.id = rf.referrer_id
"#;

#[derive(sqlx::FromRow)]
struct ReferralRow {
    id: i32,
    name: String,
    email: String,
    phone: Option<String>,
    field_of_work: String,
    program: String,
    status: String,
    created_at: DateTime<Utc>,
    referrer_id: i32,
    referrer_name: String,
    referrer_email: String,
    referrer_phone: Option<String>,
    referrer_referral_count: i32,
}

impl From<ReferralRow> for ReferralWithReferrer {
    fn from(row: ReferralRow) -> Self {
        ReferralWithReferrer {
            referrer: Referrer {
                id: row.referrer_id,
                name: row.referrer_name,
                email: row.referrer_email,
                phone: row.referrer_phone,
                referral_count: row.referrer_referral_count,
            },
            referral: Referral {
                id: row.id,
                name: row.name,
                email: row.email,
                phone: row.phone,
                field_of_work: row.field_of_work,
                program: row.program,
                status: row.status,
                created_at: row.created_at,
                referrer_id: row.referrer_id,
            },
        }
    }
}

#[derive(Clone)]
pub struct ReferralRepository {
    conn: PgPool,
}

impl ReferralRepository {
    pub fn new(conn: PgPool) -> Self {
        ReferralRepository { conn }
    }
}

#[async_trait]
impl ReferralStore for ReferralRepository {
    async fn begin(&self) -> Result<Box<dyn ReferralTransaction>, StoreError> {
        let tx = self.conn.begin().await?;

        Ok(Box::new(PgReferralTransaction { tx }))
    }

    async fn list_referrals(&self) -> Result<Vec<ReferralWithReferrer>, StoreError> {
        let rows = sqlx::query_as::<_, ReferralRow>(&format!(
            "{JOINED_REFERRAL_QUERY} ORDER BY rf.created_at DESC, rf.id DESC"
        ))
        .fetch_all(&self.conn)
        .await?;

        Ok(rows.into_iter().map(ReferralWithReferrer::from).collect())
    }

    async fn get_referral(&self, id: i32) -> Result<Option<ReferralWithReferrer>, StoreError> {
        let row =
            sqlx::query_as::<_, ReferralRow>(&format!("{JOINED_REFERRAL_QUERY} WHERE rf.id = $1"))
                .bind(id)
                .fetch_optional(&self.conn)
                .await?;

        Ok(row.map(ReferralWithReferrer::from))
    }

    async fn get_referrer_stats(&self, id: i32) -> Result<Option<ReferrerStats>, StoreError> {
        let referrer = sqlx::query_as::<_, Referrer>(&format!(
            "SELECT {REFERRER_COLUMNS} FROM referrers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.conn)
        .await?;

        let Some(referrer) = referrer else {
            return Ok(None);
        };

        let referrals = sqlx::query_as::<_, ReferralSummary>(
            r#"SELECT status, program, created_at
            FROM referrals WHERE referrer_id = $1
            ORDER BY created_at DESC, id DESC"#,
        )
        .bind(id)
        .fetch_all(&self.conn)
        .await?;

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
        let referral = sqlx::query_as::<_, Referral>(&format!(
            "UPDATE referrals SET status = $1 WHERE id = $2 RETURNING {REFERRAL_COLUMNS}"
        ))
        .bind(status)
        .bind(id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(referral)
    }
}

pub struct PgReferralTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReferralTransaction for PgReferralTransaction {
    async fn find_referrer_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<Referrer>, StoreError> {
        let referrer = sqlx::query_as::<_, Referrer>(&format!(
            "SELECT {REFERRER_COLUMNS} FROM referrers WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(referrer)
    }

    async fn create_referrer(&mut self, referrer: &NewReferrer) -> Result<Referrer, StoreError> {
        let referrer = sqlx::query_as::<_, Referrer>(&format!(
            r#"INSERT INTO referrers (name, email, phone, referral_count)
            VALUES ($1, $2, $3, 1)
            RETURNING {REFERRER_COLUMNS}"#
        ))
        .bind(&referrer.name)
        .bind(&referrer.email)
        .bind(&referrer.phone)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(referrer)
    }

    async fn increment_referrer(
        &mut self,
        id: i32,
        referrer: &NewReferrer,
    ) -> Result<Referrer, StoreError> {
        let referrer = sqlx::query_as::<_, Referrer>(&format!(
            r#"UPDATE referrers
            SET referral_count = referral_count + 1,
                name = $1,
                phone = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING {REFERRER_COLUMNS}"#
        ))
        .bind(&referrer.name)
        .bind(&referrer.phone)
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(referrer)
    }

    async fn create_referral(
        &mut self,
        referrer_id: i32,
        referral: &NewReferral,
    ) -> Result<Referral, StoreError> {
        let referral = sqlx::query_as::<_, Referral>(&format!(
            r#"INSERT INTO referrals
            (name, email, phone, field_of_work, program, status, referrer_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REFERRAL_COLUMNS}"#
        ))
        .bind(&referral.name)
        .bind(&referral.email)
        .bind(&referral.phone)
        .bind(&referral.field_of_work)
        .bind(&referral.program)
        .bind(DEFAULT_REFERRAL_STATUS)
        .bind(referrer_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(referral)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;

        Ok(())
    }
}
