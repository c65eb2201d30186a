use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use super::AppState;
use crate::{
    models::{
        referrals::{Referral, ReferralSubmission, ReferralWithReferrer, StatusUpdate},
        referrers::Referrer,
    },
    services::ServiceError,
};

#[derive(Serialize)]
pub(super) struct SubmissionData {
    referrer: Referrer,
    referral: ReferralWithReferrer,
}

#[derive(Serialize)]
pub(super) struct SubmissionResponse {
    message: &'static str,
    data: SubmissionData,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

pub(super) fn path_id(id: Result<Path<i32>, PathRejection>) -> Result<i32, ServiceError> {
    id.map(|Path(id)| id)
        .map_err(|_| ServiceError::Validation("Invalid id".to_string()))
}

fn request_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    body.map(|Json(body)| body).map_err(|rejection| {
        ServiceError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    })
}

pub(super) async fn submit_referral(
    State(state): State<AppState>,
    body: Result<Json<ReferralSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ServiceError> {
    // A body sent without a JSON content type is read as an empty submission,
    // so the caller still gets the list of required fields.
    let submission = match body {
        Err(JsonRejection::MissingJsonContentType(_)) => ReferralSubmission::default(),
        body => request_body(body)?,
    };
    log::debug!("Received referral submission: {:?}", submission);

    let outcome = state.referrals.submit_referral(submission).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            message: "Referral submitted successfully",
            data: SubmissionData {
                referrer: outcome.referrer,
                referral: outcome.referral,
            },
            warnings: outcome.warnings,
        }),
    ))
}

pub(super) async fn list_referrals(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReferralWithReferrer>>, ServiceError> {
    Ok(Json(state.referrals.list_referrals().await?))
}

pub(super) async fn get_referral(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<ReferralWithReferrer>, ServiceError> {
    let id = path_id(id)?;

    Ok(Json(state.referrals.get_referral(id).await?))
}

pub(super) async fn update_referral_status(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<Referral>, ServiceError> {
    let id = path_id(id)?;
    let update = request_body(body)?;

    Ok(Json(
        state
            .referrals
            .update_referral_status(id, update.status)
            .await?,
    ))
}
