use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};

use super::{referrals::path_id, AppState};
use crate::{models::referrers::ReferrerStats, services::ServiceError};

pub(super) async fn get_referrer_stats(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<ReferrerStats>, ServiceError> {
    let id = path_id(id)?;

    Ok(Json(state.referrals.get_referrer_stats(id).await?))
}
