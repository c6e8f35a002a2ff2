use axum::{extract::State, Json};

use service_core::error::AppError;

use crate::dtos::stats::StatsResponse;
use crate::middleware::AuthUser;
use crate::models::Capability;
use crate::AppState;

pub async fn get_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<StatsResponse>, AppError> {
    auth.0.require(Capability::ViewReports)?;

    let stats = state.stats.collect().await?;
    Ok(Json(stats))
}
