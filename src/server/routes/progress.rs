use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::models::ProgressResponse;
use crate::server::auth::CurrentUser;
use crate::server::error::AppError;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub day: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub success: bool,
    #[serde(flatten)]
    pub progress: ProgressResponse,
}

/// Day numbers start at 1; anything else never reaches the store.
pub fn validate_day(day: Option<i64>) -> Result<u32, AppError> {
    let day = day.ok_or_else(|| AppError::Validation("day is required".into()))?;
    if day < 1 {
        return Err(AppError::Validation("day must be a positive integer".into()));
    }
    u32::try_from(day).map_err(|_| AppError::Validation("day is out of range".into()))
}

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ProgressResponse>, AppError> {
    let records = state.store(move |db| db.completions(user.id)).await?;
    Ok(Json(records.into()))
}

pub async fn toggle_progress(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<Json<ToggleResponse>, AppError> {
    let Json(request) = payload?;
    let day = validate_day(request.day)?;
    let now = (state.now)();

    let records = state.store(move |db| db.toggle_day(user.id, day, now)).await?;
    let completed = records.iter().any(|r| r.day == day);
    info!(
        "User {} {} day {}",
        user.id,
        if completed { "completed" } else { "reopened" },
        day
    );

    Ok(Json(ToggleResponse {
        success: true,
        progress: records.into(),
    }))
}
