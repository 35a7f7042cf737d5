use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;

use crate::challenge::calendar::{WINDOW_DAYS, epoch_day};
use crate::challenge::build_calendar_grid;
use crate::models::{CalendarGrid, PracticeProfile};
use crate::server::error::AppError;
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSummary {
    #[serde(flatten)]
    pub profile: PracticeProfile,
    pub solved_total: u32,
    pub submissions_past_year: u32,
}

/// Submissions recorded in the trailing year ending on `now`'s UTC day.
pub fn submissions_past_year(profile: &PracticeProfile, now: DateTime<Utc>) -> u32 {
    let end = now.date_naive();
    let from = epoch_day(end - Duration::days(WINDOW_DAYS - 1));
    let to = epoch_day(end);
    profile
        .calendar
        .activity_by_epoch_day
        .range(from..=to)
        .map(|(_, count)| *count)
        .sum()
}

pub async fn check(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let valid = state.practice.check_handle(&handle).await?;
    Ok(Json(json!({ "valid": valid })))
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
) -> Result<Json<PracticeSummary>, AppError> {
    let profile = state.practice.profile(&handle).await?;
    Ok(Json(PracticeSummary {
        solved_total: profile.solved_total(),
        submissions_past_year: submissions_past_year(&profile, (state.now)()),
        profile,
    }))
}

pub async fn calendar(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
) -> Result<Json<CalendarGrid>, AppError> {
    let profile = state.practice.profile(&handle).await?;
    let today = (state.now)().date_naive();
    Ok(Json(build_calendar_grid(&profile.calendar.activity_by_epoch_day, today)))
}
