use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::challenge::{DayFilter, TOTAL_DAYS, activity_from_records, build_calendar_grid, derive_stats};
use crate::models::{CalendarGrid, DayView, DerivedStats, completed_days};
use crate::server::auth::CurrentUser;
use crate::server::error::AppError;
use crate::server::state::AppState;
use crate::utils::format::format_countdown;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeStatus {
    pub total_days: u32,
    pub unlocked_day_count: u32,
    /// The most recently unlocked day, if any.
    pub today: Option<u32>,
    pub next_unlock: Option<DateTime<FixedOffset>>,
    pub seconds_until_next_unlock: Option<i64>,
    pub countdown: Option<String>,
    pub stats: DerivedStats,
}

#[derive(Debug, Default, Deserialize)]
pub struct DayQuery {
    pub unit: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DayListing {
    pub units: Vec<String>,
    pub days: Vec<DayView>,
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ChallengeStatus>, AppError> {
    let now = (state.now)();
    let unlocked = state.clock.unlocked_day_count(now);
    let records = state.store(move |db| db.completions(user.id)).await?;
    let seconds = state.clock.seconds_until_next_unlock(now);

    Ok(Json(ChallengeStatus {
        total_days: TOTAL_DAYS,
        unlocked_day_count: unlocked,
        today: (unlocked > 0).then_some(unlocked),
        next_unlock: state.clock.next_unlock(now),
        seconds_until_next_unlock: seconds,
        countdown: seconds.map(format_countdown),
        stats: derive_stats(&completed_days(&records), unlocked),
    }))
}

pub async fn days(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DayQuery>,
) -> Result<Json<DayListing>, AppError> {
    let unlocked = state.unlocked_day_count();
    let records = state.store(move |db| db.completions(user.id)).await?;
    let completed = completed_days(&records);
    let filter = DayFilter {
        unit: query.unit,
        search: query.search,
    };

    let days = state
        .dataset
        .visible(unlocked, &filter)
        .map(|(descriptor, status)| DayView {
            descriptor: descriptor.clone(),
            status,
            completed: completed.contains(&descriptor.day),
        })
        .collect();

    Ok(Json(DayListing {
        units: state.dataset.units(),
        days,
    }))
}

/// Heatmap of the caller's own completions over the trailing year.
pub async fn calendar(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CalendarGrid>, AppError> {
    let today = (state.now)().date_naive();
    let records = state.store(move |db| db.completions(user.id)).await?;
    Ok(Json(build_calendar_grid(&activity_from_records(&records), today)))
}
