use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use log::{info, warn};
use serde::Serialize;

use crate::challenge::derive_stats;
use crate::db::repository::{ProgressRepo, UserRepo};
use crate::models::user::is_valid_sap_id;
use crate::models::{CompletionRecord, DerivedStats, PracticeProfile, User, completed_days};
use crate::server::auth::AdminUser;
use crate::server::error::AppError;
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub student: User,
    pub challenge_progress: Vec<CompletionRecord>,
    pub stats: DerivedStats,
    pub practice_linked: bool,
    pub practice: Option<PracticeProfile>,
    pub practice_error: Option<PracticeIssue>,
}

/// Why a linked practice profile is missing from a report.
#[derive(Debug, Serialize)]
pub struct PracticeIssue {
    pub message: String,
    pub retryable: bool,
}

pub async fn search_student(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(sap_id): Path<String>,
) -> Result<Json<StudentReport>, AppError> {
    let sap_id = sap_id.trim().to_string();
    if !is_valid_sap_id(&sap_id) {
        return Err(AppError::Validation("SAP ID must be exactly 8 digits".into()));
    }
    info!("Admin {} looked up student {}", admin.id, sap_id);

    let lookup = sap_id.clone();
    let (student, records) = state
        .store(move |db| {
            db.with_conn(|conn| {
                let Some(student) = UserRepo::find_by_sap_id(conn, &lookup)? else {
                    return Ok(None);
                };
                let records = ProgressRepo::get_completed(conn, student.id)?;
                Ok(Some((student, records)))
            })
        })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No student with SAP ID {}", sap_id)))?;

    // the report stands on the store alone; practice data is best effort
    let (practice, practice_error) = match student.practice_handle.as_deref() {
        Some(handle) => match state.practice.profile(handle).await {
            Ok(profile) => (Some(profile), None),
            Err(e) => {
                warn!("Practice profile for student {} unavailable: {}", student.id, e);
                let issue = PracticeIssue {
                    retryable: e.is_retryable(),
                    message: e.to_string(),
                };
                (None, Some(issue))
            }
        },
        None => (None, None),
    };
    let stats = derive_stats(&completed_days(&records), state.unlocked_day_count());

    Ok(Json(StudentReport {
        practice_linked: student.practice_handle.is_some(),
        student,
        challenge_progress: records,
        stats,
        practice,
        practice_error,
    }))
}
