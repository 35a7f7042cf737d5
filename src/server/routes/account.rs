use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};

use crate::db::repository::UserRepo;
use crate::models::user::{is_valid_sap_id, normalize_email};
use crate::models::{NewUser, User};
use crate::server::auth::{CurrentUser, hash_password, removal_cookie, verify_password};
use crate::server::error::AppError;
use crate::server::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub sap_id: String,
    #[serde(default)]
    pub practice_handle: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteProfileRequest {
    pub sap_id: String,
    pub practice_handle: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub user: User,
    pub profile_complete: bool,
    pub is_admin: bool,
}

impl AccountResponse {
    fn new(state: &AppState, user: User) -> Self {
        Self {
            profile_complete: user.profile_complete(),
            is_admin: state.config.server.is_admin(&user.email),
            user,
        }
    }
}

fn non_blank(value: &str, field: &str) -> Result<String, AppError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(v.to_string())
}

fn checked_sap_id(raw: &str) -> Result<String, AppError> {
    let sap = raw.trim();
    if !is_valid_sap_id(sap) {
        return Err(AppError::Validation("SAP ID must be exactly 8 digits".into()));
    }
    Ok(sap.to_string())
}

/// The handle must be free locally and exist on the practice site.
async fn checked_handle(state: &AppState, raw: &str, owner: Option<i64>) -> Result<String, AppError> {
    let handle = non_blank(raw, "practice handle")?;
    let lookup = handle.clone();
    let taken = state
        .store(move |db| db.with_conn(|conn| UserRepo::handle_taken(conn, &lookup, owner)))
        .await?;
    if taken {
        return Err(AppError::Conflict("This practice handle is already linked to another account".into()));
    }
    if !state.practice.check_handle(&handle).await? {
        return Err(AppError::Validation(format!("Practice handle '{}' does not exist", handle)));
    }
    Ok(handle)
}

async fn ensure_sap_free(state: &AppState, sap_id: &str, owner: Option<i64>) -> Result<(), AppError> {
    let lookup = sap_id.to_string();
    let taken = state
        .store(move |db| db.with_conn(|conn| UserRepo::sap_taken(conn, &lookup, owner)))
        .await?;
    if taken {
        return Err(AppError::Conflict("This SAP ID is already registered".into()));
    }
    Ok(())
}

fn signed_in(state: &AppState, jar: CookieJar, user: User) -> Result<(CookieJar, Json<AccountResponse>), AppError> {
    // expiry is checked against the wall clock
    let token = state.keys.issue(&user, Utc::now())?;
    let jar = jar.add(state.keys.session_cookie(token)?);
    Ok((jar, Json(AccountResponse::new(state, user))))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AccountResponse>), AppError> {
    let Json(req) = payload?;
    let name = non_blank(&req.name, "name")?;
    let email = normalize_email(&req.email);
    if !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    let sap_id = checked_sap_id(&req.sap_id)?;
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    ensure_sap_free(&state, &sap_id, None).await?;
    let practice_handle = match req.practice_handle.as_deref().map(str::trim) {
        Some(h) if !h.is_empty() => Some(checked_handle(&state, h, None).await?),
        _ => None,
    };

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
    let new_user = NewUser {
        name,
        email,
        sap_id: Some(sap_id),
        practice_handle,
        password_hash: Some(password_hash),
    };
    let now = (state.now)();
    let user = state
        .store(move |db| db.with_conn(|conn| UserRepo::create(conn, &new_user, now)))
        .await?;
    info!("Registered user {}", user.id);

    signed_in(&state, jar, user)
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AccountResponse>), AppError> {
    let Json(req) = payload?;
    let email = normalize_email(&req.email);
    let user = state
        .store(move |db| db.with_conn(|conn| UserRepo::find_by_email(conn, &email)))
        .await?
        .ok_or(AppError::Unauthorized)?;

    // SSO-provisioned accounts have no password
    let Some(hash) = user.password_hash.clone() else {
        return Err(AppError::Unauthorized);
    };
    let password = req.password;
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?;
    if !ok {
        return Err(AppError::Unauthorized);
    }

    info!("User {} logged in", user.id);
    signed_in(&state, jar, user)
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    (jar.remove(removal_cookie()), Json(serde_json::json!({ "success": true })))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Json<AccountResponse> {
    Json(AccountResponse::new(&state, user))
}

pub async fn complete_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<CompleteProfileRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>, AppError> {
    let Json(req) = payload?;
    let sap_id = checked_sap_id(&req.sap_id)?;
    ensure_sap_free(&state, &sap_id, Some(user.id)).await?;
    let handle = checked_handle(&state, &req.practice_handle, Some(user.id)).await?;

    let id = user.id;
    let updated = state
        .store(move |db| db.with_conn(|conn| UserRepo::update_profile(conn, id, &sap_id, &handle)))
        .await?;
    info!("User {} completed their profile", id);
    Ok(Json(AccountResponse::new(&state, updated)))
}
