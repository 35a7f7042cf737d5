//! Caller identity: signed session tokens, password hashing, and the
//! extractors that resolve a request to a stored user.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::error::AppError;
use super::state::AppState;
use crate::config::ServerConfig;
use crate::db::repository::UserRepo;
use crate::models::User;
use crate::models::user::normalize_email;

pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub exp: usize,
}

pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    secure_cookies: bool,
}

impl AuthKeys {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: Duration::hours(config.token_ttl_hours),
            secure_cookies: config.secure_cookies,
        }
    }

    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            exp: (now + self.ttl).timestamp().max(0) as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("signing token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Option<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!("Rejected session token: {}", e);
                None
            }
        }
    }

    pub fn session_cookie(&self, token: String) -> Result<Cookie<'static>, AppError> {
        let secure = if self.secure_cookies { "; Secure" } else { "" };
        let raw = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            TOKEN_COOKIE,
            token,
            self.ttl.num_seconds(),
            secure
        );
        Cookie::parse(raw).map_err(|e| AppError::Internal(format!("building cookie: {}", e)))
    }
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::from(TOKEN_COOKIE);
    cookie.set_path("/");
    cookie
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("hashing password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &Option<String>) -> Option<&'a str> {
    let name = name.as_deref()?;
    headers
        .get(name)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// The authenticated caller. Resolved from a session token (cookie first,
/// then bearer) or, failing that, from the SSO proxy's identity header.
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .or_else(|| bearer_token(&parts.headers).map(str::to_string));

        if let Some(claims) = token.as_deref().and_then(|t| state.keys.verify(t)) {
            let user = state
                .store(move |db| db.with_conn(|conn| UserRepo::find_by_id(conn, claims.sub)))
                .await?;
            // a valid token for a deleted account
            return user.map(CurrentUser).ok_or(AppError::Unauthorized);
        }

        let identity = &state.config.identity;
        let Some(raw_email) = header_value(&parts.headers, &identity.proxy_email_header) else {
            return Err(AppError::Unauthorized);
        };
        let email = normalize_email(raw_email);
        if !identity.email_allowed(&email) {
            return Err(AppError::Forbidden("Please use your institutional email".into()));
        }
        let name = header_value(&parts.headers, &identity.proxy_name_header)
            .map(str::to_string)
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        let now = (state.now)();

        let user = state
            .store(move |db| {
                db.with_conn(|conn| UserRepo::find_or_create_by_email(conn, &email, &name, now))
            })
            .await?;
        info!("SSO identity resolved to user {}", user.id);
        Ok(CurrentUser(user))
    }
}

/// A caller whose email is on the configured admin list.
pub struct AdminUser(pub User);

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !state.config.server.is_admin(&user.email) {
            return Err(AppError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}
