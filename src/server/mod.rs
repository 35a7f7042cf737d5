pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use routes::{account, admin, challenge, practice, progress};
pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/progress", get(progress::get_progress))
        .route("/progress/toggle", post(progress::toggle_progress))
        .route("/auth/register", post(account::register))
        .route("/auth/login", post(account::login))
        .route("/auth/logout", post(account::logout))
        .route("/auth/me", get(account::me))
        .route("/auth/complete-profile", post(account::complete_profile))
        .route("/challenge/status", get(challenge::status))
        .route("/challenge/days", get(challenge::days))
        .route("/challenge/calendar", get(challenge::calendar))
        .route("/practice/check/{handle}", get(practice::check))
        .route("/practice/{handle}", get(practice::profile))
        .route("/practice/{handle}/calendar", get(practice::calendar))
        .route("/admin/students/{sap_id}", get(admin::search_student))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let bind = state.config.server.bind.clone();
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Binding {}", bind))?;
    info!("Listening on {}", bind);
    axum::serve(listener, router(state)).await.context("Server stopped")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::dataset::tests::sample_dataset;
    use crate::config::AppConfig;
    use crate::db::Database;
    use crate::models::{ActivityCalendar, PracticeProfile};
    use crate::practice::{ActivitySource, PracticeError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use chrono::{DateTime, TimeZone, Utc};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const SSO_HEADER: &str = "x-forwarded-email";

    struct StubPractice;

    #[async_trait]
    impl ActivitySource for StubPractice {
        async fn check_handle(&self, handle: &str) -> Result<bool, PracticeError> {
            Ok(matches!(handle, "alice" | "bob" | "outage"))
        }

        /// "alice" has a profile, "outage" finds the site down, anything else is unknown.
        async fn profile(&self, handle: &str) -> Result<PracticeProfile, PracticeError> {
            if handle == "outage" {
                return Err(PracticeError::Unavailable("upstream timed out".into()));
            }
            if handle != "alice" {
                return Err(PracticeError::NotFound(handle.to_string()));
            }
            let mut calendar = ActivityCalendar::default();
            // 2025-02-09 and a day long outside the trailing year
            calendar.activity_by_epoch_day.insert(1_739_059_200, 4);
            calendar.activity_by_epoch_day.insert(1_600_000_000 / 86_400 * 86_400, 9);
            Ok(PracticeProfile {
                username: "alice".into(),
                profile: Value::Null,
                submission_counts_by_difficulty: vec![],
                badges: vec![],
                calendar,
            })
        }
    }

    /// Ten days into the challenge, mid-afternoon local time.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 10, 12, 0, 0).unwrap()
    }

    struct Harness {
        _dir: tempfile::TempDir,
        app: Router,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        let mut config = AppConfig::default();
        config.server.jwt_secret = "router-test-secret".into();
        config.server.admin_emails = vec!["prof@upes.ac.in".into()];
        config.identity.proxy_email_header = Some(SSO_HEADER.into());
        config.identity.allowed_email_domain = Some("upes.ac.in".into());

        let mut state = AppState::new(db, config, Arc::new(sample_dataset()), Arc::new(StubPractice)).unwrap();
        state.now = fixed_now;
        Harness {
            _dir: dir,
            app: router(Arc::new(state)),
        }
    }

    fn sso(method: &str, uri: &str, email: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(SSO_HEADER, email)
            .header(header::CONTENT_TYPE, "application/json");
        match body {
            Some(b) => builder.body(Body::from(b.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn days_of(body: &Value) -> Vec<u64> {
        body["challengeProgress"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["day"].as_u64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn toggle_round_trip_over_http() {
        let h = harness();
        let me = "ana@upes.ac.in";

        let (status, body) = send(&h.app, sso("POST", "/progress/toggle", me, Some(json!({ "day": 3 })))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(days_of(&body), vec![3]);

        let (_, body) = send(&h.app, sso("GET", "/progress", me, None)).await;
        assert_eq!(days_of(&body), vec![3]);

        let (_, body) = send(&h.app, sso("POST", "/progress/toggle", me, Some(json!({ "day": 3 })))).await;
        assert!(days_of(&body).is_empty());
    }

    #[tokio::test]
    async fn bad_day_values_are_rejected_before_the_store() {
        let h = harness();
        let me = "ana@upes.ac.in";
        for payload in [json!({ "day": 0 }), json!({ "day": -4 }), json!({}), json!({ "day": "7" }), json!({ "day": 2.5 })] {
            let (status, _) = send(&h.app, sso("POST", "/progress/toggle", me, Some(payload))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        let (_, body) = send(&h.app, sso("GET", "/progress", me, None)).await;
        assert!(days_of(&body).is_empty());
    }

    #[tokio::test]
    async fn identity_is_required_and_domain_restricted() {
        let h = harness();
        let anonymous = Request::builder().uri("/progress").body(Body::empty()).unwrap();
        assert_eq!(send(&h.app, anonymous).await.0, StatusCode::UNAUTHORIZED);

        let outsider = sso("GET", "/progress", "eve@gmail.com", None);
        assert_eq!(send(&h.app, outsider).await.0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn register_then_login_with_cookie() {
        let h = harness();
        let register = Request::builder()
            .method("POST")
            .uri("/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "name": "Alice",
                    "email": "Alice@Example.com",
                    "sapId": "50001234",
                    "practiceHandle": "alice",
                    "password": "hunter22"
                })
                .to_string(),
            ))
            .unwrap();
        let resp = h.app.clone().oneshot(register).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let me = Request::builder()
            .uri("/auth/me")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&h.app, me).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "alice@example.com");
        assert_eq!(body["profileComplete"], true);
        assert!(body["user"].get("passwordHash").is_none());

        let login = |password: &str| {
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "email": "alice@example.com", "password": password }).to_string()))
                .unwrap()
        };
        assert_eq!(send(&h.app, login("hunter22")).await.0, StatusCode::OK);
        assert_eq!(send(&h.app, login("wrong")).await.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn registration_validates_ids_and_handles() {
        let h = harness();
        let attempt = |sap: &str, handle: &str| {
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "Zed",
                        "email": "zed@upes.ac.in",
                        "sapId": sap,
                        "practiceHandle": handle,
                        "password": "longenough"
                    })
                    .to_string(),
                ))
                .unwrap()
        };
        assert_eq!(send(&h.app, attempt("1234", "alice")).await.0, StatusCode::BAD_REQUEST);
        assert_eq!(send(&h.app, attempt("50001234", "nobody")).await.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sso_user_completes_profile() {
        let h = harness();
        let me = "new@upes.ac.in";
        let (_, body) = send(&h.app, sso("GET", "/auth/me", me, None)).await;
        assert_eq!(body["profileComplete"], false);

        let payload = json!({ "sapId": "50009999", "practiceHandle": "bob" });
        let (status, body) = send(&h.app, sso("POST", "/auth/complete-profile", me, Some(payload))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profileComplete"], true);
        assert_eq!(body["user"]["sapId"], "50009999");

        // a second account cannot claim the same student ID
        let payload = json!({ "sapId": "50009999", "practiceHandle": "alice" });
        let (status, _) = send(&h.app, sso("POST", "/auth/complete-profile", "other@upes.ac.in", Some(payload))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn challenge_views_follow_the_clock() {
        let h = harness();
        let me = "ana@upes.ac.in";
        send(&h.app, sso("POST", "/progress/toggle", me, Some(json!({ "day": 10 })))).await;

        let (status, body) = send(&h.app, sso("GET", "/challenge/status", me, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["unlockedDayCount"], 10);
        assert_eq!(body["today"], 10);
        assert_eq!(body["stats"]["currentStreak"], 1);
        assert_eq!(body["countdown"], "13:30:00");

        let (_, body) = send(&h.app, sso("GET", "/challenge/days", me, None)).await;
        let days = body["days"].as_array().unwrap();
        assert_eq!(days.len(), 10);
        assert_eq!(days[9]["status"], "today");
        assert_eq!(days[9]["completed"], true);

        let (_, body) = send(&h.app, sso("GET", "/challenge/days?search=two%20sum", me, None)).await;
        assert_eq!(body["days"].as_array().unwrap().len(), 1);

        let (_, body) = send(&h.app, sso("GET", "/challenge/calendar", me, None)).await;
        assert_eq!(body["cells"].as_array().unwrap().len(), 371);
    }

    #[tokio::test]
    async fn practice_routes_proxy_the_collaborator() {
        let h = harness();
        let get = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

        let (_, body) = send(&h.app, get("/practice/check/alice")).await;
        assert_eq!(body["valid"], true);
        let (_, body) = send(&h.app, get("/practice/check/mallory")).await;
        assert_eq!(body["valid"], false);

        let (status, body) = send(&h.app, get("/practice/alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["submissionsPastYear"], 4);

        assert_eq!(send(&h.app, get("/practice/ghost")).await.0, StatusCode::NOT_FOUND);

        let (_, body) = send(&h.app, get("/practice/alice/calendar")).await;
        assert_eq!(body["cells"].as_array().unwrap().len(), 371);
    }

    #[tokio::test]
    async fn practice_outage_is_unavailable_not_missing() {
        let h = harness();
        let get = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

        for uri in ["/practice/outage", "/practice/outage/calendar"] {
            let (status, body) = send(&h.app, get(uri)).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
            assert!(!body["error"].as_str().unwrap().is_empty());
        }
        assert_eq!(send(&h.app, get("/practice/ghost/calendar")).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_search_is_gated_and_reports_progress() {
        let h = harness();
        let student = "stu@upes.ac.in";
        let payload = json!({ "sapId": "50001111", "practiceHandle": "alice" });
        send(&h.app, sso("POST", "/auth/complete-profile", student, Some(payload))).await;
        send(&h.app, sso("POST", "/progress/toggle", student, Some(json!({ "day": 1 })))).await;

        let (status, _) = send(&h.app, sso("GET", "/admin/students/50001111", student, None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = "prof@upes.ac.in";
        let (status, body) = send(&h.app, sso("GET", "/admin/students/50001111", admin, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["student"]["email"], student);
        assert_eq!(body["stats"]["completedCount"], 1);
        assert_eq!(body["practiceLinked"], true);

        assert_eq!(body["practice"]["username"], "alice");
        assert!(body["practiceError"].is_null());

        assert_eq!(send(&h.app, sso("GET", "/admin/students/59999999", admin, None)).await.0, StatusCode::NOT_FOUND);
        assert_eq!(send(&h.app, sso("GET", "/admin/students/abc", admin, None)).await.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_report_survives_practice_failures() {
        let h = harness();
        let admin = "prof@upes.ac.in";
        // bob passes the handle check but has no profile upstream
        for (email, sap, handle, retryable) in [
            ("gone@upes.ac.in", "50002222", "bob", false),
            ("down@upes.ac.in", "50003333", "outage", true),
        ] {
            let payload = json!({ "sapId": sap, "practiceHandle": handle });
            let (status, _) = send(&h.app, sso("POST", "/auth/complete-profile", email, Some(payload))).await;
            assert_eq!(status, StatusCode::OK);
            send(&h.app, sso("POST", "/progress/toggle", email, Some(json!({ "day": 2 })))).await;

            let uri = format!("/admin/students/{}", sap);
            let (status, body) = send(&h.app, sso("GET", &uri, admin, None)).await;
            assert_eq!(status, StatusCode::OK, "{}", handle);
            assert_eq!(body["student"]["email"], email);
            assert_eq!(days_of(&body), vec![2]);
            assert_eq!(body["practiceLinked"], true);
            assert!(body["practice"].is_null());
            assert_eq!(body["practiceError"]["retryable"], retryable);
            assert!(!body["practiceError"]["message"].as_str().unwrap().is_empty());
        }
    }
}
