pub mod classes;
pub mod conflicts;
pub mod health;
pub mod reschedules;
pub mod sessions;

use crate::{doc::ApiDoc, state::AppState};
use axum::Router;
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Every endpoint, along with the OpenAPI document describing them
pub fn router(state: AppState) -> (Router, utoipa::openapi::OpenApi) {
    OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(health::health))
        .routes(routes!(classes::create_class))
        .routes(routes!(classes::get_class, classes::delete_class))
        .routes(routes!(classes::extend_sessions))
        .routes(routes!(classes::add_participant))
        .routes(routes!(classes::remove_participant))
        .routes(routes!(classes::archive_class))
        .routes(routes!(classes::list_sessions))
        .routes(routes!(classes::list_party_sessions))
        .routes(routes!(sessions::transition))
        .routes(routes!(sessions::mark_attendance, sessions::list_attendance))
        .routes(routes!(sessions::submit_reschedule))
        .routes(routes!(reschedules::list_pending))
        .routes(routes!(reschedules::resolve))
        .routes(routes!(conflicts::check_conflicts))
        .routes(routes!(conflicts::check_assignment))
        .with_state(state)
        .split_for_parts()
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use chrono::{Days, Utc};
    use database::{LogNotifier, SchedulingPolicy, entities::profile};
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ActiveModelTrait, ConnectOptions, Database, IntoActiveModel};
    use serde_json::{Value, json};
    use std::{sync::Arc, time::Duration};
    use tower::ServiceExt;
    use uuid::Uuid;

    struct Harness {
        app: Router,
        admin: Uuid,
        teacher: Uuid,
        student: Uuid,
    }

    async fn harness() -> Harness {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let mut ids = Vec::new();
        for (name, role) in [("Ada", "admin"), ("Tom", "teacher"), ("Sam", "student")] {
            let model = profile::Model {
                id: Uuid::new_v4(),
                display_name: name.to_string(),
                role: role.to_string(),
            };
            ids.push(model.id);
            model.into_active_model().reset_all().insert(&db).await.unwrap();
        }

        let state = AppState {
            db,
            notifier: Arc::new(LogNotifier),
            policy: SchedulingPolicy::default(),
            request_timeout: Duration::from_secs(10),
        };
        let (app, _) = router(state);

        Harness {
            app,
            admin: ids[0],
            teacher: ids[1],
            student: ids[2],
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn class_body(h: &Harness, timezone: &str) -> Value {
        let start = Utc::now().date_naive() + Days::new(7);
        json!({
            "admin_id": h.admin,
            "title": "Algebra",
            "subject": "math",
            "timezone": timezone,
            "start_date": start,
            "end_date": start + Days::new(13),
            "schedule": { "tuesday": { "start": "16:00", "end": "17:00" } },
            "teacher_ids": [h.teacher],
            "student_ids": [h.student],
        })
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness().await;
        let response = h
            .app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_class_and_walk_a_session() {
        let h = harness().await;

        let (status, created) =
            send(&h.app, "POST", "/classes", Some(class_body(&h, "America/New_York"))).await;
        assert_eq!(status, StatusCode::CREATED);
        let sessions = created["sessions"].as_array().unwrap();
        assert_eq!(sessions.len(), 2);
        let class_id = created["class"]["id"].as_str().unwrap().to_string();
        let session_id = sessions[0]["id"].as_str().unwrap().to_string();

        let (status, details) = send(&h.app, "GET", &format!("/classes/{class_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(details["schedule"]["tuesday"]["start"], "16:00");
        assert_eq!(details["participants"].as_array().unwrap().len(), 2);

        // Too early to start, and a scheduled session must be initiated first
        let (status, error) = send(
            &h.app,
            "POST",
            &format!("/sessions/{session_id}/transitions"),
            Some(json!({ "actor_id": h.teacher, "action": "start" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["code"], "precondition_failed");

        let (status, error) = send(
            &h.app,
            "POST",
            &format!("/sessions/{session_id}/transitions"),
            Some(json!({ "actor_id": h.student, "action": "initiate" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error["code"], "permission_denied");

        let (status, session) = send(
            &h.app,
            "POST",
            &format!("/sessions/{session_id}/transitions"),
            Some(json!({ "actor_id": h.student, "action": "cancel" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_error_codes() {
        let h = harness().await;

        let (status, error) =
            send(&h.app, "POST", "/classes", Some(class_body(&h, "Mars/Olympus"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["code"], "validation");

        let mut body = class_body(&h, "Europe/Paris");
        body["admin_id"] = json!(h.teacher);
        let (status, _) = send(&h.app, "POST", "/classes", Some(body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, error) =
            send(&h.app, "GET", &format!("/classes/{}", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["code"], "not_found");

        let (status, _) = send(
            &h.app,
            "POST",
            &format!("/sessions/{}/transitions", Uuid::new_v4()),
            Some(json!({ "actor_id": h.admin, "action": "teleport" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reschedule_round_trip() {
        let h = harness().await;
        let (_, created) =
            send(&h.app, "POST", "/classes", Some(class_body(&h, "Asia/Tokyo"))).await;
        let session_id = created["sessions"][0]["id"].as_str().unwrap().to_string();
        let requested = Utc::now() + chrono::Duration::days(30);

        let (status, request) = send(
            &h.app,
            "POST",
            &format!("/sessions/{session_id}/reschedule-requests"),
            Some(json!({
                "requester_id": h.student,
                "reason": "exam week",
                "requested_start_at": requested,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let request_id = request["id"].as_str().unwrap().to_string();

        let (_, pending) = send(&h.app, "GET", "/reschedule-requests", None).await;
        assert_eq!(pending.as_array().unwrap().len(), 1);

        let (status, resolution) = send(
            &h.app,
            "POST",
            &format!("/reschedule-requests/{request_id}/resolve"),
            Some(json!({ "approver_id": h.admin, "decision": "approve" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resolution["request"]["status"], "approved");
        assert_eq!(resolution["session"]["status"], "scheduled");

        let (_, pending) = send(&h.app, "GET", "/reschedule-requests", None).await;
        assert!(pending.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_check_against_existing_class() {
        let h = harness().await;
        let body = class_body(&h, "America/New_York");
        let (status, _) = send(&h.app, "POST", "/classes", Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, conflicts) = send(
            &h.app,
            "POST",
            "/conflicts/assignment",
            Some(json!({
                "candidate": {
                    "schedule": { "tuesday": { "start": "16:30", "end": "17:30" } },
                    "start_date": body["start_date"],
                    "end_date": body["end_date"],
                    "timezone": "America/New_York",
                },
                "teacher_ids": [h.teacher],
                "student_ids": [],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(conflicts["has_conflicts"], true);
        assert_eq!(conflicts["teachers"].as_array().unwrap().len(), 2);
        assert!(conflicts["students"].as_array().unwrap().is_empty());
    }
}
