use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::schedules::handlers;
use crate::features::schedules::services::ScheduleService;

/// Schedule routes. All of them require the auth middleware, applied by the caller.
pub fn routes(service: Arc<ScheduleService>) -> Router {
    Router::new()
        .route(
            "/api/schedules",
            get(handlers::list_schedules).post(handlers::create_schedule),
        )
        // static segments before /{id}
        .route(
            "/api/schedules/barangay/{barangay}",
            get(handlers::schedules_by_barangay),
        )
        .route("/api/schedules/upcoming", get(handlers::upcoming_schedules))
        .route(
            "/api/schedules/service/{service_type}",
            get(handlers::schedules_by_service_type),
        )
        .route(
            "/api/schedules/{id}",
            get(handlers::get_schedule)
                .put(handlers::update_schedule)
                .delete(handlers::delete_schedule),
        )
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::model::AuthenticatedUser;
    use crate::shared::test_helpers::{citizen_user, official_user, test_pool, with_user};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn server_for(user: AuthenticatedUser) -> TestServer {
        let service = Arc::new(ScheduleService::new(test_pool()));
        TestServer::new(with_user(routes(service), user)).unwrap()
    }

    fn schedule_body() -> Value {
        json!({
            "service_type": "Garbage collection",
            "day_of_week": "Monday",
            "start_time": "08:00:00",
            "end_time": "11:00:00",
            "barangay": "Poblacion"
        })
    }

    #[tokio::test]
    async fn test_citizen_cannot_create_schedule() {
        let response = server_for(citizen_user())
            .post("/api/schedules")
            .json(&schedule_body())
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let body: Value = response.json();
        assert_eq!(body["message"], "Only officials and admins can manage service schedules");
    }

    #[tokio::test]
    async fn test_citizen_cannot_delete_schedule() {
        let response = server_for(citizen_user())
            .delete(&format!("/api/schedules/{}", Uuid::now_v7()))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_rejects_end_before_start() {
        let mut body = schedule_body();
        body["end_time"] = json!("07:00:00");
        let response = server_for(official_user())
            .post("/api/schedules")
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["errors"][0], "End time must be after start time");
    }

    #[tokio::test]
    async fn test_one_off_needs_future_date() {
        let mut body = schedule_body();
        body["recurring"] = json!(false);
        body["next_date"] = json!("2020-01-06");
        let response = server_for(official_user())
            .post("/api/schedules")
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["errors"][0], "Next date must be in the future");
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_time() {
        let mut body = schedule_body();
        body["start_time"] = json!("8:00 AM");
        let response = server_for(official_user())
            .post("/api/schedules")
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upcoming_days_out_of_range() {
        let response = server_for(citizen_user())
            .get("/api/schedules/upcoming")
            .add_query_param("days", 32)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["errors"][0], "Days must be between 1 and 31");
    }
}
