use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::alerts::handlers;
use crate::features::alerts::services::AlertService;

/// Alert routes. All of them require the auth middleware, applied by the caller.
pub fn routes(service: Arc<AlertService>) -> Router {
    Router::new()
        .route(
            "/api/alerts",
            get(handlers::list_alerts).post(handlers::create_alert),
        )
        // before /{id} so "unread-count" is not read as an id
        .route("/api/alerts/unread-count", get(handlers::unread_count))
        .route(
            "/api/alerts/{id}",
            get(handlers::get_alert)
                .put(handlers::update_alert)
                .delete(handlers::delete_alert),
        )
        .route("/api/alerts/{id}/read", post(handlers::mark_alert_read))
        .route("/api/alerts/{id}/stats", get(handlers::alert_stats))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::model::AuthenticatedUser;
    use crate::features::users::UserService;
    use crate::shared::test_helpers::{
        citizen_user, official_user, test_image_store, test_pool, with_user,
    };
    use axum::http::StatusCode;
    use axum_test::multipart::MultipartForm;
    use axum_test::TestServer;
    use serde_json::Value;

    fn server_for(user: AuthenticatedUser) -> TestServer {
        let service = Arc::new(AlertService::new(
            test_pool(),
            Arc::new(UserService::new(test_pool())),
            test_image_store(),
        ));
        TestServer::new(with_user(routes(service), user)).unwrap()
    }

    #[tokio::test]
    async fn test_citizen_cannot_create_alert() {
        let form = MultipartForm::new()
            .add_text("title", "Water interruption")
            .add_text("body", "From 8AM to 5PM")
            .add_text("category", "announcement");
        let response = server_for(citizen_user())
            .post("/api/alerts")
            .multipart(form)
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let body: Value = response.json();
        assert_eq!(body["message"], "Only officials and admins can manage alerts");
    }

    #[tokio::test]
    async fn test_staff_create_validates_form() {
        let form = MultipartForm::new()
            .add_text("title", "Hi")
            .add_text("body", "Short title")
            .add_text("category", "weather");
        let response = server_for(official_user())
            .post("/api/alerts")
            .multipart(form)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["message"], "Title must be between 3 and 100 characters");
    }

    #[tokio::test]
    async fn test_staff_create_rejects_end_before_start() {
        let form = MultipartForm::new()
            .add_text("title", "Road closure")
            .add_text("body", "Parade route")
            .add_text("category", "traffic")
            .add_text("start_date", "2030-05-10")
            .add_text("end_date", "2030-05-01");
        let response = server_for(official_user())
            .post("/api/alerts")
            .multipart(form)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["message"], "End date must be after start date");
    }

    #[tokio::test]
    async fn test_invalid_query_is_bad_request() {
        let response = server_for(citizen_user())
            .get("/api/alerts")
            .add_query_param("category", "gossip")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
