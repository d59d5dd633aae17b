use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::features::reports::handlers;
use crate::features::reports::services::ReportService;

/// Report routes. All of them require the auth middleware, applied by the caller.
pub fn routes(service: Arc<ReportService>) -> Router {
    Router::new()
        .route(
            "/api/reports",
            get(handlers::list_reports).post(handlers::create_report),
        )
        // before /{id} so "stats" is not read as an id
        .route("/api/reports/stats", get(handlers::report_stats))
        .route(
            "/api/reports/{id}",
            get(handlers::get_report)
                .put(handlers::update_report)
                .delete(handlers::delete_report),
        )
        .route(
            "/api/reports/{id}/status",
            put(handlers::update_report_status),
        )
        .route("/api/reports/{id}/comments", post(handlers::add_comment))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::model::AuthenticatedUser;
    use crate::features::users::UserService;
    use crate::shared::test_helpers::{
        citizen_user, test_image_store, test_notifier, test_pool, with_user,
    };
    use crate::shared::upload::{INVALID_FILE_TYPE_MESSAGE, TOO_MANY_FILES_MESSAGE};
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::Value;

    fn server_for(user: AuthenticatedUser) -> TestServer {
        let service = Arc::new(ReportService::new(
            test_pool(),
            Arc::new(UserService::new(test_pool())),
            test_image_store(),
            test_notifier(),
        ));
        TestServer::new(with_user(routes(service), user)).unwrap()
    }

    fn report_fields() -> MultipartForm {
        MultipartForm::new()
            .add_text("type", "garbage")
            .add_text("title", "Uncollected garbage")
            .add_text("description", "Bags piled up for a week")
            .add_text("location_address", "Purok 2")
            .add_text("location_lat", "10.05")
            .add_text("location_lng", "124.41")
            .add_text("barangay", "Poblacion")
    }

    fn png(name: &str) -> Part {
        Part::bytes(vec![0x89, 0x50, 0x4e, 0x47])
            .file_name(name)
            .mime_type("image/png")
    }

    #[tokio::test]
    async fn test_citizen_cannot_view_stats() {
        let response = server_for(citizen_user()).get("/api/reports/stats").await;
        response.assert_status(StatusCode::FORBIDDEN);

        let body: Value = response.json();
        assert_eq!(
            body["message"],
            "Only officials and admins can view report statistics"
        );
    }

    #[tokio::test]
    async fn test_unverified_user_cannot_create() {
        let mut user = citizen_user();
        user.is_verified = false;

        let response = server_for(user)
            .post("/api/reports")
            .multipart(report_fields())
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_rejects_non_image_upload() {
        let form = report_fields().add_part(
            "images",
            Part::bytes(b"%PDF-1.4".to_vec())
                .file_name("scan.pdf")
                .mime_type("application/pdf"),
        );
        let response = server_for(citizen_user())
            .post("/api/reports")
            .multipart(form)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["message"], INVALID_FILE_TYPE_MESSAGE);
    }

    #[tokio::test]
    async fn test_create_rejects_sixth_image() {
        let mut form = report_fields();
        for i in 0..6 {
            form = form.add_part("images", png(&format!("photo{}.png", i)));
        }
        let response = server_for(citizen_user())
            .post("/api/reports")
            .multipart(form)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["message"], TOO_MANY_FILES_MESSAGE);
    }

    #[tokio::test]
    async fn test_create_reports_missing_fields() {
        let form = MultipartForm::new().add_text("type", "garbage");
        let response = server_for(citizen_user())
            .post("/api/reports")
            .multipart(form)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["status"], "error");
        assert!(body["errors"].as_array().unwrap().len() >= 5);
    }

    #[tokio::test]
    async fn test_non_uuid_id_is_bad_request() {
        let response = server_for(citizen_user())
            .get("/api/reports/not-a-uuid")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
