use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::alerts::{
    dtos as alerts_dtos, handlers as alerts_handlers, models as alerts_models,
};
use crate::features::auth::{dtos as auth_dtos, handlers as auth_handlers};
use crate::features::reports::{
    dtos as reports_dtos, handlers as reports_handlers, lifecycle as reports_lifecycle,
    models as reports_models,
};
use crate::features::schedules::{
    calendar as schedules_calendar, dtos as schedules_dtos, handlers as schedules_handlers,
    models as schedules_models,
};
use crate::features::users::models as users_models;
use crate::shared::types::{ApiResponse, PaginationMeta, ResponseStatus};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth_handlers::register,
        auth_handlers::login,
        auth_handlers::verify_account,
        auth_handlers::resend_verification,
        auth_handlers::forgot_password,
        auth_handlers::reset_password,
        auth_handlers::get_me,
        auth_handlers::update_me,
        auth_handlers::change_password,
        auth_handlers::register_device,
        // Reports
        reports_handlers::create_report,
        reports_handlers::list_reports,
        reports_handlers::report_stats,
        reports_handlers::get_report,
        reports_handlers::update_report_status,
        reports_handlers::update_report,
        reports_handlers::delete_report,
        reports_handlers::add_comment,
        // Alerts
        alerts_handlers::create_alert,
        alerts_handlers::list_alerts,
        alerts_handlers::unread_count,
        alerts_handlers::get_alert,
        alerts_handlers::update_alert,
        alerts_handlers::delete_alert,
        alerts_handlers::mark_alert_read,
        alerts_handlers::alert_stats,
        // Schedules
        schedules_handlers::list_schedules,
        schedules_handlers::create_schedule,
        schedules_handlers::schedules_by_barangay,
        schedules_handlers::upcoming_schedules,
        schedules_handlers::schedules_by_service_type,
        schedules_handlers::get_schedule,
        schedules_handlers::update_schedule,
        schedules_handlers::delete_schedule,
    ),
    components(
        schemas(
            // Shared
            ResponseStatus,
            PaginationMeta,
            // Users
            users_models::UserRole,
            users_models::UserSummary,
            users_models::DeviceType,
            // Auth
            auth_dtos::RegisterRequestDto,
            auth_dtos::LoginRequestDto,
            auth_dtos::VerifyAccountRequestDto,
            auth_dtos::EmailRequestDto,
            auth_dtos::ResetPasswordRequestDto,
            auth_dtos::ChangePasswordRequestDto,
            auth_dtos::UpdateProfileRequestDto,
            auth_dtos::RegisterDeviceRequestDto,
            auth_dtos::UserProfileDto,
            auth_dtos::AuthResponseDto,
            auth_dtos::DeviceResponseDto,
            ApiResponse<auth_dtos::UserProfileDto>,
            ApiResponse<auth_dtos::AuthResponseDto>,
            ApiResponse<auth_dtos::DeviceResponseDto>,
            // Reports
            reports_models::ReportStatus,
            reports_models::ReportPriority,
            reports_models::ReportType,
            reports_models::ReportImage,
            reports_lifecycle::ResolutionStats,
            reports_dtos::CreateReportForm,
            reports_dtos::UpdateReportDto,
            reports_dtos::UpdateReportStatusDto,
            reports_dtos::CreateCommentDto,
            reports_dtos::ActorDto,
            reports_dtos::ReportResponseDto,
            reports_dtos::CommentResponseDto,
            reports_dtos::StatusHistoryResponseDto,
            reports_dtos::ReportDetailDto,
            reports_dtos::ReportStatusUpdateDto,
            reports_dtos::ReportListDto,
            reports_dtos::GroupCount,
            reports_dtos::ReportStatsDto,
            ApiResponse<reports_dtos::ReportResponseDto>,
            ApiResponse<reports_dtos::ReportDetailDto>,
            ApiResponse<reports_dtos::ReportStatusUpdateDto>,
            ApiResponse<reports_dtos::ReportListDto>,
            ApiResponse<reports_dtos::CommentResponseDto>,
            ApiResponse<reports_dtos::ReportStatsDto>,
            // Alerts
            alerts_models::AlertCategory,
            alerts_models::AlertImportance,
            alerts_dtos::AlertForm,
            alerts_dtos::CreatorDto,
            alerts_dtos::AlertResponseDto,
            alerts_dtos::AlertListDto,
            alerts_dtos::MarkReadResponseDto,
            alerts_dtos::UnreadCountDto,
            alerts_dtos::ReaderDto,
            alerts_dtos::AlertReaderDto,
            alerts_dtos::AlertStatsDto,
            ApiResponse<alerts_dtos::AlertResponseDto>,
            ApiResponse<alerts_dtos::AlertListDto>,
            ApiResponse<alerts_dtos::MarkReadResponseDto>,
            ApiResponse<alerts_dtos::UnreadCountDto>,
            ApiResponse<alerts_dtos::AlertStatsDto>,
            // Schedules
            schedules_models::DayOfWeek,
            schedules_models::ServiceSchedule,
            schedules_calendar::UpcomingSchedule,
            schedules_dtos::CreateScheduleDto,
            schedules_dtos::UpdateScheduleDto,
            schedules_dtos::ScheduleFiltersDto,
            schedules_dtos::ScheduleListDto,
            schedules_dtos::BarangayScheduleDto,
            schedules_dtos::DateRangeDto,
            schedules_dtos::UpcomingListDto,
            schedules_dtos::ServiceTypeScheduleDto,
            ApiResponse<schedules_models::ServiceSchedule>,
            ApiResponse<schedules_dtos::ScheduleListDto>,
            ApiResponse<schedules_dtos::BarangayScheduleDto>,
            ApiResponse<schedules_dtos::UpcomingListDto>,
            ApiResponse<schedules_dtos::ServiceTypeScheduleDto>,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login, verification and profile"),
        (name = "reports", description = "Citizen issue reports, status changes and comments"),
        (name = "alerts", description = "Official announcements and read receipts"),
        (name = "schedules", description = "Municipal service schedules"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Bien Unido API",
        version = "0.1.0",
        description = "Citizen services API for the Municipality of Bien Unido",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_feature_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/login",
            "/api/reports/{id}/status",
            "/api/alerts/{id}/read",
            "/api/schedules/upcoming",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
