use crate::core::error::Result;
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::VerifiedUser;
use crate::features::auth::policy::{authorize, report_owner_scope, Action, Resource};
use crate::features::reports::dtos::{
    CommentResponseDto, CreateCommentDto, CreateReportDto, CreateReportForm, ReportDetailDto,
    ReportListDto, ReportListQuery, ReportResponseDto, ReportStatsDto, ReportStatusUpdateDto,
    UpdateReportDto, UpdateReportStatusDto,
};
use crate::features::reports::services::ReportService;
use crate::shared::constants::MAX_REPORT_IMAGES;
use crate::shared::types::ApiResponse;
use crate::shared::upload::MultipartForm;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Submit a new report
///
/// Multipart form with the report fields and up to 5 `images`.
#[utoipa::path(
    post,
    path = "/api/reports",
    request_body(content = CreateReportForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Report created", body = ApiResponse<ReportResponseDto>),
        (status = 400, description = "Validation or upload error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Account not verified")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn create_report(
    State(service): State<Arc<ReportService>>,
    VerifiedUser(user): VerifiedUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ReportResponseDto>>)> {
    authorize(&user, Action::Create, Resource::ReportCollection)?;

    let form = MultipartForm::read(multipart, "images", MAX_REPORT_IMAGES).await?;
    let dto = CreateReportDto::from_form(&form)?;
    dto.validate()?;

    let report = service.create(user.id, dto, form.images).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(report, "Report created successfully")),
    ))
}

/// List reports
///
/// Citizens only see their own reports.
#[utoipa::path(
    get,
    path = "/api/reports",
    params(ReportListQuery),
    responses(
        (status = 200, description = "Reports", body = ApiResponse<ReportListDto>),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn list_reports(
    State(service): State<Arc<ReportService>>,
    VerifiedUser(user): VerifiedUser,
    AppQuery(query): AppQuery<ReportListQuery>,
) -> Result<Json<ApiResponse<ReportListDto>>> {
    authorize(&user, Action::Read, Resource::ReportCollection)?;

    let reports = service.list(report_owner_scope(&user), query).await?;
    Ok(Json(ApiResponse::ok(reports)))
}

/// Report statistics (staff only)
#[utoipa::path(
    get,
    path = "/api/reports/stats",
    responses(
        (status = 200, description = "Report statistics", body = ApiResponse<ReportStatsDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn report_stats(
    State(service): State<Arc<ReportService>>,
    VerifiedUser(user): VerifiedUser,
) -> Result<Json<ApiResponse<ReportStatsDto>>> {
    authorize(&user, Action::ViewStats, Resource::ReportCollection)?;

    let stats = service.stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report with comments and history", body = ApiResponse<ReportDetailDto>),
        (status = 403, description = "Not your report"),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn get_report(
    State(service): State<Arc<ReportService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReportDetailDto>>> {
    let access = service.access(id).await?;
    authorize(&user, Action::Read, Resource::Report(access))?;

    let report = service.get(id).await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// Change a report's status (staff only)
///
/// `assigned_to: null` unassigns; the assignee must be an official or admin.
#[utoipa::path(
    put,
    path = "/api/reports/{id}/status",
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = UpdateReportStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ReportStatusUpdateDto>),
        (status = 400, description = "Validation error or invalid assignee"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn update_report_status(
    State(service): State<Arc<ReportService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateReportStatusDto>,
) -> Result<Json<ApiResponse<ReportStatusUpdateDto>>> {
    let access = service.access(id).await?;
    authorize(&user, Action::ChangeStatus, Resource::Report(access))?;
    dto.validate()?;

    let report = service.update_status(user.id, id, dto).await?;
    Ok(Json(ApiResponse::with_message(
        report,
        "Report status updated successfully",
    )))
}

/// Update report details
///
/// Citizens may edit the title and description of their own pending reports.
#[utoipa::path(
    put,
    path = "/api/reports/{id}",
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = UpdateReportDto,
    responses(
        (status = 200, description = "Report updated", body = ApiResponse<ReportResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn update_report(
    State(service): State<Arc<ReportService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateReportDto>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    let access = service.access(id).await?;
    authorize(
        &user,
        Action::Update {
            restricted_fields: dto.touches_restricted_fields(),
        },
        Resource::Report(access),
    )?;
    dto.validate()?;

    let report = service
        .update(id, dto.into_update(), user.is_citizen())
        .await?;
    Ok(Json(ApiResponse::with_message(
        report,
        "Report updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/reports/{id}",
    params(("id" = Uuid, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn delete_report(
    State(service): State<Arc<ReportService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    let access = service.access(id).await?;
    authorize(&user, Action::Delete, Resource::Report(access))?;

    service.delete(id, user.is_citizen()).await?;
    Ok(Json(ApiResponse::message("Report deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/api/reports/{id}/comments",
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = CreateCommentDto,
    responses(
        (status = 201, description = "Comment added", body = ApiResponse<CommentResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn add_comment(
    State(service): State<Arc<ReportService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<CreateCommentDto>,
) -> Result<(StatusCode, Json<ApiResponse<CommentResponseDto>>)> {
    let access = service.access(id).await?;
    authorize(&user, Action::Comment, Resource::Report(access))?;
    dto.validate()?;

    let comment = service.add_comment(user.id, id, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(comment, "Comment added successfully")),
    ))
}
