use crate::core::error::Result;
use crate::core::extractor::AppQuery;
use crate::features::alerts::dtos::{
    AlertForm, AlertListDto, AlertListQuery, AlertResponseDto, AlertStatsDto, CreateAlertDto,
    MarkReadResponseDto, UnreadCountDto, UpdateAlertDto,
};
use crate::features::alerts::models::AlertWithCreator;
use crate::features::alerts::services::AlertService;
use crate::features::auth::guards::VerifiedUser;
use crate::features::auth::policy::{authorize, Action, Resource};
use crate::shared::types::ApiResponse;
use crate::shared::upload::MultipartForm;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Policy resource for a loaded alert
fn alert_resource(row: &AlertWithCreator) -> Resource {
    Resource::Alert {
        is_active: row.alert.is_active,
    }
}

/// Publish an alert (staff only)
#[utoipa::path(
    post,
    path = "/api/alerts",
    request_body(content = AlertForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Alert created", body = ApiResponse<AlertResponseDto>),
        (status = 400, description = "Validation or upload error"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn create_alert(
    State(service): State<Arc<AlertService>>,
    VerifiedUser(user): VerifiedUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<AlertResponseDto>>)> {
    authorize(&user, Action::Create, Resource::AlertCollection)?;

    let mut form = MultipartForm::read(multipart, "image", 1).await?;
    let dto = CreateAlertDto::from_form(&form)?;
    dto.validate()?;
    dto.check_dates(Utc::now())?;

    let alert = service.create(user.id, dto, form.take_image()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(alert, "Alert created successfully")),
    ))
}

/// List alerts
///
/// Citizens see active alerts for their barangay or ALL, with read state.
#[utoipa::path(
    get,
    path = "/api/alerts",
    params(AlertListQuery),
    responses(
        (status = 200, description = "Alerts", body = ApiResponse<AlertListDto>),
        (status = 400, description = "Invalid query parameters")
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn list_alerts(
    State(service): State<Arc<AlertService>>,
    VerifiedUser(user): VerifiedUser,
    AppQuery(query): AppQuery<AlertListQuery>,
) -> Result<Json<ApiResponse<AlertListDto>>> {
    authorize(&user, Action::Read, Resource::AlertCollection)?;

    let alerts = service.list(&user, query).await?;
    Ok(Json(ApiResponse::with_message(
        alerts,
        "Alerts retrieved successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/alerts/unread-count",
    responses(
        (status = 200, description = "Unread active alerts", body = ApiResponse<UnreadCountDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn unread_count(
    State(service): State<Arc<AlertService>>,
    VerifiedUser(user): VerifiedUser,
) -> Result<Json<ApiResponse<UnreadCountDto>>> {
    authorize(&user, Action::Read, Resource::AlertCollection)?;

    let unread_count = service.unread_count(&user).await?;
    Ok(Json(ApiResponse::with_message(
        UnreadCountDto { unread_count },
        "Unread alert count retrieved successfully",
    )))
}

/// Get an alert
///
/// Reading an alert as a citizen records a read receipt.
#[utoipa::path(
    get,
    path = "/api/alerts/{id}",
    params(("id" = Uuid, Path, description = "Alert ID")),
    responses(
        (status = 200, description = "Alert", body = ApiResponse<AlertResponseDto>),
        (status = 403, description = "Alert is no longer active"),
        (status = 404, description = "Alert not found")
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn get_alert(
    State(service): State<Arc<AlertService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AlertResponseDto>>> {
    let row = service.find(id).await?;
    authorize(&user, Action::Read, alert_resource(&row))?;

    let alert = service.detail(&user, row).await?;
    Ok(Json(ApiResponse::with_message(
        alert,
        "Alert retrieved successfully",
    )))
}

/// Update an alert (staff only)
///
/// Multipart; absent fields stay unchanged and an empty `end_date` clears it.
#[utoipa::path(
    put,
    path = "/api/alerts/{id}",
    params(("id" = Uuid, Path, description = "Alert ID")),
    request_body(content = AlertForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Alert updated", body = ApiResponse<AlertResponseDto>),
        (status = 400, description = "Validation or upload error"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Alert not found")
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn update_alert(
    State(service): State<Arc<AlertService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<AlertResponseDto>>> {
    let row = service.find(id).await?;
    authorize(
        &user,
        Action::Update {
            restricted_fields: true,
        },
        alert_resource(&row),
    )?;

    let mut form = MultipartForm::read(multipart, "image", 1).await?;
    let dto = UpdateAlertDto::from_form(&form)?;
    dto.validate()?;

    let alert = service.update(id, dto, form.take_image()).await?;
    Ok(Json(ApiResponse::with_message(
        alert,
        "Alert updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/alerts/{id}",
    params(("id" = Uuid, Path, description = "Alert ID")),
    responses(
        (status = 200, description = "Alert deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Alert not found")
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn delete_alert(
    State(service): State<Arc<AlertService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    let row = service.find(id).await?;
    authorize(&user, Action::Delete, alert_resource(&row))?;

    service.delete(id).await?;
    Ok(Json(ApiResponse::message("Alert deleted successfully")))
}

/// Mark an alert as read
///
/// 201 on the first call; later calls return 200 with the original `read_at`.
#[utoipa::path(
    post,
    path = "/api/alerts/{id}/read",
    params(("id" = Uuid, Path, description = "Alert ID")),
    responses(
        (status = 201, description = "Marked as read", body = ApiResponse<MarkReadResponseDto>),
        (status = 200, description = "Already marked as read", body = ApiResponse<MarkReadResponseDto>),
        (status = 403, description = "Alert is no longer active"),
        (status = 404, description = "Alert not found")
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn mark_alert_read(
    State(service): State<Arc<AlertService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<MarkReadResponseDto>>)> {
    let row = service.find(id).await?;
    authorize(&user, Action::Read, alert_resource(&row))?;

    let (read_at, created) = service.mark_read(id, user.id).await?;
    let (status, message) = if created {
        (StatusCode::CREATED, "Alert marked as read successfully")
    } else {
        (StatusCode::OK, "Alert was already marked as read")
    };
    Ok((
        status,
        Json(ApiResponse::with_message(
            MarkReadResponseDto { read_at },
            message,
        )),
    ))
}

/// Read statistics for an alert (staff only)
#[utoipa::path(
    get,
    path = "/api/alerts/{id}/stats",
    params(("id" = Uuid, Path, description = "Alert ID")),
    responses(
        (status = 200, description = "Read statistics", body = ApiResponse<AlertStatsDto>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Alert not found")
    ),
    security(("bearer_auth" = [])),
    tag = "alerts"
)]
pub async fn alert_stats(
    State(service): State<Arc<AlertService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AlertStatsDto>>> {
    let row = service.find(id).await?;
    authorize(&user, Action::ViewStats, alert_resource(&row))?;

    let stats = service.stats(id).await?;
    Ok(Json(ApiResponse::with_message(
        stats,
        "Alert read statistics retrieved successfully",
    )))
}
