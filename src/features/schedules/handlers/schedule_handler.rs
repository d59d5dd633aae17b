use crate::core::error::Result;
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::VerifiedUser;
use crate::features::auth::policy::{authorize, Action, Resource};
use crate::features::schedules::dtos::{
    BarangayScheduleDto, CreateScheduleDto, ScheduleListDto, ScheduleListQuery,
    ServiceTypeScheduleDto, UpcomingListDto, UpcomingQuery, UpdateScheduleDto,
};
use crate::features::schedules::models::ServiceSchedule;
use crate::features::schedules::services::ScheduleService;
use crate::shared::types::ApiResponse;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[utoipa::path(
    get,
    path = "/api/schedules",
    params(ScheduleListQuery),
    responses(
        (status = 200, description = "Service schedules", body = ApiResponse<ScheduleListDto>),
        (status = 400, description = "Invalid query parameters")
    ),
    security(("bearer_auth" = [])),
    tag = "schedules"
)]
pub async fn list_schedules(
    State(service): State<Arc<ScheduleService>>,
    VerifiedUser(user): VerifiedUser,
    AppQuery(query): AppQuery<ScheduleListQuery>,
) -> Result<Json<ApiResponse<ScheduleListDto>>> {
    authorize(&user, Action::Read, Resource::Schedule)?;

    let schedules = service.list(query).await?;
    Ok(Json(ApiResponse::with_message(
        schedules,
        "Service schedules retrieved successfully",
    )))
}

/// Create a service schedule (staff only)
#[utoipa::path(
    post,
    path = "/api/schedules",
    request_body = CreateScheduleDto,
    responses(
        (status = 201, description = "Schedule created", body = ApiResponse<ServiceSchedule>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "schedules"
)]
pub async fn create_schedule(
    State(service): State<Arc<ScheduleService>>,
    VerifiedUser(user): VerifiedUser,
    AppJson(dto): AppJson<CreateScheduleDto>,
) -> Result<(StatusCode, Json<ApiResponse<ServiceSchedule>>)> {
    authorize(&user, Action::Create, Resource::Schedule)?;
    dto.validate()?;

    let schedule = service.create(dto, Utc::now().date_naive()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            schedule,
            "Service schedule created successfully",
        )),
    ))
}

/// Schedules of one barangay grouped by weekday
///
/// Covers recurring schedules and one-off schedules dated today or later.
#[utoipa::path(
    get,
    path = "/api/schedules/barangay/{barangay}",
    params(("barangay" = String, Path, description = "Barangay name")),
    responses(
        (status = 200, description = "Schedules by day", body = ApiResponse<BarangayScheduleDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "schedules"
)]
pub async fn schedules_by_barangay(
    State(service): State<Arc<ScheduleService>>,
    VerifiedUser(user): VerifiedUser,
    Path(barangay): Path<String>,
) -> Result<Json<ApiResponse<BarangayScheduleDto>>> {
    authorize(&user, Action::Read, Resource::Schedule)?;

    let schedules = service
        .by_barangay(&barangay, Utc::now().date_naive())
        .await?;
    Ok(Json(ApiResponse::with_message(
        schedules,
        "Barangay schedules retrieved successfully",
    )))
}

/// Schedules occurring within the next `days` days
///
/// Citizens see their own barangay unless they ask for another one.
#[utoipa::path(
    get,
    path = "/api/schedules/upcoming",
    params(UpcomingQuery),
    responses(
        (status = 200, description = "Upcoming schedules", body = ApiResponse<UpcomingListDto>),
        (status = 400, description = "Days out of range")
    ),
    security(("bearer_auth" = [])),
    tag = "schedules"
)]
pub async fn upcoming_schedules(
    State(service): State<Arc<ScheduleService>>,
    VerifiedUser(user): VerifiedUser,
    AppQuery(query): AppQuery<UpcomingQuery>,
) -> Result<Json<ApiResponse<UpcomingListDto>>> {
    authorize(&user, Action::Read, Resource::Schedule)?;
    let days = query.days()?;

    let barangay = match query.barangay {
        Some(b) => Some(b),
        None if user.is_citizen() => Some(user.barangay.clone()),
        None => None,
    };
    let schedules = service
        .upcoming(barangay, Utc::now().date_naive(), days)
        .await?;
    Ok(Json(ApiResponse::with_message(
        schedules,
        "Upcoming schedules retrieved successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/schedules/service/{service_type}",
    params(("service_type" = String, Path, description = "Service type")),
    responses(
        (status = 200, description = "Schedules by barangay", body = ApiResponse<ServiceTypeScheduleDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "schedules"
)]
pub async fn schedules_by_service_type(
    State(service): State<Arc<ScheduleService>>,
    VerifiedUser(user): VerifiedUser,
    Path(service_type): Path<String>,
) -> Result<Json<ApiResponse<ServiceTypeScheduleDto>>> {
    authorize(&user, Action::Read, Resource::Schedule)?;

    let schedules = service
        .by_service_type(&service_type, Utc::now().date_naive())
        .await?;
    Ok(Json(ApiResponse::with_message(
        schedules,
        "Service type schedules retrieved successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/schedules/{id}",
    params(("id" = Uuid, Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Service schedule", body = ApiResponse<ServiceSchedule>),
        (status = 404, description = "Schedule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "schedules"
)]
pub async fn get_schedule(
    State(service): State<Arc<ScheduleService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ServiceSchedule>>> {
    let schedule = service.find(id).await?;
    authorize(&user, Action::Read, Resource::Schedule)?;

    Ok(Json(ApiResponse::with_message(
        schedule,
        "Service schedule retrieved successfully",
    )))
}

/// Update a service schedule (staff only)
///
/// Partial; the recurrence rules are checked against the merged schedule.
#[utoipa::path(
    put,
    path = "/api/schedules/{id}",
    params(("id" = Uuid, Path, description = "Schedule ID")),
    request_body = UpdateScheduleDto,
    responses(
        (status = 200, description = "Schedule updated", body = ApiResponse<ServiceSchedule>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Schedule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "schedules"
)]
pub async fn update_schedule(
    State(service): State<Arc<ScheduleService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateScheduleDto>,
) -> Result<Json<ApiResponse<ServiceSchedule>>> {
    authorize(
        &user,
        Action::Update {
            restricted_fields: true,
        },
        Resource::Schedule,
    )?;
    dto.validate()?;

    let schedule = service.update(id, dto, Utc::now().date_naive()).await?;
    Ok(Json(ApiResponse::with_message(
        schedule,
        "Service schedule updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/schedules/{id}",
    params(("id" = Uuid, Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Schedule deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Schedule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "schedules"
)]
pub async fn delete_schedule(
    State(service): State<Arc<ScheduleService>>,
    VerifiedUser(user): VerifiedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    authorize(&user, Action::Delete, Resource::Schedule)?;

    service.delete(id).await?;
    Ok(Json(ApiResponse::message("Service schedule deleted successfully")))
}
