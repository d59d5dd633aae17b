use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::reports::lifecycle::ResolutionStats;
use crate::features::reports::models::{
    Report, ReportCommentRow, ReportImage, ReportPriority, ReportStatus,
    ReportStatusHistoryRow, ReportType, UpdateReport,
};
use crate::features::users::models::{UserRole, UserSummary};
use crate::shared::types::{double_option, PaginationMeta, PaginationQuery};
use crate::shared::upload::MultipartForm;
use crate::shared::validation::validate_not_blank;

/// Multipart form for creating a report (OpenAPI documentation only).
/// The handler reads the form through [`MultipartForm`].
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct CreateReportForm {
    #[serde(rename = "type")]
    #[schema(example = "flooding")]
    pub report_type: ReportType,
    pub title: String,
    pub description: String,
    pub location_address: String,
    pub location_lat: f64,
    pub location_lng: f64,
    pub barangay: String,
    /// Up to 5 images (jpg, jpeg, png, gif; 5MB each)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub images: Option<Vec<String>>,
}

/// Validated report fields read from the create form
#[derive(Debug, Validate)]
pub struct CreateReportDto {
    pub report_type: ReportType,

    #[validate(length(min = 5, max = 100, message = "Title must be between 5 and 100 characters"))]
    pub title: String,

    #[validate(custom(function = "validate_not_blank", message = "Report description is required"))]
    pub description: String,

    #[validate(custom(function = "validate_not_blank", message = "Location address is required"))]
    pub location_address: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub location_lat: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub location_lng: f64,

    #[validate(length(min = 1, max = 50, message = "Barangay is required"))]
    pub barangay: String,
}

fn required_text(
    form: &MultipartForm,
    name: &str,
    message: &str,
    errors: &mut Vec<String>,
) -> String {
    form.text(name).unwrap_or_else(|| {
        errors.push(message.to_string());
        String::new()
    })
}

fn required_coordinate(
    form: &MultipartForm,
    name: &str,
    message: &str,
    errors: &mut Vec<String>,
) -> f64 {
    match form.text(name).map(|v| v.parse::<f64>()) {
        Some(Ok(value)) if value.is_finite() => value,
        _ => {
            errors.push(message.to_string());
            0.0
        }
    }
}

impl CreateReportDto {
    /// Reads the text fields of a report form. Missing or unparsable
    /// fields are reported together.
    pub fn from_form(form: &MultipartForm) -> Result<Self> {
        let mut errors = Vec::new();

        let report_type = match form.text("type") {
            None => {
                errors.push("Report type is required".to_string());
                None
            }
            Some(value) => match value.parse::<ReportType>() {
                Ok(t) => Some(t),
                Err(()) => {
                    errors.push("Invalid report type".to_string());
                    None
                }
            },
        };
        let title = required_text(form, "title", "Report title is required", &mut errors);
        let description =
            required_text(form, "description", "Report description is required", &mut errors);
        let location_address = required_text(
            form,
            "location_address",
            "Location address is required",
            &mut errors,
        );
        let location_lat = required_coordinate(
            form,
            "location_lat",
            "Latitude must be between -90 and 90",
            &mut errors,
        );
        let location_lng = required_coordinate(
            form,
            "location_lng",
            "Longitude must be between -180 and 180",
            &mut errors,
        );
        let barangay = required_text(form, "barangay", "Barangay is required", &mut errors);

        match report_type {
            Some(report_type) if errors.is_empty() => Ok(Self {
                report_type,
                title,
                description,
                location_address,
                location_lat,
                location_lng,
                barangay,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

/// Partial update of report details. Citizens may only send `title` and `description`.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateReportDto {
    #[serde(rename = "type")]
    pub report_type: Option<ReportType>,

    #[validate(length(min = 5, max = 100, message = "Title must be between 5 and 100 characters"))]
    pub title: Option<String>,

    #[validate(custom(function = "validate_not_blank", message = "Description must not be empty"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_not_blank", message = "Location address must not be empty"))]
    pub location_address: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub location_lat: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub location_lng: Option<f64>,

    #[validate(length(min = 1, max = 50, message = "Barangay must be 1-50 characters"))]
    pub barangay: Option<String>,

    pub priority: Option<ReportPriority>,
}

impl UpdateReportDto {
    /// True when any field other than title or description is present
    pub fn touches_restricted_fields(&self) -> bool {
        self.report_type.is_some()
            || self.location_address.is_some()
            || self.location_lat.is_some()
            || self.location_lng.is_some()
            || self.barangay.is_some()
            || self.priority.is_some()
    }

    pub fn into_update(self) -> UpdateReport {
        UpdateReport {
            report_type: self.report_type,
            title: self.title.map(|v| v.trim().to_string()),
            description: self.description.map(|v| v.trim().to_string()),
            location_address: self.location_address.map(|v| v.trim().to_string()),
            location_lat: self.location_lat,
            location_lng: self.location_lng,
            barangay: self.barangay.map(|v| v.trim().to_string()),
            priority: self.priority,
        }
    }
}

/// Status change. `assigned_to: null` removes the assignee; an absent key keeps it.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReportStatusDto {
    pub status: ReportStatus,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub assigned_to: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommentDto {
    #[validate(
        length(min = 1, max = 1000, message = "Comment must be between 1 and 1000 characters"),
        custom(function = "validate_not_blank", message = "Comment text is required")
    )]
    pub comment: String,
}

/// Query parameters for listing reports
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ReportListQuery {
    pub status: Option<ReportStatus>,
    #[serde(rename = "type")]
    pub report_type: Option<ReportType>,
    pub barangay: Option<String>,
    pub priority: Option<ReportPriority>,
    /// Case-insensitive match on title, description or address
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// created_at (default), updated_at, title, status or priority
    pub sort_by: Option<String>,
    /// ASC or DESC (default)
    pub sort_dir: Option<String>,
}

impl ReportListQuery {
    pub fn pagination(&self) -> PaginationQuery {
        let defaults = PaginationQuery::default();
        PaginationQuery::new(
            self.page.unwrap_or(defaults.page),
            self.limit.unwrap_or(defaults.limit),
        )
    }
}

/// Author or actor shown next to comments and history entries
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActorDto {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportResponseDto {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub title: String,
    pub description: String,
    pub location_address: String,
    pub location_lat: f64,
    pub location_lng: f64,
    pub barangay: String,
    pub status: ReportStatus,
    pub priority: ReportPriority,
    pub assigned_to: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reporter: Option<UserSummary>,
    pub assignee: Option<UserSummary>,
    pub images: Vec<ReportImage>,
}

impl ReportResponseDto {
    pub fn new(
        report: Report,
        reporter: Option<UserSummary>,
        assignee: Option<UserSummary>,
        images: Vec<ReportImage>,
    ) -> Self {
        Self {
            id: report.id,
            user_id: report.user_id,
            report_type: report.report_type,
            title: report.title,
            description: report.description,
            location_address: report.location_address,
            location_lat: report.location_lat,
            location_lng: report.location_lng,
            barangay: report.barangay,
            status: report.status,
            priority: report.priority,
            assigned_to: report.assigned_to,
            resolution_notes: report.resolution_notes,
            resolved_at: report.resolved_at,
            created_at: report.created_at,
            updated_at: report.updated_at,
            reporter,
            assignee,
            images,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentResponseDto {
    pub id: Uuid,
    pub report_id: Uuid,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub user: ActorDto,
}

impl From<ReportCommentRow> for CommentResponseDto {
    fn from(row: ReportCommentRow) -> Self {
        Self {
            id: row.id,
            report_id: row.report_id,
            comment: row.comment,
            created_at: row.created_at,
            user: ActorDto {
                id: row.user_id,
                first_name: row.user_first_name,
                last_name: row.user_last_name,
                role: row.user_role,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusHistoryResponseDto {
    pub id: Uuid,
    pub old_status: Option<ReportStatus>,
    pub new_status: ReportStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user: ActorDto,
}

impl From<ReportStatusHistoryRow> for StatusHistoryResponseDto {
    fn from(row: ReportStatusHistoryRow) -> Self {
        Self {
            id: row.id,
            old_status: row.old_status,
            new_status: row.new_status,
            notes: row.notes,
            created_at: row.created_at,
            user: ActorDto {
                id: row.user_id,
                first_name: row.user_first_name,
                last_name: row.user_last_name,
                role: row.user_role,
            },
        }
    }
}

/// Report with its comments (oldest first) and status history (newest first)
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportDetailDto {
    #[serde(flatten)]
    pub report: ReportResponseDto,
    pub comments: Vec<CommentResponseDto>,
    pub status_history: Vec<StatusHistoryResponseDto>,
}

/// Report after a status change with its five newest history entries
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportStatusUpdateDto {
    #[serde(flatten)]
    pub report: ReportResponseDto,
    pub status_history: Vec<StatusHistoryResponseDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportListDto {
    pub reports: Vec<ReportResponseDto>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema, sqlx::FromRow)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatsDto {
    pub by_status: Vec<GroupCount>,
    pub by_type: Vec<GroupCount>,
    pub by_barangay: Vec<GroupCount>,
    pub by_priority: Vec<GroupCount>,
    pub resolution: ResolutionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_form() -> MultipartForm {
        MultipartForm::from_fields(&[
            ("type", "flooding"),
            ("title", "Flooded street near plaza"),
            ("description", "Knee-deep water after the rain"),
            ("location_address", "Rizal St."),
            ("location_lat", "10.1234"),
            ("location_lng", "124.3456"),
            ("barangay", "Poblacion"),
        ])
    }

    #[test]
    fn test_create_from_form() {
        let dto = CreateReportDto::from_form(&full_form()).unwrap();
        assert_eq!(dto.report_type, ReportType::Flooding);
        assert_eq!(dto.location_lat, 10.1234);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_create_from_form_collects_every_missing_field() {
        let form = MultipartForm::from_fields(&[("type", "volcano"), ("location_lat", "north")]);
        match CreateReportDto::from_form(&form) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.contains(&"Invalid report type".to_string()));
                assert!(errors.contains(&"Report title is required".to_string()));
                assert!(errors.contains(&"Latitude must be between -90 and 90".to_string()));
                assert!(errors.contains(&"Barangay is required".to_string()));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_rejects_out_of_range_coordinates() {
        let mut dto = CreateReportDto::from_form(&full_form()).unwrap();
        dto.location_lat = 91.0;
        dto.title = "Hole".to_string();
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("location_lat"));
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    fn test_restricted_field_detection() {
        let citizen_edit: UpdateReportDto =
            serde_json::from_str(r#"{"title": "Updated title", "description": "More detail"}"#)
                .unwrap();
        assert!(!citizen_edit.touches_restricted_fields());

        let staff_edit: UpdateReportDto =
            serde_json::from_str(r#"{"title": "Updated title", "priority": "high"}"#).unwrap();
        assert!(staff_edit.touches_restricted_fields());
    }

    #[test]
    fn test_update_rejects_empty_strings() {
        let dto: UpdateReportDto =
            serde_json::from_str(r#"{"description": "", "title": ""}"#).unwrap();
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("description"));
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    fn test_status_dto_unassign_vs_absent() {
        let unassign: UpdateReportStatusDto =
            serde_json::from_str(r#"{"status": "pending", "assigned_to": null}"#).unwrap();
        assert_eq!(unassign.assigned_to, Some(None));

        let keep: UpdateReportStatusDto =
            serde_json::from_str(r#"{"status": "in_progress"}"#).unwrap();
        assert_eq!(keep.assigned_to, None);
        assert_eq!(keep.status, ReportStatus::InProgress);
    }

    #[test]
    fn test_stats_keys_are_camel_case() {
        let stats = ReportStatsDto {
            by_status: vec![GroupCount {
                key: "pending".to_string(),
                count: 2,
            }],
            by_type: vec![],
            by_barangay: vec![],
            by_priority: vec![],
            resolution: ResolutionStats::from_hours(&[]),
        };
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value["byStatus"][0]["key"], "pending");
        assert!(value.get("byBarangay").is_some());
        assert_eq!(value["resolution"]["resolved_count"], 0);
    }
}
