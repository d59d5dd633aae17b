use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::alerts::models::{
    AlertCategory, AlertImportance, AlertReaderRow, AlertWithCreator, UpdateAlert,
};
use crate::features::alerts::visibility::check_date_range;
use crate::features::users::models::UserRole;
use crate::shared::constants::BARANGAY_ALL;
use crate::shared::types::{PaginationMeta, PaginationQuery};
use crate::shared::upload::MultipartForm;
use crate::shared::validation::validate_not_blank;

/// Timestamp accepted in alert forms: RFC 3339, `YYYY-MM-DDTHH:MM:SS`
/// (read as UTC) or a bare date (midnight UTC)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormTimestamp(pub DateTime<Utc>);

impl FromStr for FormTimestamp {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(ts.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            return Ok(Self(naive.and_utc()));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Self(naive.and_utc()))
            .ok_or(())
    }
}

/// Collects typed-field errors while an alert form is read
struct FormReader<'a> {
    form: &'a MultipartForm,
    errors: Vec<String>,
}

impl<'a> FormReader<'a> {
    fn new(form: &'a MultipartForm) -> Self {
        Self {
            form,
            errors: Vec::new(),
        }
    }

    fn typed<T: FromStr>(&mut self, name: &str, invalid: &str) -> Option<T> {
        let value = self.form.text(name)?;
        match value.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.errors.push(invalid.to_string());
                None
            }
        }
    }

    fn required_text(&mut self, name: &str, missing: &str) -> String {
        self.form.text(name).unwrap_or_else(|| {
            self.errors.push(missing.to_string());
            String::new()
        })
    }

    fn finish<T>(self, value: T) -> Result<T> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

/// Multipart form for creating or updating an alert (OpenAPI documentation only)
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct AlertForm {
    #[schema(example = "Water interruption")]
    pub title: String,
    pub body: String,
    pub category: AlertCategory,
    pub importance: Option<AlertImportance>,
    /// Target barangay, or ALL (default)
    pub barangay: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    /// Defaults to one week after the start; an empty value clears it on update
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: Option<String>,
}

#[derive(Debug, Validate)]
pub struct CreateAlertDto {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    pub title: String,

    #[validate(custom(function = "validate_not_blank", message = "Alert body is required"))]
    pub body: String,

    pub category: AlertCategory,
    pub importance: AlertImportance,

    #[validate(length(max = 50, message = "Barangay must be less than 50 characters"))]
    pub barangay: String,

    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl CreateAlertDto {
    pub fn from_form(form: &MultipartForm) -> Result<Self> {
        let mut reader = FormReader::new(form);

        let title = reader.required_text("title", "Alert title is required");
        let body = reader.required_text("body", "Alert body is required");
        let category = match form.text("category") {
            None => {
                reader.errors.push("Alert category is required".to_string());
                None
            }
            Some(_) => reader.typed::<AlertCategory>("category", "Invalid alert category"),
        };
        let importance = reader
            .typed::<AlertImportance>("importance", "Invalid importance value")
            .unwrap_or_default();
        let barangay = form
            .text("barangay")
            .unwrap_or_else(|| BARANGAY_ALL.to_string());
        let start_date = reader
            .typed::<FormTimestamp>("start_date", "Start date must be a valid date")
            .map(|t| t.0);
        let end_date = reader
            .typed::<FormTimestamp>("end_date", "End date must be a valid date")
            .map(|t| t.0);
        let is_active = reader
            .typed::<bool>("is_active", "Is active must be a boolean value")
            .unwrap_or(true);

        match category {
            Some(category) => reader.finish(Self {
                title,
                body,
                category,
                importance,
                barangay,
                start_date,
                end_date,
                is_active,
            }),
            None => Err(AppError::Validation(reader.errors)),
        }
    }

    /// End date, when given, must not precede the start (now by default)
    pub fn check_dates(&self, now: DateTime<Utc>) -> Result<()> {
        check_date_range(self.start_date.unwrap_or(now), self.end_date)
    }
}

/// Fields read from an alert update form. Absent fields stay unchanged.
#[derive(Debug, Default, Validate)]
pub struct UpdateAlertDto {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    pub title: Option<String>,

    pub body: Option<String>,
    pub category: Option<AlertCategory>,
    pub importance: Option<AlertImportance>,

    #[validate(length(max = 50, message = "Barangay must be less than 50 characters"))]
    pub barangay: Option<String>,

    pub start_date: Option<DateTime<Utc>>,
    /// `Some(None)` when the field was sent empty
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

impl UpdateAlertDto {
    pub fn from_form(form: &MultipartForm) -> Result<Self> {
        let mut reader = FormReader::new(form);

        let dto = Self {
            title: form.text("title"),
            body: form.text("body"),
            category: reader.typed("category", "Invalid alert category"),
            importance: reader.typed("importance", "Invalid importance value"),
            barangay: form.text("barangay"),
            start_date: reader
                .typed::<FormTimestamp>("start_date", "Start date must be a valid date")
                .map(|t| t.0),
            end_date: if form.has("end_date") {
                Some(
                    reader
                        .typed::<FormTimestamp>("end_date", "End date must be a valid date")
                        .map(|t| t.0),
                )
            } else {
                None
            },
            is_active: reader.typed("is_active", "Is active must be a boolean value"),
        };

        reader.finish(dto)
    }

    pub fn into_update(self, image_url: Option<String>) -> UpdateAlert {
        UpdateAlert {
            title: self.title,
            body: self.body,
            category: self.category,
            importance: self.importance,
            barangay: self.barangay,
            image_url,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
        }
    }
}

/// Query parameters for listing alerts
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AlertListQuery {
    pub category: Option<AlertCategory>,
    pub importance: Option<AlertImportance>,
    pub barangay: Option<String>,
    /// Citizens default to active alerts only
    pub is_active: Option<bool>,
    /// Case-insensitive match on title or body
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// created_at (default), start_date, end_date, importance or title
    pub sort_by: Option<String>,
    /// ASC or DESC (default)
    pub sort_dir: Option<String>,
}

impl AlertListQuery {
    pub fn pagination(&self) -> PaginationQuery {
        let defaults = PaginationQuery::default();
        PaginationQuery::new(
            self.page.unwrap_or(defaults.page),
            self.limit.unwrap_or(defaults.limit),
        )
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatorDto {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlertResponseDto {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub category: AlertCategory,
    pub importance: AlertImportance,
    pub barangay: String,
    pub image_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub creator: Option<CreatorDto>,
    /// Citizens only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    /// Citizens only; null while unread
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub read_at: Option<Option<DateTime<Utc>>>,
    /// Staff only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_count: Option<i64>,
}

impl From<AlertWithCreator> for AlertResponseDto {
    fn from(row: AlertWithCreator) -> Self {
        let alert = row.alert;
        let creator = match (row.creator_first_name, row.creator_last_name, row.creator_role) {
            (Some(first_name), Some(last_name), Some(role)) => Some(CreatorDto {
                id: alert.created_by,
                first_name,
                last_name,
                role,
            }),
            _ => None,
        };

        Self {
            id: alert.id,
            title: alert.title,
            body: alert.body,
            category: alert.category,
            importance: alert.importance,
            barangay: alert.barangay,
            image_url: alert.image_url,
            start_date: alert.start_date,
            end_date: alert.end_date,
            is_active: alert.is_active,
            created_by: alert.created_by,
            created_at: alert.created_at,
            updated_at: alert.updated_at,
            creator,
            is_read: None,
            read_at: None,
            read_count: None,
        }
    }
}

impl AlertResponseDto {
    pub fn with_read_state(mut self, read_at: Option<DateTime<Utc>>) -> Self {
        self.is_read = Some(read_at.is_some());
        self.read_at = Some(read_at);
        self
    }

    pub fn with_read_count(mut self, read_count: i64) -> Self {
        self.read_count = Some(read_count);
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AlertListDto {
    pub alerts: Vec<AlertResponseDto>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct MarkReadResponseDto {
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct UnreadCountDto {
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReaderDto {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub barangay: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlertReaderDto {
    pub read_at: DateTime<Utc>,
    pub user: ReaderDto,
}

impl From<AlertReaderRow> for AlertReaderDto {
    fn from(row: AlertReaderRow) -> Self {
        Self {
            read_at: row.read_at,
            user: ReaderDto {
                id: row.user_id,
                first_name: row.first_name,
                last_name: row.last_name,
                barangay: row.barangay,
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AlertStatsDto {
    pub total_users: i64,
    pub read_count: i64,
    pub read_percentage: f64,
    /// Latest 100 reads, newest first
    pub reads: Vec<AlertReaderDto>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_form_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(
            "2025-03-01T08:30:00Z".parse::<FormTimestamp>().unwrap().0,
            expected
        );
        assert_eq!(
            "2025-03-01T16:30:00+08:00".parse::<FormTimestamp>().unwrap().0,
            expected
        );
        assert_eq!(
            "2025-03-01T08:30:00".parse::<FormTimestamp>().unwrap().0,
            expected
        );
        assert_eq!(
            "2025-03-01".parse::<FormTimestamp>().unwrap().0,
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        );
        assert!("next week".parse::<FormTimestamp>().is_err());
    }

    #[test]
    fn test_create_defaults() {
        let form = MultipartForm::from_fields(&[
            ("title", "Brownout"),
            ("body", "Scheduled maintenance"),
            ("category", "announcement"),
        ]);
        let dto = CreateAlertDto::from_form(&form).unwrap();
        assert_eq!(dto.importance, AlertImportance::Medium);
        assert_eq!(dto.barangay, "ALL");
        assert!(dto.is_active);
        assert!(dto.start_date.is_none());
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_create_collects_errors() {
        let form = MultipartForm::from_fields(&[
            ("category", "gossip"),
            ("importance", "urgent"),
            ("is_active", "maybe"),
        ]);
        match CreateAlertDto::from_form(&form) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.contains(&"Alert title is required".to_string()));
                assert!(errors.contains(&"Alert body is required".to_string()));
                assert!(errors.contains(&"Invalid alert category".to_string()));
                assert!(errors.contains(&"Invalid importance value".to_string()));
                assert!(errors.contains(&"Is active must be a boolean value".to_string()));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_rejects_end_before_start() {
        let form = MultipartForm::from_fields(&[
            ("title", "Road closure"),
            ("body", "Fiesta parade"),
            ("category", "traffic"),
            ("start_date", "2025-05-10"),
            ("end_date", "2025-05-09"),
        ]);
        let dto = CreateAlertDto::from_form(&form).unwrap();
        assert!(dto.check_dates(Utc::now()).is_err());

        let no_start = CreateAlertDto {
            start_date: None,
            end_date: Some(Utc::now() + Duration::days(1)),
            ..dto
        };
        assert!(no_start.check_dates(Utc::now()).is_ok());
    }

    #[test]
    fn test_update_distinguishes_cleared_end_date() {
        let cleared = UpdateAlertDto::from_form(&MultipartForm::from_fields(&[("end_date", "")]))
            .unwrap();
        assert_eq!(cleared.end_date, Some(None));

        let untouched =
            UpdateAlertDto::from_form(&MultipartForm::from_fields(&[("title", "New title")]))
                .unwrap();
        assert_eq!(untouched.end_date, None);
        assert_eq!(untouched.title.as_deref(), Some("New title"));

        let bad = UpdateAlertDto::from_form(&MultipartForm::from_fields(&[("end_date", "soon")]));
        assert!(bad.is_err());
    }

    #[test]
    fn test_read_state_serialization() {
        let row = AlertWithCreator {
            alert: crate::features::alerts::models::Alert {
                id: Uuid::now_v7(),
                title: "Typhoon warning".to_string(),
                body: "Signal no. 2".to_string(),
                category: AlertCategory::Weather,
                importance: AlertImportance::High,
                barangay: "ALL".to_string(),
                image_url: None,
                start_date: Utc::now(),
                end_date: None,
                is_active: true,
                created_by: Uuid::now_v7(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            creator_first_name: None,
            creator_last_name: None,
            creator_role: None,
        };
        let dto = AlertResponseDto::from(row);

        let unread = serde_json::to_value(dto.clone().with_read_state(None)).unwrap();
        assert_eq!(unread["is_read"], false);
        assert!(unread["read_at"].is_null());
        assert!(unread.get("read_at").is_some());
        assert!(unread.get("read_count").is_none());

        let staff = serde_json::to_value(dto.with_read_count(4)).unwrap();
        assert_eq!(staff["read_count"], 4);
        assert!(staff.get("is_read").is_none());
    }
}
