use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::schedules::calendar::UpcomingSchedule;
use crate::features::schedules::models::{DayOfWeek, ScheduleDraft, ServiceSchedule};
use crate::shared::constants::{DEFAULT_UPCOMING_DAYS, MAX_UPCOMING_DAYS};
use crate::shared::types::{double_option, PaginationMeta, PaginationQuery};
use crate::shared::validation::{validate_not_blank, TIME_REGEX};

fn parse_time(value: &str, field: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M:%S")
        .map_err(|_| AppError::validation(format!("{} must be in HH:MM:SS format", field)))
}

fn default_recurring() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateScheduleDto {
    #[validate(length(min = 2, max = 100, message = "Service type must be between 2 and 100 characters"))]
    #[schema(example = "Garbage collection")]
    pub service_type: String,

    /// Required for recurring schedules; derived from `next_date` otherwise
    pub day_of_week: Option<DayOfWeek>,

    #[validate(regex(path = *TIME_REGEX, message = "Start time must be in HH:MM:SS format"))]
    #[schema(example = "08:00:00")]
    pub start_time: String,

    #[validate(regex(path = *TIME_REGEX, message = "End time must be in HH:MM:SS format"))]
    #[schema(example = "11:00:00")]
    pub end_time: String,

    #[validate(
        length(min = 1, max = 50, message = "Barangay must be between 1 and 50 characters"),
        custom(function = "validate_not_blank", message = "Barangay is required")
    )]
    pub barangay: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    #[serde(default = "default_recurring")]
    pub recurring: bool,

    /// Date of a one-off schedule, strictly after today
    pub next_date: Option<NaiveDate>,
}

impl CreateScheduleDto {
    pub fn into_draft(self) -> Result<ScheduleDraft> {
        Ok(ScheduleDraft {
            service_type: self.service_type.trim().to_string(),
            day_of_week: self.day_of_week,
            start_time: parse_time(&self.start_time, "Start time")?,
            end_time: parse_time(&self.end_time, "End time")?,
            barangay: self.barangay.trim().to_string(),
            description: self.description,
            recurring: self.recurring,
            next_date: self.next_date,
        })
    }
}

/// Partial update. `description: null` and `next_date: null` clear the value.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateScheduleDto {
    #[validate(length(min = 2, max = 100, message = "Service type must be between 2 and 100 characters"))]
    pub service_type: Option<String>,

    pub day_of_week: Option<DayOfWeek>,

    #[validate(regex(path = *TIME_REGEX, message = "Start time must be in HH:MM:SS format"))]
    pub start_time: Option<String>,

    #[validate(regex(path = *TIME_REGEX, message = "End time must be in HH:MM:SS format"))]
    pub end_time: Option<String>,

    #[validate(
        length(min = 1, max = 50, message = "Barangay must be between 1 and 50 characters"),
        custom(function = "validate_not_blank", message = "Barangay must not be empty")
    )]
    pub barangay: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,

    pub recurring: Option<bool>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub next_date: Option<Option<NaiveDate>>,
}

impl UpdateScheduleDto {
    /// Overlays the update on a stored schedule's fields
    pub fn merge(self, mut draft: ScheduleDraft) -> Result<ScheduleDraft> {
        if let Some(service_type) = self.service_type {
            draft.service_type = service_type.trim().to_string();
        }
        if let Some(start_time) = self.start_time {
            draft.start_time = parse_time(&start_time, "Start time")?;
        }
        if let Some(end_time) = self.end_time {
            draft.end_time = parse_time(&end_time, "End time")?;
        }
        if let Some(barangay) = self.barangay {
            draft.barangay = barangay.trim().to_string();
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(recurring) = self.recurring {
            draft.recurring = recurring;
        }
        match (self.day_of_week, self.next_date) {
            (Some(day), next_date) => {
                draft.day_of_week = Some(day);
                if let Some(next_date) = next_date {
                    draft.next_date = next_date;
                }
            }
            // A new date re-derives the weekday of a one-off schedule
            (None, Some(next_date)) => {
                if !draft.recurring {
                    draft.day_of_week = None;
                }
                draft.next_date = next_date;
            }
            (None, None) => {}
        }
        Ok(draft)
    }
}

/// Query parameters for listing schedules
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ScheduleListQuery {
    pub service_type: Option<String>,
    pub day_of_week: Option<DayOfWeek>,
    pub barangay: Option<String>,
    pub recurring: Option<bool>,
    /// Case-insensitive match on service type, description or barangay
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// day_of_week (default), service_type, barangay, start_time or next_date
    pub sort_by: Option<String>,
    /// ASC (default) or DESC
    pub sort_dir: Option<String>,
}

impl ScheduleListQuery {
    pub fn pagination(&self) -> PaginationQuery {
        let defaults = PaginationQuery::default();
        PaginationQuery::new(
            self.page.unwrap_or(defaults.page),
            self.limit.unwrap_or(defaults.limit),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct UpcomingQuery {
    /// Window length in days, 1 to 31 (default 7)
    pub days: Option<i64>,
    /// Citizens default to their own barangay
    pub barangay: Option<String>,
}

impl UpcomingQuery {
    pub fn days(&self) -> Result<i64> {
        let days = self.days.unwrap_or(DEFAULT_UPCOMING_DAYS);
        if (1..=MAX_UPCOMING_DAYS).contains(&days) {
            Ok(days)
        } else {
            Err(AppError::validation(format!(
                "Days must be between 1 and {}",
                MAX_UPCOMING_DAYS
            )))
        }
    }
}

/// Distinct values available for filtering
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ScheduleFiltersDto {
    pub barangays: Vec<String>,
    pub service_types: Vec<String>,
    pub days_of_week: Vec<DayOfWeek>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleListDto {
    pub schedules: Vec<ServiceSchedule>,
    pub pagination: PaginationMeta,
    pub filters: ScheduleFiltersDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BarangayScheduleDto {
    pub barangay: String,
    /// Monday to Sunday, each with its schedules
    #[schema(value_type = Object)]
    pub schedules_by_day: BTreeMap<DayOfWeek, Vec<ServiceSchedule>>,
    /// Days with at least one schedule
    pub scheduled_days: Vec<DayOfWeek>,
}

impl BarangayScheduleDto {
    pub fn new(
        barangay: String,
        schedules_by_day: BTreeMap<DayOfWeek, Vec<ServiceSchedule>>,
    ) -> Self {
        let scheduled_days = schedules_by_day
            .iter()
            .filter(|(_, schedules)| !schedules.is_empty())
            .map(|(day, _)| *day)
            .collect();
        Self {
            barangay,
            schedules_by_day,
            scheduled_days,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct DateRangeDto {
    pub from: NaiveDate,
    /// Last day included in the window
    pub to: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpcomingListDto {
    pub schedules: Vec<UpcomingSchedule>,
    pub date_range: DateRangeDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceTypeScheduleDto {
    pub service_type: String,
    pub total_schedules: usize,
    pub barangays: Vec<String>,
    #[schema(value_type = Object)]
    pub schedules_by_barangay: BTreeMap<String, Vec<ServiceSchedule>>,
}

impl ServiceTypeScheduleDto {
    pub fn new(
        service_type: String,
        schedules_by_barangay: BTreeMap<String, Vec<ServiceSchedule>>,
    ) -> Self {
        Self {
            service_type,
            total_schedules: schedules_by_barangay.values().map(Vec::len).sum(),
            barangays: schedules_by_barangay.keys().cloned().collect(),
            schedules_by_barangay,
        }
    }
}
