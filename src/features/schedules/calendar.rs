//! Recurrence rules and date arithmetic for service schedules.
//!
//! Recurring schedules repeat weekly on `day_of_week`. One-off schedules
//! happen once on `next_date`, which must lie after today when written.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use super::models::{DayOfWeek, ScheduleDraft, ScheduleFields, ServiceSchedule};
use crate::core::error::{AppError, Result};

/// Applies the recurrence rules to a draft and settles its weekday
pub fn finalize(draft: ScheduleDraft, today: NaiveDate) -> Result<ScheduleFields> {
    let mut errors = Vec::new();

    if draft.end_time <= draft.start_time {
        errors.push("End time must be after start time".to_string());
    }

    let (day_of_week, next_date) = if draft.recurring {
        match draft.day_of_week {
            Some(day) => (Some(day), None),
            None => {
                errors.push("Day of week is required for recurring schedules".to_string());
                (None, None)
            }
        }
    } else {
        match draft.next_date {
            None => {
                errors.push("Next date is required for non-recurring schedules".to_string());
                (draft.day_of_week, None)
            }
            Some(date) if date <= today => {
                errors.push("Next date must be in the future".to_string());
                (draft.day_of_week, Some(date))
            }
            Some(date) => {
                let derived = DayOfWeek::from(date.weekday());
                match draft.day_of_week {
                    Some(day) if day != derived => {
                        errors.push(format!("Next date falls on a {:?}, not a {:?}", derived, day));
                    }
                    _ => {}
                }
                (Some(derived), Some(date))
            }
        }
    };

    match day_of_week {
        Some(day_of_week) if errors.is_empty() => Ok(ScheduleFields {
            service_type: draft.service_type,
            day_of_week,
            start_time: draft.start_time,
            end_time: draft.end_time,
            barangay: draft.barangay,
            description: draft.description,
            recurring: draft.recurring,
            next_date,
        }),
        _ => Err(AppError::Validation(errors)),
    }
}

/// First date on or after `today` falling on `day`
pub fn next_weekday(day: DayOfWeek, today: NaiveDate) -> NaiveDate {
    let target = day.weekday().num_days_from_monday() as i64;
    let current = today.weekday().num_days_from_monday() as i64;
    today + Duration::days((target - current).rem_euclid(7))
}

pub fn next_occurrence(schedule: &ServiceSchedule, today: NaiveDate) -> Option<NaiveDate> {
    if schedule.recurring {
        Some(next_weekday(schedule.day_of_week, today))
    } else {
        schedule.next_date
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpcomingSchedule {
    #[serde(flatten)]
    pub schedule: ServiceSchedule,
    pub next_occurrence: NaiveDate,
}

/// Schedules occurring in `[today, today + days)`, by date then start time
pub fn upcoming(
    schedules: Vec<ServiceSchedule>,
    today: NaiveDate,
    days: i64,
) -> Vec<UpcomingSchedule> {
    let end = today + Duration::days(days);
    let mut entries: Vec<UpcomingSchedule> = schedules
        .into_iter()
        .filter_map(|schedule| {
            let date = next_occurrence(&schedule, today)?;
            (date >= today && date < end).then_some(UpcomingSchedule {
                schedule,
                next_occurrence: date,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        a.next_occurrence
            .cmp(&b.next_occurrence)
            .then(a.schedule.start_time.cmp(&b.schedule.start_time))
    });
    entries
}

/// Every weekday mapped to its schedules, Monday first, empty days included
pub fn group_by_day(schedules: Vec<ServiceSchedule>) -> BTreeMap<DayOfWeek, Vec<ServiceSchedule>> {
    let mut grouped: BTreeMap<DayOfWeek, Vec<ServiceSchedule>> =
        DayOfWeek::ALL.iter().map(|d| (*d, Vec::new())).collect();
    for schedule in schedules {
        grouped.entry(schedule.day_of_week).or_default().push(schedule);
    }
    grouped
}

pub fn group_by_barangay(
    schedules: Vec<ServiceSchedule>,
) -> BTreeMap<String, Vec<ServiceSchedule>> {
    let mut grouped: BTreeMap<String, Vec<ServiceSchedule>> = BTreeMap::new();
    for schedule in schedules {
        grouped
            .entry(schedule.barangay.clone())
            .or_default()
            .push(schedule);
    }
    grouped
}

/// Allow-listed `ORDER BY` columns for schedule listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScheduleSortBy {
    #[default]
    DayOfWeek,
    ServiceType,
    Barangay,
    StartTime,
    NextDate,
}

impl ScheduleSortBy {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("service_type") => ScheduleSortBy::ServiceType,
            Some("barangay") => ScheduleSortBy::Barangay,
            Some("start_time") => ScheduleSortBy::StartTime,
            Some("next_date") => ScheduleSortBy::NextDate,
            _ => ScheduleSortBy::DayOfWeek,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            ScheduleSortBy::DayOfWeek => "day_of_week",
            ScheduleSortBy::ServiceType => "service_type",
            ScheduleSortBy::Barangay => "barangay",
            ScheduleSortBy::StartTime => "start_time",
            ScheduleSortBy::NextDate => "next_date",
        }
    }
}
