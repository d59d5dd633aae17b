use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Day of the week, ordered Monday first to match the database enum
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Type,
    ToSchema,
)]
#[sqlx(type_name = "day_of_week")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn weekday(&self) -> Weekday {
        match self {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        DayOfWeek::ALL[day.num_days_from_monday() as usize]
    }
}

/// Database model for service schedule
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ServiceSchedule {
    pub id: Uuid,
    #[schema(example = "Garbage collection")]
    pub service_type: String,
    pub day_of_week: DayOfWeek,
    #[schema(value_type = String, example = "08:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "11:00:00")]
    pub end_time: NaiveTime,
    pub barangay: String,
    pub description: Option<String>,
    pub recurring: bool,
    pub next_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Schedule fields before the recurrence rules are applied. Built from a
/// create request, or from a stored schedule merged with an update.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDraft {
    pub service_type: String,
    pub day_of_week: Option<DayOfWeek>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub barangay: String,
    pub description: Option<String>,
    pub recurring: bool,
    pub next_date: Option<NaiveDate>,
}

/// Schedule fields ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleFields {
    pub service_type: String,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub barangay: String,
    pub description: Option<String>,
    pub recurring: bool,
    pub next_date: Option<NaiveDate>,
}

impl From<ServiceSchedule> for ScheduleDraft {
    fn from(s: ServiceSchedule) -> Self {
        Self {
            service_type: s.service_type,
            day_of_week: Some(s.day_of_week),
            start_time: s.start_time,
            end_time: s.end_time,
            barangay: s.barangay,
            description: s.description,
            recurring: s.recurring,
            next_date: s.next_date,
        }
    }
}
