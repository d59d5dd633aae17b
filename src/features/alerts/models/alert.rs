use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::users::models::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "alert_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Emergency,
    Weather,
    Event,
    Announcement,
    Health,
    Traffic,
}

impl AlertCategory {
    pub const ALL: [AlertCategory; 6] = [
        AlertCategory::Emergency,
        AlertCategory::Weather,
        AlertCategory::Event,
        AlertCategory::Announcement,
        AlertCategory::Health,
        AlertCategory::Traffic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::Emergency => "emergency",
            AlertCategory::Weather => "weather",
            AlertCategory::Event => "event",
            AlertCategory::Announcement => "announcement",
            AlertCategory::Health => "health",
            AlertCategory::Traffic => "traffic",
        }
    }
}

impl std::str::FromStr for AlertCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "alert_importance", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertImportance {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::str::FromStr for AlertImportance {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(AlertImportance::Low),
            "medium" => Ok(AlertImportance::Medium),
            "high" => Ok(AlertImportance::High),
            "critical" => Ok(AlertImportance::Critical),
            _ => Err(()),
        }
    }
}

/// Database model for alert
#[derive(Debug, Clone, FromRow)]
pub struct Alert {
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
}

/// Alert row joined with its creator
#[derive(Debug, Clone, FromRow)]
pub struct AlertWithCreator {
    #[sqlx(flatten)]
    pub alert: Alert,
    pub creator_first_name: Option<String>,
    pub creator_last_name: Option<String>,
    pub creator_role: Option<UserRole>,
}

#[derive(Debug)]
pub struct CreateAlert {
    pub title: String,
    pub body: String,
    pub category: AlertCategory,
    pub importance: AlertImportance,
    pub barangay: String,
    pub image_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_by: Uuid,
}

/// Partial alert update. `end_date: Some(None)` clears the end date.
#[derive(Debug, Default)]
pub struct UpdateAlert {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category: Option<AlertCategory>,
    pub importance: Option<AlertImportance>,
    pub barangay: Option<String>,
    pub image_url: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_and_importance_parse() {
        assert_eq!("weather".parse::<AlertCategory>(), Ok(AlertCategory::Weather));
        assert!("storm".parse::<AlertCategory>().is_err());
        assert_eq!("critical".parse::<AlertImportance>(), Ok(AlertImportance::Critical));
        assert_eq!(AlertImportance::default(), AlertImportance::Medium);
    }
}
