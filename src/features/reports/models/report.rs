use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Report status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Assigned,
    InProgress,
    Resolved,
    Closed,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Assigned => "assigned",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Closed => "closed",
            ReportStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "report_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl ReportPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPriority::Low => "low",
            ReportPriority::Medium => "medium",
            ReportPriority::High => "high",
            ReportPriority::Critical => "critical",
        }
    }
}

/// Kind of issue being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "report_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Garbage,
    RoadDamage,
    Flooding,
    Electricity,
    WaterSupply,
    PublicSafety,
    Others,
}

impl ReportType {
    pub const ALL: [ReportType; 7] = [
        ReportType::Garbage,
        ReportType::RoadDamage,
        ReportType::Flooding,
        ReportType::Electricity,
        ReportType::WaterSupply,
        ReportType::PublicSafety,
        ReportType::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Garbage => "garbage",
            ReportType::RoadDamage => "road_damage",
            ReportType::Flooding => "flooding",
            ReportType::Electricity => "electricity",
            ReportType::WaterSupply => "water_supply",
            ReportType::PublicSafety => "public_safety",
            ReportType::Others => "others",
        }
    }
}

impl std::str::FromStr for ReportType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

/// Database model for report
#[derive(Debug, Clone, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
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
}

/// Data for creating a new report
#[derive(Debug)]
pub struct CreateReport {
    pub user_id: Uuid,
    pub report_type: ReportType,
    pub title: String,
    pub description: String,
    pub location_address: String,
    pub location_lat: f64,
    pub location_lng: f64,
    pub barangay: String,
}

/// Detail fields that may change after creation
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub report_type: Option<ReportType>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location_address: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub barangay: Option<String>,
    pub priority: Option<ReportPriority>,
}

impl UpdateReport {
    pub fn is_empty(&self) -> bool {
        self.report_type.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.location_address.is_none()
            && self.location_lat.is_none()
            && self.location_lng.is_none()
            && self.barangay.is_none()
            && self.priority.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_parses_wire_names() {
        assert_eq!("road_damage".parse::<ReportType>(), Ok(ReportType::RoadDamage));
        assert_eq!("others".parse::<ReportType>(), Ok(ReportType::Others));
        assert!("Garbage".parse::<ReportType>().is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(ReportStatus::InProgress).unwrap(),
            "in_progress"
        );
        assert_eq!(ReportPriority::default(), ReportPriority::Medium);
    }
}
