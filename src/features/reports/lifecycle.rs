//! Report state machine.
//!
//! Any status may follow any other; what the lifecycle fixes is the
//! bookkeeping around a change: every change appends one history entry and
//! `resolved_at` is stamped once, the first time a report is resolved.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::models::ReportStatus;

/// History note for the entry written at creation
pub const CREATION_NOTE: &str = "Report created";

/// Column writes and history entry for one status change
#[derive(Debug, Clone, PartialEq)]
pub struct StatusTransition {
    pub old_status: ReportStatus,
    pub new_status: ReportStatus,
    /// New `resolution_notes`, when the change records one
    pub resolution_notes: Option<String>,
    /// New `resolved_at`, when the change stamps one
    pub resolved_at: Option<DateTime<Utc>>,
    pub history_note: String,
}

pub fn default_note(old: ReportStatus, new: ReportStatus) -> String {
    format!("Status updated from {} to {}", old, new)
}

/// Plans moving a report from `current` to `new_status`.
///
/// `already_resolved_at` is the report's existing `resolved_at`. Blank notes
/// count as absent.
pub fn plan_transition(
    current: ReportStatus,
    already_resolved_at: Option<DateTime<Utc>>,
    new_status: ReportStatus,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> StatusTransition {
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());
    let resolving = new_status == ReportStatus::Resolved;

    StatusTransition {
        old_status: current,
        new_status,
        resolution_notes: notes.filter(|_| resolving).map(str::to_string),
        resolved_at: if resolving && already_resolved_at.is_none() {
            Some(now)
        } else {
            None
        },
        history_note: notes
            .map(str::to_string)
            .unwrap_or_else(|| default_note(current, new_status)),
    }
}

/// Allow-listed `ORDER BY` columns for report listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportSortBy {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Status,
    Priority,
}

impl ReportSortBy {
    /// Unknown names fall back to `created_at`
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("updated_at") => ReportSortBy::UpdatedAt,
            Some("title") => ReportSortBy::Title,
            Some("status") => ReportSortBy::Status,
            Some("priority") => ReportSortBy::Priority,
            _ => ReportSortBy::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            ReportSortBy::CreatedAt => "r.created_at",
            ReportSortBy::UpdatedAt => "r.updated_at",
            ReportSortBy::Title => "r.title",
            ReportSortBy::Status => "r.status",
            ReportSortBy::Priority => "r.priority",
        }
    }
}

/// Resolution-time summary in hours over resolved reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ResolutionStats {
    pub resolved_count: i64,
    pub avg_hours: f64,
    pub min_hours: f64,
    pub max_hours: f64,
}

impl ResolutionStats {
    /// All zeros when nothing has been resolved
    pub fn from_hours(hours: &[f64]) -> Self {
        if hours.is_empty() {
            return Self {
                resolved_count: 0,
                avg_hours: 0.0,
                min_hours: 0.0,
                max_hours: 0.0,
            };
        }

        let sum: f64 = hours.iter().sum();
        let min = hours.iter().copied().fold(f64::INFINITY, f64::min);
        let max = hours.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            resolved_count: hours.len() as i64,
            avg_hours: sum / hours.len() as f64,
            min_hours: min,
            max_hours: max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_first_resolution_stamps_resolved_at_and_notes() {
        let now = Utc::now();
        let t = plan_transition(
            ReportStatus::InProgress,
            None,
            ReportStatus::Resolved,
            Some("Drainage cleared"),
            now,
        );
        assert_eq!(t.resolved_at, Some(now));
        assert_eq!(t.resolution_notes.as_deref(), Some("Drainage cleared"));
        assert_eq!(t.history_note, "Drainage cleared");
    }

    #[test]
    fn test_resolution_without_notes_still_stamps_once() {
        let now = Utc::now();
        let t = plan_transition(ReportStatus::Pending, None, ReportStatus::Resolved, None, now);
        assert_eq!(t.resolved_at, Some(now));
        assert_eq!(t.resolution_notes, None);
        assert_eq!(t.history_note, "Status updated from pending to resolved");

        // Reopened and resolved again: the first stamp stays
        let earlier = now - Duration::days(2);
        let again = plan_transition(
            ReportStatus::InProgress,
            Some(earlier),
            ReportStatus::Resolved,
            Some("Fixed for good"),
            now,
        );
        assert_eq!(again.resolved_at, None);
        assert_eq!(again.resolution_notes.as_deref(), Some("Fixed for good"));
    }

    #[test]
    fn test_non_resolving_change_keeps_notes_in_history_only() {
        let t = plan_transition(
            ReportStatus::Pending,
            None,
            ReportStatus::Assigned,
            Some("  Sent to engineering  "),
            Utc::now(),
        );
        assert_eq!(t.resolved_at, None);
        assert_eq!(t.resolution_notes, None);
        assert_eq!(t.history_note, "Sent to engineering");
    }

    #[test]
    fn test_blank_notes_use_default() {
        let t = plan_transition(
            ReportStatus::Assigned,
            None,
            ReportStatus::Closed,
            Some("   "),
            Utc::now(),
        );
        assert_eq!(t.history_note, "Status updated from assigned to closed");
    }

    #[test]
    fn test_sort_by_falls_back_to_created_at() {
        assert_eq!(ReportSortBy::parse(Some("priority")), ReportSortBy::Priority);
        assert_eq!(ReportSortBy::parse(Some("DROP TABLE")), ReportSortBy::CreatedAt);
        assert_eq!(ReportSortBy::parse(None).column(), "r.created_at");
    }

    #[test]
    fn test_resolution_stats() {
        assert_eq!(
            ResolutionStats::from_hours(&[]),
            ResolutionStats {
                resolved_count: 0,
                avg_hours: 0.0,
                min_hours: 0.0,
                max_hours: 0.0
            }
        );

        let stats = ResolutionStats::from_hours(&[2.0, 10.0, 6.0]);
        assert_eq!(stats.resolved_count, 3);
        assert_eq!(stats.avg_hours, 6.0);
        assert_eq!(stats.min_hours, 2.0);
        assert_eq!(stats.max_hours, 10.0);
    }
}
