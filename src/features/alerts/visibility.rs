//! Who sees which alert, and the read-receipt arithmetic built on top.
//!
//! Citizen listings and unread counts cover alerts addressed to their own
//! barangay or to `ALL`; staff see every alert. A single active alert can be
//! opened by any citizen.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::shared::constants::{BARANGAY_ALL, DEFAULT_ALERT_DURATION_DAYS};

pub const END_BEFORE_START_MESSAGE: &str = "End date must be after start date";

/// Barangay values a citizen's listing may match. An explicit filter narrows
/// the scope; a filter outside it leaves nothing to match.
pub fn citizen_barangays(own: &str, requested: Option<&str>) -> Vec<String> {
    let scope = [own, BARANGAY_ALL];
    match requested.map(str::trim).filter(|b| !b.is_empty()) {
        None => scope.iter().map(|b| b.to_string()).collect(),
        Some(b) if scope.contains(&b) => vec![b.to_string()],
        Some(_) => Vec::new(),
    }
}

/// End date to store: the given one, or one week after the start
pub fn resolve_end_date(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> DateTime<Utc> {
    end.unwrap_or_else(|| start + Duration::days(DEFAULT_ALERT_DURATION_DAYS))
}

pub fn check_date_range(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<()> {
    match end {
        Some(end) if end < start => Err(AppError::validation(END_BEFORE_START_MESSAGE)),
        _ => Ok(()),
    }
}

/// Visible alerts the user has no receipt for
pub fn count_unread(visible: &[Uuid], read: &HashSet<Uuid>) -> i64 {
    visible.iter().filter(|id| !read.contains(id)).count() as i64
}

/// Share of users who read an alert, in percent with two decimals
pub fn read_percentage(read_count: i64, total_users: i64) -> f64 {
    if total_users <= 0 {
        return 0.0;
    }
    let percent = read_count as f64 / total_users as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

/// Allow-listed `ORDER BY` columns for alert listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlertSortBy {
    #[default]
    CreatedAt,
    StartDate,
    EndDate,
    Importance,
    Title,
}

impl AlertSortBy {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("start_date") => AlertSortBy::StartDate,
            Some("end_date") => AlertSortBy::EndDate,
            Some("importance") => AlertSortBy::Importance,
            Some("title") => AlertSortBy::Title,
            _ => AlertSortBy::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            AlertSortBy::CreatedAt => "a.created_at",
            AlertSortBy::StartDate => "a.start_date",
            AlertSortBy::EndDate => "a.end_date",
            AlertSortBy::Importance => "a.importance",
            AlertSortBy::Title => "a.title",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citizen_scope() {
        assert_eq!(citizen_barangays("Poblacion", None), vec!["Poblacion", "ALL"]);
        assert_eq!(citizen_barangays("Poblacion", Some("ALL")), vec!["ALL"]);
        assert_eq!(citizen_barangays("Poblacion", Some("Poblacion")), vec!["Poblacion"]);
        assert!(citizen_barangays("Poblacion", Some("Hingotanan")).is_empty());
        assert_eq!(citizen_barangays("Poblacion", Some("  ")).len(), 2);
    }

    #[test]
    fn test_unread_is_visible_minus_read() {
        let visible: Vec<Uuid> = (0..5).map(|_| Uuid::now_v7()).collect();
        let read: HashSet<Uuid> = visible.iter().take(2).copied().collect();
        assert_eq!(count_unread(&visible, &read), 3);
        assert_eq!(count_unread(&[], &read), 0);
    }

    #[test]
    fn test_end_date_defaults_to_a_week() {
        let start = Utc::now();
        assert_eq!(resolve_end_date(start, None), start + Duration::days(7));

        let explicit = start + Duration::days(1);
        assert_eq!(resolve_end_date(start, Some(explicit)), explicit);
    }

    #[test]
    fn test_date_range() {
        let start = Utc::now();
        assert!(check_date_range(start, None).is_ok());
        assert!(check_date_range(start, Some(start)).is_ok());
        assert!(check_date_range(start, Some(start - Duration::hours(1))).is_err());
    }

    #[test]
    fn test_read_percentage() {
        assert_eq!(read_percentage(0, 0), 0.0);
        assert_eq!(read_percentage(1, 3), 33.33);
        assert_eq!(read_percentage(3, 3), 100.0);
    }

    #[test]
    fn test_sort_by_allow_list() {
        assert_eq!(AlertSortBy::parse(Some("end_date")).column(), "a.end_date");
        assert_eq!(AlertSortBy::parse(Some("body")), AlertSortBy::CreatedAt);
    }
}
