use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::core::error::{AppError, Result};
use crate::shared::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Envelope shared by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>, message: Option<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message,
            data,
            errors: None,
        }
    }

    pub fn ok(data: T) -> Self {
        Self::success(Some(data), None)
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self::success(Some(data), Some(message.into()))
    }

    pub fn error(message: String, errors: Option<Vec<String>>) -> ApiResponse<()> {
        ApiResponse {
            status: ResponseStatus::Error,
            message: Some(message),
            data: None,
            errors,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self::success(None, Some(message.into()))
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Standard pagination query parameters for all list endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct PaginationQuery {
    /// Page number (1-indexed, default: 1)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,

    /// Number of items per page (default: 10, max: 100)
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationQuery {
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit }
    }

    /// Rejects out-of-range values instead of silently clamping them
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.page < 1 {
            errors.push("Page must be a positive integer".to_string());
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.limit) {
            errors.push(format!("Limit must be between 1 and {}", MAX_PAGE_SIZE));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }

    /// Calculate SQL OFFSET from page number
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit()
    }

    /// Get clamped limit (respects MAX_PAGE_SIZE)
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn meta(&self, total: i64) -> PaginationMeta {
        PaginationMeta::new(total, self.page.max(1), self.limit())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            total,
            page,
            limit,
            total_pages,
        }
    }
}

// =============================================================================
// SORTING
// =============================================================================

/// Sort direction. Anything other than `asc` (any case) reads as `DESC`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
pub enum SortDirection {
    #[default]
    Desc,
    Asc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn parse_or(value: Option<&str>, default: SortDirection) -> Self {
        match value.map(|v| v.trim().to_ascii_uppercase()) {
            Some(v) if v == "ASC" => SortDirection::Asc,
            Some(v) if v == "DESC" => SortDirection::Desc,
            Some(_) => SortDirection::Desc,
            None => default,
        }
    }
}

// =============================================================================
// PARTIAL UPDATES
// =============================================================================

/// Deserializes a field so that an absent key stays `None` while an explicit
/// `null` becomes `Some(None)`. Pair with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_page_two_of_twenty_five() {
        let query = PaginationQuery::new(2, 10);
        assert_eq!(query.offset(), 10);
        assert_eq!(query.limit(), 10);

        let meta = query.meta(25);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.page, 2);
        assert_eq!(meta.total, 25);
    }

    #[test]
    fn test_pagination_meta_edges() {
        assert_eq!(PaginationMeta::new(0, 1, 10).total_pages, 0);
        assert_eq!(PaginationMeta::new(10, 1, 10).total_pages, 1);
        assert_eq!(PaginationMeta::new(11, 1, 10).total_pages, 2);
    }

    #[test]
    fn test_pagination_rejects_out_of_range() {
        assert!(PaginationQuery::new(0, 10).validate().is_err());
        assert!(PaginationQuery::new(1, 0).validate().is_err());
        assert!(PaginationQuery::new(1, 101).validate().is_err());
        assert!(PaginationQuery::new(1, 100).validate().is_ok());
    }

    #[test]
    fn test_sort_direction_parsing() {
        assert_eq!(
            SortDirection::parse_or(Some("asc"), SortDirection::Desc),
            SortDirection::Asc
        );
        assert_eq!(
            SortDirection::parse_or(Some("DESC"), SortDirection::Asc),
            SortDirection::Desc
        );
        assert_eq!(
            SortDirection::parse_or(Some("; DROP TABLE"), SortDirection::Asc),
            SortDirection::Desc
        );
        assert_eq!(
            SortDirection::parse_or(None, SortDirection::Asc),
            SortDirection::Asc
        );
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        end_date: Option<Option<String>>,
    }

    #[test]
    fn test_double_option_distinguishes_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.end_date, None);

        let cleared: Patch = serde_json::from_str(r#"{"end_date": null}"#).unwrap();
        assert_eq!(cleared.end_date, Some(None));

        let set: Patch = serde_json::from_str(r#"{"end_date": "2025-01-01"}"#).unwrap();
        assert_eq!(set.end_date, Some(Some("2025-01-01".to_string())));
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::with_message(1, "done")).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "done");
        assert_eq!(body["data"], 1);
        assert!(body.get("errors").is_none());
    }
}
