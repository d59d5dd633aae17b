/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// UPLOAD LIMITS
// =============================================================================

/// Maximum size of a single uploaded image (5MB)
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Maximum number of images attached to one report
pub const MAX_REPORT_IMAGES: usize = 5;

/// Accepted image extensions and their MIME types
pub const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
];

// =============================================================================
// DOMAIN CONSTANTS
// =============================================================================

/// Alert scope that targets every barangay
pub const BARANGAY_ALL: &str = "ALL";

/// Alerts without an explicit end date stay up for this many days
pub const DEFAULT_ALERT_DURATION_DAYS: i64 = 7;

/// Number of history rows returned after a status update
pub const RECENT_HISTORY_LIMIT: i64 = 5;

/// Number of read receipts returned by alert read statistics
pub const ALERT_READS_LIMIT: i64 = 100;

/// Upcoming-schedule window bounds in days
pub const DEFAULT_UPCOMING_DAYS: i64 = 7;
pub const MAX_UPCOMING_DAYS: i64 = 31;
