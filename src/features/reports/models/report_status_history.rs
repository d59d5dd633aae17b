use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::ReportStatus;
use crate::features::users::models::UserRole;

/// Append-only status log entry joined with the acting user.
/// `old_status` is empty for the creation entry.
#[derive(Debug, Clone, FromRow)]
pub struct ReportStatusHistoryRow {
    pub id: Uuid,
    pub report_id: Uuid,
    pub old_status: Option<ReportStatus>,
    pub new_status: ReportStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub user_first_name: String,
    pub user_last_name: String,
    pub user_role: UserRole,
}
