use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::features::users::models::UserRole;

/// Comment joined with its author
#[derive(Debug, Clone, FromRow)]
pub struct ReportCommentRow {
    pub id: Uuid,
    pub report_id: Uuid,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub user_first_name: String,
    pub user_last_name: String,
    pub user_role: UserRole,
}
