use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Image attached to a report, stored by URL
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ReportImage {
    pub id: Uuid,
    #[serde(skip)]
    pub report_id: Uuid,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}
