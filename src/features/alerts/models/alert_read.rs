use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Read receipt of one user for one alert. Never updated once written.
#[derive(Debug, Clone, FromRow)]
pub struct AlertRead {
    pub alert_id: Uuid,
    pub read_at: DateTime<Utc>,
}

/// Receipt joined with the reader, for read statistics
#[derive(Debug, Clone, FromRow)]
pub struct AlertReaderRow {
    pub read_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub barangay: String,
}
