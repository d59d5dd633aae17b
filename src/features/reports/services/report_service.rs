use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::core::database::contains_pattern;
use crate::core::error::{AppError, Result};
use crate::features::auth::policy::{
    ReportAccess, NOT_PENDING_DELETE_MESSAGE, NOT_PENDING_UPDATE_MESSAGE,
};
use crate::features::reports::dtos::{
    CommentResponseDto, CreateCommentDto, CreateReportDto, GroupCount, ReportDetailDto,
    ReportListDto, ReportListQuery, ReportResponseDto, ReportStatsDto, ReportStatusUpdateDto,
    StatusHistoryResponseDto, UpdateReportStatusDto,
};
use crate::features::reports::lifecycle::{
    plan_transition, ReportSortBy, ResolutionStats, CREATION_NOTE,
};
use crate::features::reports::models::{
    CreateReport, Report, ReportCommentRow, ReportImage, ReportStatus, ReportStatusHistoryRow,
    UpdateReport,
};
use crate::features::users::models::UserSummary;
use crate::features::users::UserService;
use crate::modules::notifications::{Notification, Notifier};
use crate::modules::storage::{delete_all_best_effort, image_key, ImageFolder, ImageStore};
use crate::shared::constants::RECENT_HISTORY_LIMIT;
use crate::shared::types::SortDirection;
use crate::shared::upload::UploadedImage;

const REPORT_COLUMNS: &str = r#"
    r.id, r.user_id, r.type, r.title, r.description, r.location_address,
    r.location_lat, r.location_lng, r.barangay, r.status, r.priority,
    r.assigned_to, r.resolution_notes, r.resolved_at, r.created_at, r.updated_at
"#;

const HISTORY_SELECT: &str = r#"
    SELECT h.id, h.report_id, h.old_status, h.new_status, h.notes, h.created_at,
           u.id AS user_id, u.first_name AS user_first_name,
           u.last_name AS user_last_name, u.role AS user_role
    FROM report_status_history h
    JOIN users u ON u.id = h.user_id
    WHERE h.report_id = $1
    ORDER BY h.created_at DESC, h.id DESC
"#;

/// Logs and wraps a database error
fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!("Failed to {}: {:?}", context, e);
        AppError::Database(e)
    }
}

/// Filters shared by the count and page queries of a listing
struct ReportFilters {
    owner_id: Option<Uuid>,
    query: ReportListQuery,
}

impl ReportFilters {
    fn push(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE 1=1");

        if let Some(owner_id) = self.owner_id {
            builder.push(" AND r.user_id = ").push_bind(owner_id);
        }
        if let Some(status) = self.query.status {
            builder.push(" AND r.status = ").push_bind(status);
        }
        if let Some(report_type) = self.query.report_type {
            builder.push(" AND r.type = ").push_bind(report_type);
        }
        if let Some(priority) = self.query.priority {
            builder.push(" AND r.priority = ").push_bind(priority);
        }
        if let Some(barangay) = self.query.barangay.as_deref().map(str::trim) {
            if !barangay.is_empty() {
                builder
                    .push(" AND r.barangay = ")
                    .push_bind(barangay.to_string());
            }
        }
        if let Some(search) = self.query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                let pattern = contains_pattern(search);
                builder
                    .push(" AND (r.title ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR r.description ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR r.location_address ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }
    }
}

/// Citizen issue reports: creation with images, staff triage and discussion
pub struct ReportService {
    pool: PgPool,
    users: Arc<UserService>,
    images: Arc<dyn ImageStore>,
    notifier: Arc<Notifier>,
}

impl ReportService {
    pub fn new(
        pool: PgPool,
        users: Arc<UserService>,
        images: Arc<dyn ImageStore>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            pool,
            users,
            images,
            notifier,
        }
    }

    /// Owner and status of a report, for authorization
    pub async fn access(&self, id: Uuid) -> Result<ReportAccess> {
        let row = sqlx::query_as::<_, (Uuid, ReportStatus)>(
            "SELECT user_id, status FROM reports WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("load report access"))?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;

        Ok(ReportAccess {
            owner_id: row.0,
            status: row.1,
        })
    }

    async fn find(&self, id: Uuid) -> Result<Report> {
        let query = format!("SELECT {} FROM reports r WHERE r.id = $1", REPORT_COLUMNS);
        sqlx::query_as::<_, Report>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get report"))?
            .ok_or_else(|| AppError::NotFound("Report not found".to_string()))
    }

    /// Uploads the images, then writes the report, its images and the
    /// creation history entry in one transaction. Uploaded objects are
    /// removed again when anything fails.
    pub async fn create(
        &self,
        user_id: Uuid,
        dto: CreateReportDto,
        images: Vec<UploadedImage>,
    ) -> Result<ReportResponseDto> {
        let mut urls = Vec::with_capacity(images.len());
        for image in images {
            let key = image_key(ImageFolder::Reports, &image.extension);
            match self.images.upload(&key, image.data, &image.content_type).await {
                Ok(url) => urls.push(url),
                Err(e) => {
                    delete_all_best_effort(self.images.as_ref(), &urls).await;
                    return Err(e);
                }
            }
        }

        let data = CreateReport {
            user_id,
            report_type: dto.report_type,
            title: dto.title.trim().to_string(),
            description: dto.description.trim().to_string(),
            location_address: dto.location_address.trim().to_string(),
            location_lat: dto.location_lat,
            location_lng: dto.location_lng,
            barangay: dto.barangay.trim().to_string(),
        };

        let report = match self.insert_with_images(&data, &urls).await {
            Ok(report) => report,
            Err(e) => {
                delete_all_best_effort(self.images.as_ref(), &urls).await;
                return Err(e);
            }
        };

        tracing::info!(
            "Created report {} with {} image(s) for user {}",
            report.id,
            urls.len(),
            user_id
        );
        Ok(report)
    }

    /// Writes the rows and loads the response before committing, so nothing
    /// can fail once the report exists.
    async fn insert_with_images(
        &self,
        data: &CreateReport,
        urls: &[String],
    ) -> Result<ReportResponseDto> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let query = format!(
            r#"
            INSERT INTO reports AS r (
                id, user_id, type, title, description, location_address,
                location_lat, location_lng, barangay
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );
        let report = sqlx::query_as::<_, Report>(&query)
            .bind(Uuid::now_v7())
            .bind(data.user_id)
            .bind(data.report_type)
            .bind(&data.title)
            .bind(&data.description)
            .bind(&data.location_address)
            .bind(data.location_lat)
            .bind(data.location_lng)
            .bind(&data.barangay)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("create report"))?;

        if !urls.is_empty() {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO report_images (id, report_id, image_url) ");
            builder.push_values(urls, |mut row, url| {
                row.push_bind(Uuid::now_v7())
                    .push_bind(report.id)
                    .push_bind(url.clone());
            });
            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(db_error("store report images"))?;
        }

        insert_history(
            &mut tx,
            report.id,
            None,
            ReportStatus::Pending,
            CREATION_NOTE,
            data.user_id,
        )
        .await?;

        let response = hydrate_report(&mut *tx, report).await?;
        tx.commit().await.map_err(db_error("commit report"))?;
        Ok(response)
    }

    /// Paginated listing. `owner_id` restricts the result to one reporter.
    pub async fn list(
        &self,
        owner_id: Option<Uuid>,
        query: ReportListQuery,
    ) -> Result<ReportListDto> {
        let pagination = query.pagination();
        pagination.validate()?;

        let sort_by = ReportSortBy::parse(query.sort_by.as_deref());
        let direction = SortDirection::parse_or(query.sort_dir.as_deref(), SortDirection::Desc);
        let filters = ReportFilters { owner_id, query };

        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM reports r");
        filters.push(&mut count_query);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count reports"))?;

        let mut page_query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM reports r", REPORT_COLUMNS));
        filters.push(&mut page_query);
        page_query
            .push(format!(
                " ORDER BY {} {}, r.id {}",
                sort_by.column(),
                direction.as_sql(),
                direction.as_sql()
            ))
            .push(" LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let reports = page_query
            .build_query_as::<Report>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list reports"))?;

        Ok(ReportListDto {
            reports: self.hydrate(reports).await?,
            pagination: pagination.meta(total),
        })
    }

    /// Report with reporter, assignee, images, comments and full history
    pub async fn get(&self, id: Uuid) -> Result<ReportDetailDto> {
        let report = self.hydrate_one(self.find(id).await?).await?;

        let comments = sqlx::query_as::<_, ReportCommentRow>(
            r#"
            SELECT c.id, c.report_id, c.comment, c.created_at,
                   u.id AS user_id, u.first_name AS user_first_name,
                   u.last_name AS user_last_name, u.role AS user_role
            FROM report_comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.report_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load report comments"))?;

        let history = sqlx::query_as::<_, ReportStatusHistoryRow>(HISTORY_SELECT)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("load report history"))?;

        Ok(ReportDetailDto {
            report,
            comments: comments.into_iter().map(Into::into).collect(),
            status_history: history.into_iter().map(Into::into).collect(),
        })
    }

    /// Changes the status (and optionally the assignee) and appends a
    /// history entry in one transaction, then tells the reporter.
    pub async fn update_status(
        &self,
        actor_id: Uuid,
        id: Uuid,
        dto: UpdateReportStatusDto,
    ) -> Result<ReportStatusUpdateDto> {
        if let Some(Some(assignee)) = dto.assigned_to {
            match self.users.find_role(assignee).await? {
                Some(role) if role.is_staff() => {}
                _ => return Err(AppError::InvalidAssignment),
            }
        }

        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let query = format!(
            "SELECT {} FROM reports r WHERE r.id = $1 FOR UPDATE",
            REPORT_COLUMNS
        );
        let current = sqlx::query_as::<_, Report>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("lock report"))?
            .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;

        let transition = plan_transition(
            current.status,
            current.resolved_at,
            dto.status,
            dto.notes.as_deref(),
            Utc::now(),
        );

        let query = format!(
            r#"
            UPDATE reports AS r SET
                status = $2,
                resolution_notes = COALESCE($3, r.resolution_notes),
                resolved_at = COALESCE($4, r.resolved_at),
                assigned_to = CASE WHEN $5 THEN $6 ELSE r.assigned_to END,
                updated_at = NOW()
            WHERE r.id = $1
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );
        let report = sqlx::query_as::<_, Report>(&query)
            .bind(id)
            .bind(transition.new_status)
            .bind(&transition.resolution_notes)
            .bind(transition.resolved_at)
            .bind(dto.assigned_to.is_some())
            .bind(dto.assigned_to.flatten())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("update report status"))?;

        insert_history(
            &mut tx,
            id,
            Some(transition.old_status),
            transition.new_status,
            &transition.history_note,
            actor_id,
        )
        .await?;

        let history_query = format!("{} LIMIT {}", HISTORY_SELECT, RECENT_HISTORY_LIMIT);
        let history = sqlx::query_as::<_, ReportStatusHistoryRow>(&history_query)
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error("load report history"))?;
        let report = hydrate_report(&mut *tx, report).await?;

        tx.commit().await.map_err(db_error("commit status change"))?;

        tracing::info!(
            "Report {} moved from {} to {} by {}",
            id,
            transition.old_status,
            transition.new_status,
            actor_id
        );

        match &report.reporter {
            Some(reporter) => self.notifier.dispatch(Notification::ReportStatusChanged {
                email: reporter.email.clone(),
                name: reporter.full_name(),
                report_title: report.title.clone(),
                old_status: transition.old_status.to_string(),
                new_status: transition.new_status.to_string(),
                notes: dto.notes.clone().filter(|n| !n.trim().is_empty()),
            }),
            None => tracing::warn!("Report {} has no reporter to notify", id),
        }

        Ok(ReportStatusUpdateDto {
            report,
            status_history: history
                .into_iter()
                .map(StatusHistoryResponseDto::from)
                .collect(),
        })
    }

    /// Partial update of report details. With `only_pending` the row is
    /// matched only while the report is still pending.
    pub async fn update(
        &self,
        id: Uuid,
        data: UpdateReport,
        only_pending: bool,
    ) -> Result<ReportResponseDto> {
        if data.is_empty() {
            return self.hydrate_one(self.find(id).await?).await;
        }

        let mut builder = update_query(id, data, only_pending);
        let updated = builder
            .build_query_as::<Report>()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("update report"))?;

        let Some(report) = updated else {
            return Err(self.missed_row(id, only_pending, NOT_PENDING_UPDATE_MESSAGE).await);
        };

        tracing::info!("Updated report {}", id);
        self.hydrate_one(report).await
    }

    /// Error for a guarded write that matched nothing: gone, or no longer pending
    async fn missed_row(&self, id: Uuid, only_pending: bool, message: &str) -> AppError {
        if !only_pending {
            return AppError::NotFound("Report not found".to_string());
        }
        match self.access(id).await {
            Ok(_) => AppError::Forbidden(message.to_string()),
            Err(e) => e,
        }
    }

    /// Deletes the report with its images, comments and history. Stored
    /// image objects are removed after the rows are gone.
    pub async fn delete(&self, id: Uuid, only_pending: bool) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        let urls = sqlx::query_scalar::<_, String>(
            "SELECT image_url FROM report_images WHERE report_id = $1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("load report images"))?;

        let deleted = sqlx::query(delete_sql(only_pending))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete report"))?
            .rows_affected();

        if deleted == 0 {
            drop(tx);
            return Err(self.missed_row(id, only_pending, NOT_PENDING_DELETE_MESSAGE).await);
        }

        tx.commit().await.map_err(db_error("commit report deletion"))?;

        delete_all_best_effort(self.images.as_ref(), &urls).await;
        tracing::info!("Deleted report {} and {} image(s)", id, urls.len());
        Ok(())
    }

    pub async fn add_comment(
        &self,
        actor_id: Uuid,
        id: Uuid,
        dto: CreateCommentDto,
    ) -> Result<CommentResponseDto> {
        let row = sqlx::query_as::<_, ReportCommentRow>(
            r#"
            WITH inserted AS (
                INSERT INTO report_comments (id, report_id, user_id, comment)
                VALUES ($1, $2, $3, $4)
                RETURNING id, report_id, user_id, comment, created_at
            )
            SELECT i.id, i.report_id, i.comment, i.created_at,
                   u.id AS user_id, u.first_name AS user_first_name,
                   u.last_name AS user_last_name, u.role AS user_role
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(id)
        .bind(actor_id)
        .bind(dto.comment.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("add report comment"))?;

        tracing::info!("User {} commented on report {}", actor_id, id);
        Ok(row.into())
    }

    /// Counts by status, type, barangay and priority plus resolution times
    pub async fn stats(&self) -> Result<ReportStatsDto> {
        let by_status = self.group_counts("status", "key").await?;
        let by_type = self.group_counts("type", "key").await?;
        let by_barangay = self.group_counts("barangay", "count DESC, key").await?;
        let by_priority = self.group_counts("priority", "key").await?;

        let hours = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT (EXTRACT(EPOCH FROM (resolved_at - created_at)) / 3600.0)::float8
            FROM reports
            WHERE status = 'resolved' AND resolved_at IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load resolution times"))?;

        Ok(ReportStatsDto {
            by_status,
            by_type,
            by_barangay,
            by_priority,
            resolution: ResolutionStats::from_hours(&hours),
        })
    }

    async fn group_counts(
        &self,
        column: &'static str,
        order: &'static str,
    ) -> Result<Vec<GroupCount>> {
        let query = format!(
            "SELECT {col}::text AS key, COUNT(*) AS count FROM reports GROUP BY {col} ORDER BY {order}",
            col = column,
            order = order
        );
        sqlx::query_as::<_, GroupCount>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("count reports by group"))
    }

    async fn hydrate_one(&self, report: Report) -> Result<ReportResponseDto> {
        let mut conn = self.pool.acquire().await.map_err(db_error("acquire connection"))?;
        hydrate_report(&mut conn, report).await
    }

    async fn hydrate(&self, reports: Vec<Report>) -> Result<Vec<ReportResponseDto>> {
        let mut conn = self.pool.acquire().await.map_err(db_error("acquire connection"))?;
        hydrate_reports(&mut conn, reports).await
    }
}

fn update_query(
    id: Uuid,
    data: UpdateReport,
    only_pending: bool,
) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("UPDATE reports AS r SET updated_at = NOW()");

    if let Some(report_type) = data.report_type {
        builder.push(", type = ").push_bind(report_type);
    }
    if let Some(title) = data.title {
        builder.push(", title = ").push_bind(title);
    }
    if let Some(description) = data.description {
        builder.push(", description = ").push_bind(description);
    }
    if let Some(address) = data.location_address {
        builder.push(", location_address = ").push_bind(address);
    }
    if let Some(lat) = data.location_lat {
        builder.push(", location_lat = ").push_bind(lat);
    }
    if let Some(lng) = data.location_lng {
        builder.push(", location_lng = ").push_bind(lng);
    }
    if let Some(barangay) = data.barangay {
        builder.push(", barangay = ").push_bind(barangay);
    }
    if let Some(priority) = data.priority {
        builder.push(", priority = ").push_bind(priority);
    }

    builder.push(" WHERE r.id = ").push_bind(id);
    if only_pending {
        builder.push(" AND r.status = 'pending'");
    }
    builder.push(format!(" RETURNING {}", REPORT_COLUMNS));
    builder
}

fn delete_sql(only_pending: bool) -> &'static str {
    if only_pending {
        "DELETE FROM reports WHERE id = $1 AND status = 'pending'"
    } else {
        "DELETE FROM reports WHERE id = $1"
    }
}

async fn hydrate_report(conn: &mut PgConnection, report: Report) -> Result<ReportResponseDto> {
    hydrate_reports(conn, vec![report])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Report hydration returned nothing".to_string()))
}

/// Attaches reporter, assignee and images with one query each
async fn hydrate_reports(
    conn: &mut PgConnection,
    reports: Vec<Report>,
) -> Result<Vec<ReportResponseDto>> {
    if reports.is_empty() {
        return Ok(Vec::new());
    }

    let report_ids: Vec<Uuid> = reports.iter().map(|r| r.id).collect();
    let mut user_ids: Vec<Uuid> = reports
        .iter()
        .flat_map(|r| std::iter::once(r.user_id).chain(r.assigned_to))
        .collect();
    user_ids.sort_unstable();
    user_ids.dedup();

    let users: HashMap<Uuid, UserSummary> = sqlx::query_as::<_, UserSummary>(
        "SELECT id, first_name, last_name, email, mobile FROM users WHERE id = ANY($1)",
    )
    .bind(&user_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error("load report users"))?
    .into_iter()
    .map(|u| (u.id, u))
    .collect();

    let mut images: HashMap<Uuid, Vec<ReportImage>> = HashMap::new();
    let rows = sqlx::query_as::<_, ReportImage>(
        r#"
        SELECT id, report_id, image_url, created_at
        FROM report_images
        WHERE report_id = ANY($1)
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(&report_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error("load report images"))?;
    for image in rows {
        images.entry(image.report_id).or_default().push(image);
    }

    Ok(reports
        .into_iter()
        .map(|report| {
            let reporter = users.get(&report.user_id).cloned();
            let assignee = report.assigned_to.and_then(|id| users.get(&id).cloned());
            let report_images = images.remove(&report.id).unwrap_or_default();
            ReportResponseDto::new(report, reporter, assignee, report_images)
        })
        .collect())
}

async fn insert_history(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    old_status: Option<ReportStatus>,
    new_status: ReportStatus,
    notes: &str,
    user_id: Uuid,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO report_status_history (id, report_id, old_status, new_status, notes, user_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(report_id)
    .bind(old_status)
    .bind(new_status)
    .bind(notes)
    .bind(user_id)
    .execute(&mut **tx)
    .await
    .map_err(db_error("record status history"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reports::models::{ReportPriority, ReportType};
    use crate::features::users::models::UserRole;
    use crate::shared::test_helpers::{seed_user, test_image_store, test_notifier};

    fn sql_for(filters: &ReportFilters) -> String {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM reports r");
        filters.push(&mut builder);
        builder.sql().to_string()
    }

    #[test]
    fn test_filters_without_criteria() {
        let filters = ReportFilters {
            owner_id: None,
            query: ReportListQuery::default(),
        };
        assert_eq!(sql_for(&filters), "SELECT COUNT(*) FROM reports r WHERE 1=1");
    }

    #[test]
    fn test_filters_bind_every_criterion() {
        let filters = ReportFilters {
            owner_id: Some(Uuid::now_v7()),
            query: ReportListQuery {
                status: Some(ReportStatus::Pending),
                report_type: Some(ReportType::Flooding),
                barangay: Some("Poblacion".to_string()),
                search: Some("drain".to_string()),
                ..Default::default()
            },
        };
        let sql = sql_for(&filters);
        assert!(sql.contains("r.user_id = $1"));
        assert!(sql.contains("r.status = $2"));
        assert!(sql.contains("r.type = $3"));
        assert!(sql.contains("r.barangay = $4"));
        assert!(sql.contains("r.title ILIKE $5"));
        assert!(sql.contains("r.location_address ILIKE $7"));
        assert!(!sql.contains("drain"));
    }

    #[test]
    fn test_blank_search_and_barangay_are_ignored() {
        let filters = ReportFilters {
            owner_id: None,
            query: ReportListQuery {
                barangay: Some("  ".to_string()),
                search: Some("".to_string()),
                ..Default::default()
            },
        };
        assert!(!sql_for(&filters).contains("ILIKE"));
        assert!(!sql_for(&filters).contains("barangay"));
    }

    #[test]
    fn test_citizen_update_is_guarded_by_status() {
        let data = UpdateReport {
            title: Some("Clogged drain on Rizal St".to_string()),
            ..Default::default()
        };
        let guarded = update_query(Uuid::now_v7(), data, true);
        assert!(guarded.sql().contains("WHERE r.id = $2 AND r.status = 'pending'"));

        let open = update_query(Uuid::now_v7(), UpdateReport::default(), false);
        assert!(!open.sql().contains("r.status = 'pending'"));
    }

    #[test]
    fn test_citizen_delete_is_guarded_by_status() {
        assert!(delete_sql(true).ends_with("AND status = 'pending'"));
        assert!(!delete_sql(false).contains("pending"));
    }

    fn service(pool: &PgPool) -> ReportService {
        ReportService::new(
            pool.clone(),
            Arc::new(UserService::new(pool.clone())),
            test_image_store(),
            test_notifier(),
        )
    }

    fn new_report() -> CreateReportDto {
        CreateReportDto {
            report_type: ReportType::Garbage,
            title: "Uncollected garbage near the market".to_string(),
            description: "Bags have piled up for a week".to_string(),
            location_address: "Public market, Poblacion".to_string(),
            location_lat: 10.13,
            location_lng: 124.37,
            barangay: "Poblacion".to_string(),
        }
    }

    fn move_to(status: ReportStatus, notes: Option<&str>) -> UpdateReportStatusDto {
        UpdateReportStatusDto {
            status,
            notes: notes.map(str::to_string),
            assigned_to: None,
        }
    }

    async fn history_count(pool: &PgPool, id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM report_status_history WHERE report_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a local Postgres"]
    async fn test_history_row_per_transition(pool: PgPool) {
        let citizen = seed_user(&pool, UserRole::Citizen).await;
        let official = seed_user(&pool, UserRole::Official).await;
        let reports = service(&pool);

        let report = reports.create(citizen.id, new_report(), vec![]).await.unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(history_count(&pool, report.id).await, 1);

        let assign = UpdateReportStatusDto {
            assigned_to: Some(Some(official.id)),
            ..move_to(ReportStatus::Assigned, None)
        };
        reports
            .update_status(official.id, report.id, assign)
            .await
            .unwrap();
        reports
            .update_status(official.id, report.id, move_to(ReportStatus::InProgress, None))
            .await
            .unwrap();
        let resolve = move_to(ReportStatus::Resolved, Some("Collected"));
        let updated = reports
            .update_status(official.id, report.id, resolve)
            .await
            .unwrap();

        assert_eq!(history_count(&pool, report.id).await, 4);
        assert_eq!(updated.status_history.len(), 4);
        assert_eq!(updated.status_history[0].old_status, Some(ReportStatus::InProgress));
        assert_eq!(updated.status_history[0].new_status, ReportStatus::Resolved);
        assert_eq!(updated.status_history[3].old_status, None);
        assert_eq!(updated.report.assignee.map(|a| a.id), Some(official.id));

        let creation_rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM report_status_history WHERE report_id = $1 AND old_status IS NULL",
        )
        .bind(report.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(creation_rows, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a local Postgres"]
    async fn test_resolved_at_survives_reopening(pool: PgPool) {
        let citizen = seed_user(&pool, UserRole::Citizen).await;
        let admin = seed_user(&pool, UserRole::Admin).await;
        let reports = service(&pool);
        let report = reports.create(citizen.id, new_report(), vec![]).await.unwrap();

        let first = reports
            .update_status(admin.id, report.id, move_to(ReportStatus::Resolved, Some("Done")))
            .await
            .unwrap();
        let stamp = first.report.resolved_at.expect("stamped on first resolution");
        assert_eq!(first.report.resolution_notes.as_deref(), Some("Done"));

        reports
            .update_status(admin.id, report.id, move_to(ReportStatus::InProgress, None))
            .await
            .unwrap();
        let again = reports
            .update_status(admin.id, report.id, move_to(ReportStatus::Resolved, None))
            .await
            .unwrap();

        assert_eq!(again.report.resolved_at, Some(stamp));
        assert_eq!(history_count(&pool, report.id).await, 4);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a local Postgres"]
    async fn test_citizen_write_after_triage_is_refused(pool: PgPool) {
        let citizen = seed_user(&pool, UserRole::Citizen).await;
        let official = seed_user(&pool, UserRole::Official).await;
        let reports = service(&pool);
        let report = reports.create(citizen.id, new_report(), vec![]).await.unwrap();

        // staff moves the report on after the citizen's access check
        reports
            .update_status(official.id, report.id, move_to(ReportStatus::InProgress, None))
            .await
            .unwrap();

        let edit = UpdateReport {
            title: Some("Garbage still uncollected".to_string()),
            ..Default::default()
        };
        let result = reports.update(report.id, edit, true).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let result = reports.delete(report.id, true).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert!(reports.access(report.id).await.is_ok());

        let edit = UpdateReport {
            priority: Some(ReportPriority::High),
            ..Default::default()
        };
        let updated = reports.update(report.id, edit, false).await.unwrap();
        assert_eq!(updated.title, report.title);
        reports.delete(report.id, false).await.unwrap();
        assert!(matches!(
            reports.access(report.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
