use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::database::contains_pattern;
use crate::core::error::{AppError, Result};
use crate::features::alerts::dtos::{
    AlertListDto, AlertListQuery, AlertResponseDto, AlertStatsDto, CreateAlertDto,
    UpdateAlertDto,
};
use crate::features::alerts::models::{AlertRead, AlertReaderRow, AlertWithCreator, CreateAlert};
use crate::features::alerts::visibility::{
    check_date_range, citizen_barangays, count_unread, read_percentage, resolve_end_date,
    AlertSortBy,
};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::users::UserService;
use crate::modules::storage::{delete_all_best_effort, image_key, ImageFolder, ImageStore};
use crate::shared::constants::ALERT_READS_LIMIT;
use crate::shared::types::SortDirection;
use crate::shared::upload::UploadedImage;

const ALERT_SELECT: &str = r#"
    SELECT a.id, a.title, a.body, a.category, a.importance, a.barangay, a.image_url,
           a.start_date, a.end_date, a.is_active, a.created_by, a.created_at, a.updated_at,
           u.first_name AS creator_first_name, u.last_name AS creator_last_name,
           u.role AS creator_role
    FROM alerts a
    LEFT JOIN users u ON u.id = a.created_by
"#;

fn not_found() -> AppError {
    AppError::NotFound("Alert not found".to_string())
}

/// Barangay restriction applied to alert queries
enum BarangayFilter {
    Any,
    Exactly(String),
    OneOf(Vec<String>),
}

impl BarangayFilter {
    fn for_actor(actor: &AuthenticatedUser, requested: Option<&str>) -> Self {
        if actor.is_citizen() {
            return BarangayFilter::OneOf(citizen_barangays(&actor.barangay, requested));
        }
        match requested.map(str::trim).filter(|b| !b.is_empty()) {
            Some(b) => BarangayFilter::Exactly(b.to_string()),
            None => BarangayFilter::Any,
        }
    }

    fn push(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            BarangayFilter::Any => {}
            BarangayFilter::Exactly(b) => {
                builder.push(" AND a.barangay = ").push_bind(b.clone());
            }
            BarangayFilter::OneOf(list) if list.is_empty() => {
                builder.push(" AND FALSE");
            }
            BarangayFilter::OneOf(list) => {
                builder.push(" AND a.barangay = ANY(").push_bind(list.clone()).push(")");
            }
        }
    }
}

struct AlertFilters {
    barangay: BarangayFilter,
    is_active: Option<bool>,
    query: AlertListQuery,
}

impl AlertFilters {
    fn push(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE 1=1");
        self.barangay.push(builder);

        if let Some(is_active) = self.is_active {
            builder.push(" AND a.is_active = ").push_bind(is_active);
        }
        if let Some(category) = self.query.category {
            builder.push(" AND a.category = ").push_bind(category);
        }
        if let Some(importance) = self.query.importance {
            builder.push(" AND a.importance = ").push_bind(importance);
        }
        if let Some(search) = self.query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                let pattern = contains_pattern(search);
                builder
                    .push(" AND (a.title ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR a.body ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }
    }
}

/// Official announcements and their per-user read receipts
pub struct AlertService {
    pool: PgPool,
    users: Arc<UserService>,
    images: Arc<dyn ImageStore>,
}

impl AlertService {
    pub fn new(pool: PgPool, users: Arc<UserService>, images: Arc<dyn ImageStore>) -> Self {
        Self {
            pool,
            users,
            images,
        }
    }

    pub async fn find(&self, id: Uuid) -> Result<AlertWithCreator> {
        let query = format!("{} WHERE a.id = $1", ALERT_SELECT);
        sqlx::query_as::<_, AlertWithCreator>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get alert: {:?}", e);
                AppError::Database(e)
            })?
            .ok_or_else(not_found)
    }

    async fn upload(&self, image: Option<UploadedImage>) -> Result<Option<String>> {
        match image {
            Some(image) => {
                let key = image_key(ImageFolder::Alerts, &image.extension);
                let url = self
                    .images
                    .upload(&key, image.data, &image.content_type)
                    .await?;
                Ok(Some(url))
            }
            None => Ok(None),
        }
    }

    pub async fn create(
        &self,
        actor_id: Uuid,
        dto: CreateAlertDto,
        image: Option<UploadedImage>,
    ) -> Result<AlertResponseDto> {
        let start_date = dto.start_date.unwrap_or_else(Utc::now);
        let data = CreateAlert {
            title: dto.title,
            body: dto.body,
            category: dto.category,
            importance: dto.importance,
            barangay: dto.barangay,
            image_url: self.upload(image).await?,
            start_date,
            end_date: resolve_end_date(start_date, dto.end_date),
            is_active: dto.is_active,
            created_by: actor_id,
        };

        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO alerts (
                id, title, body, category, importance, barangay, image_url,
                start_date, end_date, is_active, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&data.title)
        .bind(&data.body)
        .bind(data.category)
        .bind(data.importance)
        .bind(&data.barangay)
        .bind(&data.image_url)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.is_active)
        .bind(data.created_by)
        .fetch_one(&self.pool)
        .await;

        let id = match inserted {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("Failed to create alert: {:?}", e);
                if let Some(url) = data.image_url {
                    delete_all_best_effort(self.images.as_ref(), &[url]).await;
                }
                return Err(AppError::Database(e));
            }
        };

        tracing::info!("Alert {} created by {}", id, actor_id);
        Ok(self.find(id).await?.into())
    }

    /// Partial update. The date range is checked on the merged result and a
    /// new image replaces the stored one.
    pub async fn update(
        &self,
        id: Uuid,
        dto: UpdateAlertDto,
        image: Option<UploadedImage>,
    ) -> Result<AlertResponseDto> {
        let existing = self.find(id).await?.alert;

        let start = dto.start_date.unwrap_or(existing.start_date);
        let end = match dto.end_date {
            Some(end) => end,
            None => existing.end_date,
        };
        check_date_range(start, end)?;

        let new_image = self.upload(image).await?;
        let data = dto.into_update(new_image.clone());

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE alerts SET updated_at = NOW()");
        if let Some(title) = data.title {
            builder.push(", title = ").push_bind(title);
        }
        if let Some(body) = data.body {
            builder.push(", body = ").push_bind(body);
        }
        if let Some(category) = data.category {
            builder.push(", category = ").push_bind(category);
        }
        if let Some(importance) = data.importance {
            builder.push(", importance = ").push_bind(importance);
        }
        if let Some(barangay) = data.barangay {
            builder.push(", barangay = ").push_bind(barangay);
        }
        if let Some(image_url) = data.image_url {
            builder.push(", image_url = ").push_bind(image_url);
        }
        if let Some(start_date) = data.start_date {
            builder.push(", start_date = ").push_bind(start_date);
        }
        if let Some(end_date) = data.end_date {
            builder.push(", end_date = ").push_bind(end_date);
        }
        if let Some(is_active) = data.is_active {
            builder.push(", is_active = ").push_bind(is_active);
        }
        builder.push(" WHERE id = ").push_bind(id);

        if let Err(e) = builder.build().execute(&self.pool).await {
            tracing::error!("Failed to update alert: {:?}", e);
            if let Some(url) = new_image {
                delete_all_best_effort(self.images.as_ref(), &[url]).await;
            }
            return Err(AppError::Database(e));
        }

        if new_image.is_some() {
            if let Some(old) = existing.image_url {
                delete_all_best_effort(self.images.as_ref(), &[old]).await;
            }
        }

        tracing::info!("Alert {} updated", id);
        Ok(self.find(id).await?.into())
    }

    /// Deletes the alert and its read receipts
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let image_url = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM alerts WHERE id = $1 RETURNING image_url",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete alert: {:?}", e);
            AppError::Database(e)
        })?
        .ok_or_else(not_found)?;

        if let Some(url) = image_url {
            delete_all_best_effort(self.images.as_ref(), &[url]).await;
        }

        tracing::info!("Alert {} deleted", id);
        Ok(())
    }

    /// Citizens are scoped to their barangay and default to active alerts;
    /// their entries carry read state from one bulk receipt lookup.
    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        query: AlertListQuery,
    ) -> Result<AlertListDto> {
        let pagination = query.pagination();
        pagination.validate()?;

        let sort_by = AlertSortBy::parse(query.sort_by.as_deref());
        let direction = SortDirection::parse_or(query.sort_dir.as_deref(), SortDirection::Desc);
        let filters = AlertFilters {
            barangay: BarangayFilter::for_actor(actor, query.barangay.as_deref()),
            is_active: match query.is_active {
                Some(flag) => Some(flag),
                None if actor.is_citizen() => Some(true),
                None => None,
            },
            query,
        };

        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM alerts a");
        filters.push(&mut count_query);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count alerts: {:?}", e);
                AppError::Database(e)
            })?;

        let mut page_query: QueryBuilder<Postgres> = QueryBuilder::new(ALERT_SELECT);
        filters.push(&mut page_query);
        page_query
            .push(format!(
                " ORDER BY {} {} NULLS LAST, a.id {}",
                sort_by.column(),
                direction.as_sql(),
                direction.as_sql()
            ))
            .push(" LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows = page_query
            .build_query_as::<AlertWithCreator>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list alerts: {:?}", e);
                AppError::Database(e)
            })?;

        let mut alerts: Vec<AlertResponseDto> = rows.into_iter().map(Into::into).collect();

        if actor.is_citizen() {
            let ids: Vec<Uuid> = alerts.iter().map(|a| a.id).collect();
            let reads: HashMap<Uuid, DateTime<Utc>> = self
                .reads_for(actor.id, &ids)
                .await?
                .into_iter()
                .map(|r| (r.alert_id, r.read_at))
                .collect();
            alerts = alerts
                .into_iter()
                .map(|a| {
                    let read_at = reads.get(&a.id).copied();
                    a.with_read_state(read_at)
                })
                .collect();
        }

        Ok(AlertListDto {
            alerts,
            pagination: pagination.meta(total),
        })
    }

    async fn reads_for(&self, user_id: Uuid, alert_ids: &[Uuid]) -> Result<Vec<AlertRead>> {
        if alert_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, AlertRead>(
            "SELECT alert_id, read_at FROM alert_reads WHERE user_id = $1 AND alert_id = ANY($2)",
        )
        .bind(user_id)
        .bind(alert_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load alert reads: {:?}", e);
            AppError::Database(e)
        })
    }

    /// Detail view: citizens leave a receipt and see their read state,
    /// staff see the read count.
    pub async fn detail(
        &self,
        actor: &AuthenticatedUser,
        row: AlertWithCreator,
    ) -> Result<AlertResponseDto> {
        let alert_id = row.alert.id;
        let dto = AlertResponseDto::from(row);

        if actor.is_citizen() {
            let (read_at, _) = self.mark_read(alert_id, actor.id).await?;
            Ok(dto.with_read_state(Some(read_at)))
        } else {
            Ok(dto.with_read_count(self.read_count(alert_id).await?))
        }
    }

    /// Writes the receipt unless one exists. Returns the stored `read_at`
    /// and whether this call created it.
    pub async fn mark_read(&self, alert_id: Uuid, user_id: Uuid) -> Result<(DateTime<Utc>, bool)> {
        let created = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            INSERT INTO alert_reads (id, alert_id, user_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (alert_id, user_id) DO NOTHING
            RETURNING read_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(alert_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark alert as read: {:?}", e);
            AppError::Database(e)
        })?;

        if let Some(read_at) = created {
            tracing::debug!("User {} read alert {}", user_id, alert_id);
            return Ok((read_at, true));
        }

        let read_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT read_at FROM alert_reads WHERE alert_id = $1 AND user_id = $2",
        )
        .bind(alert_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load alert read: {:?}", e);
            AppError::Database(e)
        })?;

        Ok((read_at, false))
    }

    async fn read_count(&self, alert_id: Uuid) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM alert_reads WHERE alert_id = $1")
            .bind(alert_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count alert reads: {:?}", e);
                AppError::Database(e)
            })
    }

    pub async fn stats(&self, alert_id: Uuid) -> Result<AlertStatsDto> {
        let read_count = self.read_count(alert_id).await?;
        let total_users = self.users.count_verified_citizens().await?;

        let reads = sqlx::query_as::<_, AlertReaderRow>(
            r#"
            SELECT r.read_at, u.id AS user_id, u.first_name, u.last_name, u.barangay
            FROM alert_reads r
            JOIN users u ON u.id = r.user_id
            WHERE r.alert_id = $1
            ORDER BY r.read_at DESC
            LIMIT $2
            "#,
        )
        .bind(alert_id)
        .bind(ALERT_READS_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load alert readers: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(AlertStatsDto {
            total_users,
            read_count,
            read_percentage: read_percentage(read_count, total_users),
            reads: reads.into_iter().map(Into::into).collect(),
        })
    }

    /// Active alerts visible to the actor that they have not read
    pub async fn unread_count(&self, actor: &AuthenticatedUser) -> Result<i64> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT a.id FROM alerts a WHERE a.is_active = TRUE");
        BarangayFilter::for_actor(actor, None).push(&mut builder);

        let visible = builder
            .build_query_scalar::<Uuid>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load visible alerts: {:?}", e);
                AppError::Database(e)
            })?;

        let read: HashSet<Uuid> = self
            .reads_for(actor.id, &visible)
            .await?
            .into_iter()
            .map(|r| r.alert_id)
            .collect();

        Ok(count_unread(&visible, &read))
    }
}
