use chrono::{Duration, NaiveDate};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::database::contains_pattern;
use crate::core::error::{AppError, Result};
use crate::features::schedules::calendar::{
    finalize, group_by_barangay, group_by_day, upcoming, ScheduleSortBy,
};
use crate::features::schedules::dtos::{
    BarangayScheduleDto, CreateScheduleDto, DateRangeDto, ScheduleFiltersDto, ScheduleListDto,
    ScheduleListQuery, ServiceTypeScheduleDto, UpcomingListDto, UpdateScheduleDto,
};
use crate::features::schedules::models::{DayOfWeek, ScheduleFields, ServiceSchedule};
use crate::shared::types::SortDirection;

const SCHEDULE_COLUMNS: &str = "id, service_type, day_of_week, start_time, end_time, barangay, \
     description, recurring, next_date, created_at, updated_at";

fn not_found() -> AppError {
    AppError::NotFound("Service schedule not found".to_string())
}

fn db_error(action: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!("Failed to {}: {:?}", action, e);
        AppError::Database(e)
    }
}

struct ScheduleFilters {
    query: ScheduleListQuery,
}

impl ScheduleFilters {
    fn push(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE 1=1");

        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if let Some(service_type) = text(&self.query.service_type) {
            builder.push(" AND service_type = ").push_bind(service_type);
        }
        if let Some(day) = self.query.day_of_week {
            builder.push(" AND day_of_week = ").push_bind(day);
        }
        if let Some(barangay) = text(&self.query.barangay) {
            builder.push(" AND barangay = ").push_bind(barangay);
        }
        if let Some(recurring) = self.query.recurring {
            builder.push(" AND recurring = ").push_bind(recurring);
        }
        if let Some(search) = text(&self.query.search) {
            let pattern = contains_pattern(&search);
            builder
                .push(" AND (service_type ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR barangay ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// Recurring and one-off municipal service schedules
pub struct ScheduleService {
    pool: PgPool,
}

impl ScheduleService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: Uuid) -> Result<ServiceSchedule> {
        let query = format!("SELECT {} FROM service_schedules WHERE id = $1", SCHEDULE_COLUMNS);
        sqlx::query_as::<_, ServiceSchedule>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get service schedule"))?
            .ok_or_else(not_found)
    }

    pub async fn list(&self, query: ScheduleListQuery) -> Result<ScheduleListDto> {
        let pagination = query.pagination();
        pagination.validate()?;

        let sort_by = ScheduleSortBy::parse(query.sort_by.as_deref());
        let direction = SortDirection::parse_or(query.sort_dir.as_deref(), SortDirection::Asc);
        let filters = ScheduleFilters { query };

        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM service_schedules");
        filters.push(&mut count_query);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count service schedules"))?;

        let mut page_query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM service_schedules", SCHEDULE_COLUMNS));
        filters.push(&mut page_query);
        page_query
            .push(format!(
                " ORDER BY {} {} NULLS LAST, start_time ASC, id ASC",
                sort_by.column(),
                direction.as_sql()
            ))
            .push(" LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let schedules = page_query
            .build_query_as::<ServiceSchedule>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list service schedules"))?;

        Ok(ScheduleListDto {
            schedules,
            pagination: pagination.meta(total),
            filters: self.filter_options().await?,
        })
    }

    async fn filter_options(&self) -> Result<ScheduleFiltersDto> {
        let barangays = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT barangay FROM service_schedules ORDER BY barangay",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load schedule barangays"))?;

        let service_types = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT service_type FROM service_schedules ORDER BY service_type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load schedule service types"))?;

        let days_of_week = sqlx::query_scalar::<_, DayOfWeek>(
            "SELECT DISTINCT day_of_week FROM service_schedules ORDER BY day_of_week",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load schedule days"))?;

        Ok(ScheduleFiltersDto {
            barangays,
            service_types,
            days_of_week,
        })
    }

    /// Recurring schedules plus one-offs dated on or after `today`
    async fn current(
        &self,
        today: NaiveDate,
        column: Option<(&'static str, String)>,
    ) -> Result<Vec<ServiceSchedule>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM service_schedules WHERE (recurring OR next_date >= ",
            SCHEDULE_COLUMNS
        ));
        builder.push_bind(today).push(")");
        if let Some((column, value)) = column {
            builder.push(format!(" AND {} = ", column)).push_bind(value);
        }
        builder.push(" ORDER BY day_of_week, start_time, id");

        builder
            .build_query_as::<ServiceSchedule>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("load current service schedules"))
    }

    pub async fn by_barangay(
        &self,
        barangay: &str,
        today: NaiveDate,
    ) -> Result<BarangayScheduleDto> {
        let barangay = barangay.trim().to_string();
        let schedules = self
            .current(today, Some(("barangay", barangay.clone())))
            .await?;
        Ok(BarangayScheduleDto::new(barangay, group_by_day(schedules)))
    }

    pub async fn upcoming(
        &self,
        barangay: Option<String>,
        today: NaiveDate,
        days: i64,
    ) -> Result<UpcomingListDto> {
        let scope = barangay
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .map(|b| ("barangay", b));
        let schedules = self.current(today, scope).await?;

        Ok(UpcomingListDto {
            schedules: upcoming(schedules, today, days),
            date_range: DateRangeDto {
                from: today,
                to: today + Duration::days(days - 1),
            },
        })
    }

    pub async fn by_service_type(
        &self,
        service_type: &str,
        today: NaiveDate,
    ) -> Result<ServiceTypeScheduleDto> {
        let service_type = service_type.trim().to_string();
        let schedules = self
            .current(today, Some(("service_type", service_type.clone())))
            .await?;
        Ok(ServiceTypeScheduleDto::new(
            service_type,
            group_by_barangay(schedules),
        ))
    }

    pub async fn create(
        &self,
        dto: CreateScheduleDto,
        today: NaiveDate,
    ) -> Result<ServiceSchedule> {
        let fields = finalize(dto.into_draft()?, today)?;

        let query = format!(
            r#"
            INSERT INTO service_schedules
                (id, service_type, day_of_week, start_time, end_time, barangay,
                 description, recurring, next_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            SCHEDULE_COLUMNS
        );
        bind_fields(sqlx::query_as::<_, ServiceSchedule>(&query).bind(Uuid::now_v7()), fields)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("create service schedule"))
    }

    /// Applies a partial update and re-checks the recurrence rules on the result
    pub async fn update(
        &self,
        id: Uuid,
        dto: UpdateScheduleDto,
        today: NaiveDate,
    ) -> Result<ServiceSchedule> {
        let existing = self.find(id).await?;
        let fields = finalize(dto.merge(existing.into())?, today)?;

        let query = format!(
            r#"
            UPDATE service_schedules
            SET service_type = $2, day_of_week = $3, start_time = $4, end_time = $5,
                barangay = $6, description = $7, recurring = $8, next_date = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SCHEDULE_COLUMNS
        );
        bind_fields(sqlx::query_as::<_, ServiceSchedule>(&query).bind(id), fields)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("update service schedule"))?
            .ok_or_else(not_found)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM service_schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete service schedule"))?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        Ok(())
    }
}

type ScheduleQuery<'q> =
    sqlx::query::QueryAs<'q, Postgres, ServiceSchedule, sqlx::postgres::PgArguments>;

/// Binds `$2..$9` in column order
fn bind_fields(query: ScheduleQuery<'_>, fields: ScheduleFields) -> ScheduleQuery<'_> {
    query
        .bind(fields.service_type)
        .bind(fields.day_of_week)
        .bind(fields.start_time)
        .bind(fields.end_time)
        .bind(fields.barangay)
        .bind(fields.description)
        .bind(fields.recurring)
        .bind(fields.next_date)
}
