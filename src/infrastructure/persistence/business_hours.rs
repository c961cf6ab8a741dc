use crate::domain::entities::{sort_windows, BusinessHourScope, BusinessHourWindow};
use crate::domain::errors::DomainResult;
use crate::domain::ports::business_hour_repository::BusinessHourRepository;
use crate::infrastructure::persistence::Database;
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

const WINDOW_COLUMNS: &str = "id, department_id, day, start_time, end_time, timezone, utc_offset,
     created_at, updated_at";

fn window_from_row(row: &AnyRow) -> DomainResult<BusinessHourWindow> {
    let department_id: String = row.try_get("department_id")?;
    Ok(BusinessHourWindow {
        id: row.try_get("id")?,
        scope: BusinessHourScope::from_storage_key(department_id),
        day: row.try_get("day")?,
        start: row.try_get("start_time")?,
        end: row.try_get("end_time")?,
        timezone: row.try_get("timezone")?,
        utc_offset: row.try_get("utc_offset")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn windows_from_rows(rows: &[AnyRow]) -> DomainResult<Vec<BusinessHourWindow>> {
    let mut windows = rows
        .iter()
        .map(window_from_row)
        .collect::<DomainResult<Vec<_>>>()?;
    // Day names don't sort lexically
    sort_windows(&mut windows);
    Ok(windows)
}

#[async_trait]
impl BusinessHourRepository for Database {
    async fn upsert_window(&self, window: &BusinessHourWindow) -> DomainResult<BusinessHourWindow> {
        let row = sqlx::query(&format!(
            "INSERT INTO business_hours
                (id, department_id, day, start_time, end_time, timezone, utc_offset, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(department_id, day) DO UPDATE SET
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                timezone = excluded.timezone,
                utc_offset = excluded.utc_offset,
                updated_at = excluded.updated_at
             RETURNING {}",
            WINDOW_COLUMNS
        ))
        .bind(&window.id)
        .bind(window.scope.storage_key())
        .bind(&window.day)
        .bind(&window.start)
        .bind(&window.end)
        .bind(&window.timezone)
        .bind(&window.utc_offset)
        .bind(&window.created_at)
        .bind(&window.updated_at)
        .fetch_one(&self.pool)
        .await?;

        let stored = window_from_row(&row)?;
        tracing::info!(
            "Business hour saved: id={}, scope={}, day={}, {}-{} {}",
            stored.id,
            stored.scope,
            stored.day,
            stored.start,
            stored.end,
            stored.timezone
        );
        Ok(stored)
    }

    async fn find_by_scope(
        &self,
        scope: &BusinessHourScope,
    ) -> DomainResult<Vec<BusinessHourWindow>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM business_hours WHERE department_id = ?",
            WINDOW_COLUMNS
        ))
        .bind(scope.storage_key())
        .fetch_all(&self.pool)
        .await?;

        windows_from_rows(&rows)
    }

    async fn list_windows(&self) -> DomainResult<Vec<BusinessHourWindow>> {
        let rows = sqlx::query(&format!("SELECT {} FROM business_hours", WINDOW_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        windows_from_rows(&rows)
    }

    async fn remove_by_department(&self, department_id: &str) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM business_hours WHERE department_id = ?")
            .bind(department_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn remove_window(&self, window_id: &str) -> DomainResult<Option<BusinessHourWindow>> {
        let row = sqlx::query(&format!(
            "DELETE FROM business_hours WHERE id = ? RETURNING {}",
            WINDOW_COLUMNS
        ))
        .bind(window_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(window_from_row).transpose()
    }
}
