use crate::domain::entities::{sort_windows, BusinessHourScope, BusinessHourWindow, Department};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::business_hour_repository::BusinessHourRepository;
use crate::domain::ports::department_repository::DepartmentRepository;
use crate::infrastructure::persistence::Database;
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;
use std::collections::HashMap;

fn department_from_row(row: &AnyRow) -> DomainResult<Department> {
    let archived: i64 = row.try_get("archived")?;
    Ok(Department {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        archived: archived != 0,
        business_hours: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn window_ids(mut windows: Vec<BusinessHourWindow>) -> Vec<String> {
    sort_windows(&mut windows);
    windows.into_iter().map(|w| w.id).collect()
}

#[async_trait]
impl DepartmentRepository for Database {
    async fn create_department(&self, department: &Department) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO departments (id, name, archived, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&department.id)
        .bind(&department.name)
        .bind(department.archived as i64)
        .bind(&department.created_at)
        .bind(&department.updated_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            "Department created: id={}, name={}",
            department.id,
            department.name
        );
        Ok(())
    }

    async fn get_department(&self, id: &str) -> DomainResult<Option<Department>> {
        let row = sqlx::query(
            "SELECT id, name, archived, created_at, updated_at
             FROM departments
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut department = department_from_row(&row)?;
        let windows = self
            .find_by_scope(&BusinessHourScope::Department(department.id.clone()))
            .await?;
        department.business_hours = window_ids(windows);
        Ok(Some(department))
    }

    async fn list_departments(&self) -> DomainResult<Vec<Department>> {
        let rows = sqlx::query(
            "SELECT id, name, archived, created_at, updated_at
             FROM departments
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_department: HashMap<String, Vec<BusinessHourWindow>> = HashMap::new();
        for window in self.list_windows().await? {
            if let Some(department_id) = window.scope.department_id() {
                by_department
                    .entry(department_id.to_string())
                    .or_default()
                    .push(window);
            }
        }

        let mut departments = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut department = department_from_row(row)?;
            if let Some(windows) = by_department.remove(&department.id) {
                department.business_hours = window_ids(windows);
            }
            departments.push(department);
        }
        Ok(departments)
    }

    async fn update_department(&self, department: &Department) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE departments SET name = ?, archived = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&department.name)
        .bind(department.archived as i64)
        .bind(&department.updated_at)
        .bind(&department.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!(
                "Department {} not found",
                department.id
            )));
        }
        Ok(())
    }

    async fn delete_department(&self, id: &str) -> DomainResult<Option<Vec<String>>> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query("SELECT agent_id FROM department_agents WHERE department_id = ?")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
        let agent_ids = rows
            .iter()
            .map(|row| row.try_get::<String, _>("agent_id"))
            .collect::<Result<Vec<_>, _>>()?;

        sqlx::query("DELETE FROM business_hours WHERE department_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM department_agents WHERE department_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM departments WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;

        tracing::info!(
            "Department deleted: id={}, memberships removed={}",
            id,
            agent_ids.len()
        );
        Ok(Some(agent_ids))
    }
}
