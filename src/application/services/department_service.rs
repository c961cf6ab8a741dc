use crate::application::services::{bounded, now_rfc3339, require_identifier};
use crate::config::SettingsHandle;
use crate::domain::entities::{CreateDepartmentRequest, Department, UpdateDepartmentRequest};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::department_repository::DepartmentRepository;
use crate::shared::events::{EventBus, SystemEvent};
use std::sync::Arc;

#[derive(Clone)]
pub struct DepartmentService {
    department_repo: Arc<dyn DepartmentRepository>,
    event_bus: Arc<dyn EventBus>,
    settings: SettingsHandle,
}

impl DepartmentService {
    pub fn new(
        department_repo: Arc<dyn DepartmentRepository>,
        event_bus: Arc<dyn EventBus>,
        settings: SettingsHandle,
    ) -> Self {
        Self {
            department_repo,
            event_bus,
            settings,
        }
    }

    pub async fn create(&self, request: CreateDepartmentRequest) -> DomainResult<Department> {
        require_identifier(&request.name, "name")?;
        let mut department = Department::new(request.name.trim().to_string());
        if let Some(id) = request.id {
            require_identifier(&id, "id")?;
            department.id = id.trim().to_string();
        }

        bounded(
            self.settings.storage_timeout(),
            self.department_repo.create_department(&department),
        )
        .await?;
        Ok(department)
    }

    pub async fn update(&self, id: &str, request: UpdateDepartmentRequest) -> DomainResult<Department> {
        let timeout = self.settings.storage_timeout();
        let mut department = self.get(id).await?;

        if let Some(name) = request.name {
            require_identifier(&name, "name")?;
            department.name = name.trim().to_string();
        }
        let archived_changed = matches!(request.archived, Some(a) if a != department.archived);
        if let Some(archived) = request.archived {
            department.archived = archived;
        }
        department.updated_at = now_rfc3339();

        bounded(timeout, self.department_repo.update_department(&department)).await?;

        if archived_changed {
            tracing::info!(
                "Department {} {}",
                department.id,
                if department.archived { "archived" } else { "unarchived" }
            );
            if let Err(e) = self.event_bus.publish(SystemEvent::DepartmentUpdated {
                department_id: department.id.clone(),
                archived: department.archived,
                timestamp: now_rfc3339(),
            }) {
                tracing::error!("Failed to publish DepartmentUpdated event: {}", e);
            }
        }

        Ok(department)
    }

    /// Department with its window ids ordered by weekday then start
    pub async fn get(&self, id: &str) -> DomainResult<Department> {
        require_identifier(id, "department_id")?;
        bounded(
            self.settings.storage_timeout(),
            self.department_repo.get_department(id),
        )
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("Department {} not found", id)))
    }

    pub async fn list(&self) -> DomainResult<Vec<Department>> {
        bounded(
            self.settings.storage_timeout(),
            self.department_repo.list_departments(),
        )
        .await
    }

    /// Delete a department with its memberships and windows; the former
    /// members are rechecked by the availability listener.
    pub async fn delete(&self, id: &str) -> DomainResult<()> {
        require_identifier(id, "department_id")?;
        let agent_ids = bounded(
            self.settings.storage_timeout(),
            self.department_repo.delete_department(id),
        )
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("Department {} not found", id)))?;

        if let Err(e) = self.event_bus.publish(SystemEvent::DepartmentDeleted {
            department_id: id.to_string(),
            agent_ids,
            timestamp: now_rfc3339(),
        }) {
            tracing::error!("Failed to publish DepartmentDeleted event: {}", e);
        }
        Ok(())
    }
}
