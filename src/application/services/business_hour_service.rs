use crate::application::services::{bounded, now_rfc3339, require_identifier};
use crate::config::SettingsHandle;
use crate::domain::entities::{BusinessHourScope, BusinessHourWindow, SaveBusinessHourRequest};
use crate::domain::errors::{DomainError, DomainResult, ValidationReason};
use crate::domain::ports::business_hour_repository::BusinessHourRepository;
use crate::domain::ports::department_repository::DepartmentRepository;
use crate::domain::ports::time_service::Clock;
use crate::shared::events::{EventBus, SystemEvent};
use std::sync::Arc;

/// Business Hours Store: validated CRUD over operating windows.
#[derive(Clone)]
pub struct BusinessHourService {
    business_hour_repo: Arc<dyn BusinessHourRepository>,
    department_repo: Arc<dyn DepartmentRepository>,
    event_bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    settings: SettingsHandle,
}

impl BusinessHourService {
    pub fn new(
        business_hour_repo: Arc<dyn BusinessHourRepository>,
        department_repo: Arc<dyn DepartmentRepository>,
        event_bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        settings: SettingsHandle,
    ) -> Self {
        Self {
            business_hour_repo,
            department_repo,
            event_bus,
            clock,
            settings,
        }
    }

    /// Create or replace the window for the request's scope and day.
    pub async fn save(&self, request: SaveBusinessHourRequest) -> DomainResult<BusinessHourWindow> {
        let validated = request.validate()?;
        let timeout = self.settings.storage_timeout();

        if let BusinessHourScope::Department(department_id) = &validated.scope {
            let department =
                bounded(timeout, self.department_repo.get_department(department_id)).await?;
            if department.is_none() {
                return Err(DomainError::validation(
                    ValidationReason::UnknownDepartment,
                    format!("Department {} does not exist", department_id),
                ));
            }
        }

        let window = validated.into_window(uuid::Uuid::new_v4().to_string(), self.clock.now());
        let stored = bounded(timeout, self.business_hour_repo.upsert_window(&window)).await?;

        self.publish_change(stored.scope.clone());
        Ok(stored)
    }

    /// Windows of a department ordered by weekday then start; empty means no restriction.
    pub async fn find_by_department(&self, department_id: &str) -> DomainResult<Vec<BusinessHourWindow>> {
        require_identifier(department_id, "department_id")?;
        let scope = BusinessHourScope::Department(department_id.to_string());
        bounded(
            self.settings.storage_timeout(),
            self.business_hour_repo.find_by_scope(&scope),
        )
        .await
    }

    pub async fn find_global(&self) -> DomainResult<Vec<BusinessHourWindow>> {
        bounded(
            self.settings.storage_timeout(),
            self.business_hour_repo.find_by_scope(&BusinessHourScope::Global),
        )
        .await
    }

    /// Idempotent; returns the number of windows removed.
    pub async fn remove_by_department(&self, department_id: &str) -> DomainResult<u64> {
        require_identifier(department_id, "department_id")?;
        let removed = bounded(
            self.settings.storage_timeout(),
            self.business_hour_repo.remove_by_department(department_id),
        )
        .await?;

        if removed > 0 {
            tracing::info!(
                "Removed {} business hour windows of department {}",
                removed,
                department_id
            );
            self.publish_change(BusinessHourScope::Department(department_id.to_string()));
        }
        Ok(removed)
    }

    /// Idempotent; returns whether a window was removed.
    pub async fn remove_window(&self, window_id: &str) -> DomainResult<bool> {
        require_identifier(window_id, "window_id")?;
        let removed = bounded(
            self.settings.storage_timeout(),
            self.business_hour_repo.remove_window(window_id),
        )
        .await?;

        match removed {
            Some(window) => {
                tracing::info!("Removed business hour window {} ({})", window.id, window.scope);
                self.publish_change(window.scope);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn publish_change(&self, scope: BusinessHourScope) {
        if let Err(e) = self.event_bus.publish(SystemEvent::BusinessHoursChanged {
            scope,
            timestamp: now_rfc3339(),
        }) {
            tracing::error!("Failed to publish BusinessHoursChanged event: {}", e);
        }
    }
}
