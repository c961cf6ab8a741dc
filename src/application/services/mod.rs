pub mod agent_directory_service;
pub mod assignment_service;
pub mod business_hour_evaluator;
pub mod business_hour_service;
pub mod department_service;
pub mod membership_service;

pub use agent_directory_service::AgentDirectoryService;
pub use assignment_service::AssignmentService;
pub use business_hour_evaluator::{BusinessHourEvaluator, RefreshReport};
pub use business_hour_service::BusinessHourService;
pub use department_service::DepartmentService;
pub use membership_service::MembershipService;

use crate::domain::errors::{DomainError, DomainResult, ValidationReason};
use std::future::Future;
use std::time::Duration;

/// Run a storage call under the configured storage timeout.
pub(crate) async fn bounded<T, F>(timeout: Duration, operation: F) -> DomainResult<T>
where
    F: Future<Output = DomainResult<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Storage call exceeded {:?}", timeout);
            Err(DomainError::StorageTimeout)
        }
    }
}

pub(crate) fn require_identifier(value: &str, field: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(
            ValidationReason::EmptyIdentifier,
            format!("{} must not be empty", field),
        ));
    }
    Ok(())
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
