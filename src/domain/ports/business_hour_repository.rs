use crate::domain::entities::{BusinessHourScope, BusinessHourWindow};
use crate::domain::errors::DomainResult;
use async_trait::async_trait;

#[async_trait]
pub trait BusinessHourRepository: Send + Sync {
    /// Insert, or update the existing window for the same scope and day.
    /// Returns the stored window (keeping the original id on update).
    async fn upsert_window(&self, window: &BusinessHourWindow) -> DomainResult<BusinessHourWindow>;

    /// Windows of one scope ordered by weekday then start time
    async fn find_by_scope(&self, scope: &BusinessHourScope) -> DomainResult<Vec<BusinessHourWindow>>;

    async fn list_windows(&self) -> DomainResult<Vec<BusinessHourWindow>>;

    async fn remove_by_department(&self, department_id: &str) -> DomainResult<u64>;

    /// Returns the removed window, if it existed
    async fn remove_window(&self, window_id: &str) -> DomainResult<Option<BusinessHourWindow>>;
}
