use crate::domain::entities::Department;
use crate::domain::errors::DomainResult;
use async_trait::async_trait;

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn create_department(&self, department: &Department) -> DomainResult<()>;
    async fn get_department(&self, id: &str) -> DomainResult<Option<Department>>;
    async fn list_departments(&self) -> DomainResult<Vec<Department>>;
    async fn update_department(&self, department: &Department) -> DomainResult<()>;

    /// Delete the department with its memberships and business hours in one
    /// transaction. Returns the ids of the agents that were members.
    async fn delete_department(&self, id: &str) -> DomainResult<Option<Vec<String>>>;
}
