use crate::domain::entities::{ClaimedAgent, DepartmentAgent, RotationPool};
use crate::domain::errors::DomainResult;
use async_trait::async_trait;

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Insert or update (username, order) for the (department, agent) pair.
    /// Fairness counters are preserved on update.
    async fn upsert_membership(&self, membership: &DepartmentAgent) -> DomainResult<DepartmentAgent>;

    async fn remove_membership(&self, department_id: &str, agent_id: &str) -> DomainResult<bool>;
    async fn remove_agent_memberships(&self, agent_id: &str) -> DomainResult<u64>;

    async fn list_by_department(&self, department_id: &str) -> DomainResult<Vec<DepartmentAgent>>;
    async fn list_by_agent(&self, agent_id: &str) -> DomainResult<Vec<DepartmentAgent>>;

    /// Memberships of non-archived departments
    async fn list_active_memberships(&self) -> DomainResult<Vec<DepartmentAgent>>;

    /// Members that are online, hold the pool's capability and (for human
    /// agents) are available for livechat
    async fn list_eligible_for_department(
        &self,
        department_id: &str,
        pool: RotationPool,
    ) -> DomainResult<Vec<DepartmentAgent>>;

    /// Atomically pick the lowest (count, order, username) eligible member
    /// among `candidate_agent_ids` and increment its counter for `pool`.
    async fn claim_next_for_department(
        &self,
        department_id: &str,
        pool: RotationPool,
        candidate_agent_ids: &[String],
    ) -> DomainResult<Option<ClaimedAgent>>;

    /// Memberships ordered by department, count, order, username
    async fn list_queue(&self, usernames: &[String]) -> DomainResult<Vec<DepartmentAgent>>;

    async fn rename_agent(&self, agent_id: &str, username: &str) -> DomainResult<u64>;

    /// Administrative reset of both counters in a department
    async fn reset_counts(&self, department_id: &str) -> DomainResult<u64>;
}
