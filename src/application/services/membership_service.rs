use crate::application::services::{bounded, now_rfc3339, require_identifier};
use crate::config::SettingsHandle;
use crate::domain::entities::{AddDepartmentAgentRequest, DepartmentAgent, RotationPool};
use crate::domain::errors::{DomainError, DomainResult, ValidationReason};
use crate::domain::ports::agent_repository::AgentRepository;
use crate::domain::ports::department_repository::DepartmentRepository;
use crate::domain::ports::membership_repository::MembershipRepository;
use crate::shared::events::{EventBus, SystemEvent};
use std::sync::Arc;

#[derive(Clone)]
pub struct MembershipService {
    membership_repo: Arc<dyn MembershipRepository>,
    agent_repo: Arc<dyn AgentRepository>,
    department_repo: Arc<dyn DepartmentRepository>,
    event_bus: Arc<dyn EventBus>,
    settings: SettingsHandle,
}

impl MembershipService {
    pub fn new(
        membership_repo: Arc<dyn MembershipRepository>,
        agent_repo: Arc<dyn AgentRepository>,
        department_repo: Arc<dyn DepartmentRepository>,
        event_bus: Arc<dyn EventBus>,
        settings: SettingsHandle,
    ) -> Self {
        Self {
            membership_repo,
            agent_repo,
            department_repo,
            event_bus,
            settings,
        }
    }

    /// Add an agent to a department, or update its order if already a member.
    /// Fairness counters survive the update.
    pub async fn add_agent(
        &self,
        department_id: &str,
        agent_id: &str,
        request: AddDepartmentAgentRequest,
    ) -> DomainResult<DepartmentAgent> {
        require_identifier(department_id, "department_id")?;
        require_identifier(agent_id, "agent_id")?;
        if matches!(request.order, Some(order) if order < 0) {
            return Err(DomainError::validation(
                ValidationReason::NegativeOrder,
                "order must not be negative",
            ));
        }

        let timeout = self.settings.storage_timeout();

        if bounded(timeout, self.department_repo.get_department(department_id))
            .await?
            .is_none()
        {
            return Err(DomainError::validation(
                ValidationReason::UnknownDepartment,
                format!("Department {} does not exist", department_id),
            ));
        }

        let agent = bounded(timeout, self.agent_repo.get_agent(agent_id))
            .await?
            .ok_or_else(|| {
                DomainError::validation(
                    ValidationReason::UnknownAgent,
                    format!("Agent {} does not exist", agent_id),
                )
            })?;

        // Keep the current order when none is given
        let order = match request.order {
            Some(order) => order,
            None => bounded(timeout, self.membership_repo.list_by_agent(agent_id))
                .await?
                .into_iter()
                .find(|m| m.department_id == department_id)
                .map(|m| m.order)
                .unwrap_or(0),
        };

        let membership = DepartmentAgent::new(
            department_id.to_string(),
            agent.id.clone(),
            agent.username.clone(),
            order,
        );
        let stored = bounded(timeout, self.membership_repo.upsert_membership(&membership)).await?;

        self.publish_change(department_id, agent_id);
        Ok(stored)
    }

    /// Idempotent; returns whether a membership was removed.
    pub async fn remove_agent(&self, department_id: &str, agent_id: &str) -> DomainResult<bool> {
        require_identifier(department_id, "department_id")?;
        require_identifier(agent_id, "agent_id")?;

        let removed = bounded(
            self.settings.storage_timeout(),
            self.membership_repo.remove_membership(department_id, agent_id),
        )
        .await?;

        if removed {
            tracing::info!("Agent {} removed from department {}", agent_id, department_id);
            self.publish_change(department_id, agent_id);
        }
        Ok(removed)
    }

    pub async fn remove_agent_everywhere(&self, agent_id: &str) -> DomainResult<u64> {
        require_identifier(agent_id, "agent_id")?;
        let timeout = self.settings.storage_timeout();

        let memberships = bounded(timeout, self.membership_repo.list_by_agent(agent_id)).await?;
        let removed = bounded(timeout, self.membership_repo.remove_agent_memberships(agent_id)).await?;

        for membership in memberships {
            self.publish_change(&membership.department_id, agent_id);
        }
        Ok(removed)
    }

    pub async fn list_by_department(&self, department_id: &str) -> DomainResult<Vec<DepartmentAgent>> {
        bounded(
            self.settings.storage_timeout(),
            self.membership_repo.list_by_department(department_id),
        )
        .await
    }

    pub async fn list_by_agent(&self, agent_id: &str) -> DomainResult<Vec<DepartmentAgent>> {
        bounded(
            self.settings.storage_timeout(),
            self.membership_repo.list_by_agent(agent_id),
        )
        .await
    }

    /// Members that are online, available for livechat and hold `livechat-agent`,
    /// in rotation order.
    pub async fn list_online_for_department(&self, department_id: &str) -> DomainResult<Vec<DepartmentAgent>> {
        bounded(
            self.settings.storage_timeout(),
            self.membership_repo
                .list_eligible_for_department(department_id, RotationPool::Agents),
        )
        .await
    }

    /// Online members holding `livechat-bot`, in bot rotation order.
    pub async fn list_bots_for_department(&self, department_id: &str) -> DomainResult<Vec<DepartmentAgent>> {
        bounded(
            self.settings.storage_timeout(),
            self.membership_repo
                .list_eligible_for_department(department_id, RotationPool::Bots),
        )
        .await
    }

    /// Memberships of live departments, optionally restricted to `usernames`
    pub async fn list_queue(&self, usernames: &[String]) -> DomainResult<Vec<DepartmentAgent>> {
        bounded(
            self.settings.storage_timeout(),
            self.membership_repo.list_queue(usernames),
        )
        .await
    }

    pub async fn rename_agent(&self, agent_id: &str, username: &str) -> DomainResult<u64> {
        require_identifier(agent_id, "agent_id")?;
        require_identifier(username, "username")?;
        bounded(
            self.settings.storage_timeout(),
            self.membership_repo.rename_agent(agent_id, username.trim()),
        )
        .await
    }

    pub async fn reset_counts(&self, department_id: &str) -> DomainResult<u64> {
        require_identifier(department_id, "department_id")?;
        let timeout = self.settings.storage_timeout();

        if bounded(timeout, self.department_repo.get_department(department_id))
            .await?
            .is_none()
        {
            return Err(DomainError::NotFound(format!(
                "Department {} not found",
                department_id
            )));
        }

        bounded(timeout, self.membership_repo.reset_counts(department_id)).await
    }

    fn publish_change(&self, department_id: &str, agent_id: &str) {
        if let Err(e) = self.event_bus.publish(SystemEvent::MembershipChanged {
            department_id: department_id.to_string(),
            agent_id: agent_id.to_string(),
            timestamp: now_rfc3339(),
        }) {
            tracing::error!("Failed to publish MembershipChanged event: {}", e);
        }
    }
}
