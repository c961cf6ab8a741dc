use crate::application::services::{bounded, now_rfc3339, require_identifier};
use crate::config::SettingsHandle;
use crate::domain::entities::{
    Agent, AgentStatusSummary, Capability, PresenceStatus, RegisterAgentRequest,
};
use crate::domain::errors::{DomainError, DomainResult, ValidationReason};
use crate::domain::ports::agent_repository::AgentRepository;
use crate::domain::ports::membership_repository::MembershipRepository;
use crate::shared::events::{EventBus, SystemEvent};
use std::sync::Arc;

/// Mirror of the external presence and capability stores.
#[derive(Clone)]
pub struct AgentDirectoryService {
    agent_repo: Arc<dyn AgentRepository>,
    membership_repo: Arc<dyn MembershipRepository>,
    event_bus: Arc<dyn EventBus>,
    settings: SettingsHandle,
}

impl AgentDirectoryService {
    pub fn new(
        agent_repo: Arc<dyn AgentRepository>,
        membership_repo: Arc<dyn MembershipRepository>,
        event_bus: Arc<dyn EventBus>,
        settings: SettingsHandle,
    ) -> Self {
        Self {
            agent_repo,
            membership_repo,
            event_bus,
            settings,
        }
    }

    /// Insert or refresh an agent. Rotation counters and availability are kept.
    pub async fn register_agent(&self, request: RegisterAgentRequest) -> DomainResult<Agent> {
        require_identifier(&request.username, "username")?;
        let id = match request.id {
            Some(id) => {
                require_identifier(&id, "id")?;
                id.trim().to_string()
            }
            None => uuid::Uuid::new_v4().to_string(),
        };

        let mut agent = Agent::new(id, request.username.trim().to_string());
        agent.status = request.status.unwrap_or_default();
        agent.capabilities = request.capabilities;
        agent.capabilities.sort_by_key(|c| c.to_string());
        agent.capabilities.dedup();

        let timeout = self.settings.storage_timeout();
        bounded(timeout, self.agent_repo.upsert_agent(&agent)).await?;
        // Memberships carry the username for the tie-break
        bounded(
            timeout,
            self.membership_repo.rename_agent(&agent.id, &agent.username),
        )
        .await?;

        self.publish_capabilities_changed(&agent.id);
        self.get_agent(&agent.id).await
    }

    pub async fn set_presence(&self, agent_id: &str, status: PresenceStatus) -> DomainResult<Agent> {
        require_identifier(agent_id, "agent_id")?;
        let updated = bounded(
            self.settings.storage_timeout(),
            self.agent_repo.set_presence(agent_id, status),
        )
        .await?;
        if !updated {
            return Err(not_found(agent_id));
        }

        tracing::debug!("Agent {} presence set to {}", agent_id, status);
        self.get_agent(agent_id).await
    }

    pub async fn grant_capability(&self, agent_id: &str, capability: Capability) -> DomainResult<Agent> {
        self.get_agent(agent_id).await?;
        bounded(
            self.settings.storage_timeout(),
            self.agent_repo.grant_capability(agent_id, capability),
        )
        .await?;

        tracing::info!("Granted {} to agent {}", capability, agent_id);
        self.publish_capabilities_changed(agent_id);
        self.get_agent(agent_id).await
    }

    pub async fn revoke_capability(&self, agent_id: &str, capability: Capability) -> DomainResult<Agent> {
        self.get_agent(agent_id).await?;
        let revoked = bounded(
            self.settings.storage_timeout(),
            self.agent_repo.revoke_capability(agent_id, capability),
        )
        .await?;

        if revoked {
            tracing::info!("Revoked {} from agent {}", capability, agent_id);
            self.publish_capabilities_changed(agent_id);
        }
        self.get_agent(agent_id).await
    }

    /// Rename the agent and every membership carrying its username
    pub async fn rename_agent(&self, agent_id: &str, username: &str) -> DomainResult<Agent> {
        require_identifier(agent_id, "agent_id")?;
        require_identifier(username, "username")?;
        let username = username.trim();
        let timeout = self.settings.storage_timeout();

        if !bounded(timeout, self.agent_repo.rename_agent(agent_id, username)).await? {
            return Err(not_found(agent_id));
        }
        let memberships =
            bounded(timeout, self.membership_repo.rename_agent(agent_id, username)).await?;

        tracing::info!(
            "Agent {} renamed to {} ({} memberships updated)",
            agent_id,
            username,
            memberships
        );
        self.get_agent(agent_id).await
    }

    pub async fn get_agent(&self, agent_id: &str) -> DomainResult<Agent> {
        require_identifier(agent_id, "agent_id")?;
        bounded(
            self.settings.storage_timeout(),
            self.agent_repo.get_agent(agent_id),
        )
        .await?
        .ok_or_else(|| not_found(agent_id))
    }

    pub async fn list_agents(&self) -> DomainResult<Vec<Agent>> {
        bounded(self.settings.storage_timeout(), self.agent_repo.list_agents()).await
    }

    /// Whether the evaluator last left at least one window open for the agent
    pub async fn is_within_business_hours(&self, agent_id: &str) -> DomainResult<bool> {
        Ok(self.get_agent(agent_id).await?.is_within_business_hours())
    }

    /// Livechat agents per presence bucket. A blank department counts everyone.
    pub async fn count_agents_status(
        &self,
        department_id: Option<&str>,
    ) -> DomainResult<AgentStatusSummary> {
        let department_id = department_id.map(str::trim).filter(|id| !id.is_empty());
        bounded(
            self.settings.storage_timeout(),
            self.agent_repo.count_agents_status(department_id),
        )
        .await
    }

    fn publish_capabilities_changed(&self, agent_id: &str) {
        if let Err(e) = self.event_bus.publish(SystemEvent::AgentCapabilitiesChanged {
            agent_id: agent_id.to_string(),
            timestamp: now_rfc3339(),
        }) {
            tracing::error!("Failed to publish AgentCapabilitiesChanged event: {}", e);
        }
    }
}

fn not_found(agent_id: &str) -> DomainError {
    DomainError::NotFound(format!("Agent {} not found", agent_id))
}

/// Parse a capability from a path segment
pub fn parse_capability(value: &str) -> DomainResult<Capability> {
    value.parse().map_err(|_| {
        DomainError::validation(
            ValidationReason::UnknownCapability,
            format!("Unknown capability: {}", value),
        )
    })
}

/// Parse a presence status from free text
pub fn parse_presence(value: &str) -> DomainResult<PresenceStatus> {
    value.parse().map_err(|_| {
        DomainError::validation(
            ValidationReason::InvalidPresence,
            format!("Invalid presence status: {}", value),
        )
    })
}
