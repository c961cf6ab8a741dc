use crate::domain::entities::{
    Agent, AgentAvailabilityUpdate, AgentStatusSummary, Capability, ClaimedAgent, PresenceStatus, RotationPool,
};
use crate::domain::errors::DomainResult;
use async_trait::async_trait;

/// Local mirror of the presence and capability stores.
///
/// The evaluator is the only caller of `update_availability`; the selector is
/// the only caller of `claim_next_agent`.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Insert or refresh an agent. Counters and availability are never touched.
    async fn upsert_agent(&self, agent: &Agent) -> DomainResult<()>;
    async fn get_agent(&self, agent_id: &str) -> DomainResult<Option<Agent>>;
    async fn list_agents(&self) -> DomainResult<Vec<Agent>>;

    async fn set_presence(&self, agent_id: &str, status: PresenceStatus) -> DomainResult<bool>;
    async fn rename_agent(&self, agent_id: &str, username: &str) -> DomainResult<bool>;
    async fn grant_capability(&self, agent_id: &str, capability: Capability) -> DomainResult<()>;
    async fn revoke_capability(&self, agent_id: &str, capability: Capability) -> DomainResult<bool>;

    /// Agents holding `livechat-agent`, i.e. the ones gated by business hours
    async fn list_livechat_agents(&self) -> DomainResult<Vec<Agent>>;

    /// Presence buckets over `livechat-agent` holders, optionally limited to
    /// members of one department
    async fn count_agents_status(
        &self,
        department_id: Option<&str>,
    ) -> DomainResult<AgentStatusSummary>;

    /// Online agents eligible for the given rotation, ignoring departments
    async fn list_eligible_agents(&self, pool: RotationPool) -> DomainResult<Vec<Agent>>;

    /// Atomically pick the least-used eligible agent among `candidate_ids`
    /// and increment its global counter. `None` if none is still eligible.
    async fn claim_next_agent(
        &self,
        pool: RotationPool,
        candidate_ids: &[String],
    ) -> DomainResult<Option<ClaimedAgent>>;

    /// Write availability flags; returns the number of agents actually changed
    async fn update_availability(&self, updates: &[AgentAvailabilityUpdate]) -> DomainResult<u64>;
}
