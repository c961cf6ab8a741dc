use crate::application::services::{bounded, now_rfc3339};
use crate::config::SettingsHandle;
use crate::domain::entities::{AssignmentResult, ClaimedAgent, RotationPool, Selection};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::agent_repository::AgentRepository;
use crate::domain::ports::department_repository::DepartmentRepository;
use crate::domain::ports::membership_repository::MembershipRepository;
use crate::shared::events::{EventBus, SystemEvent};
use std::sync::Arc;

/// A claim that finds no row is retried this many extra times
const CLAIM_RETRIES: usize = 1;

/// Service for picking the next agent or bot for an incoming chat
#[derive(Clone)]
pub struct AssignmentService {
    membership_repo: Arc<dyn MembershipRepository>,
    agent_repo: Arc<dyn AgentRepository>,
    department_repo: Arc<dyn DepartmentRepository>,
    event_bus: Arc<dyn EventBus>,
    settings: SettingsHandle,
}

impl AssignmentService {
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

    /// Next human agent, least-used first. Without a department the global
    /// rotation over all online, available agents is used.
    pub async fn select_next(&self, department_id: Option<&str>) -> DomainResult<Selection> {
        self.select(department_id, RotationPool::Agents).await
    }

    /// Next bot. Bots have their own counters and ignore business hours.
    pub async fn select_next_bot(&self, department_id: Option<&str>) -> DomainResult<Selection> {
        self.select(department_id, RotationPool::Bots).await
    }

    async fn select(&self, department_id: Option<&str>, pool: RotationPool) -> DomainResult<Selection> {
        let department_id = department_id.map(str::trim).filter(|id| !id.is_empty());

        if let Some(id) = department_id {
            if !self.department_routes(id).await? {
                return Ok(self.no_agent(pool));
            }
        }

        for attempt in 0..=CLAIM_RETRIES {
            match self.try_claim(department_id, pool).await {
                Ok(Some(claimed)) => return Ok(self.assigned(department_id, pool, claimed)),
                Ok(None) => return Ok(self.no_agent(pool)),
                Err(DomainError::StorageConflict(reason)) if attempt < CLAIM_RETRIES => {
                    metrics::counter!("routing_selection_retries_total").increment(1);
                    tracing::info!(
                        "Selection conflict on attempt {} ({}), retrying",
                        attempt + 1,
                        reason
                    );
                }
                Err(DomainError::StorageConflict(reason)) => {
                    tracing::warn!("Selection conflict persisted after retry: {}", reason);
                    return Ok(self.no_agent(pool));
                }
                Err(e) => {
                    metrics::counter!(
                        "routing_selections_total",
                        "pool" => pool.to_string(),
                        "outcome" => "error"
                    )
                    .increment(1);
                    return Err(e);
                }
            }
        }

        Ok(self.no_agent(pool))
    }

    /// Unknown and archived departments route nothing
    async fn department_routes(&self, department_id: &str) -> DomainResult<bool> {
        let department = bounded(
            self.settings.storage_timeout(),
            self.department_repo.get_department(department_id),
        )
        .await?;

        match department {
            None => {
                tracing::warn!("Selection requested for unknown department {}", department_id);
                Ok(false)
            }
            Some(department) if department.archived => {
                tracing::info!("Department {} is archived, nothing to route", department_id);
                Ok(false)
            }
            Some(_) => Ok(true),
        }
    }

    /// `Ok(None)`: the pool is empty. `StorageConflict`: candidates existed
    /// but none was still eligible when the claim ran.
    async fn try_claim(
        &self,
        department_id: Option<&str>,
        pool: RotationPool,
    ) -> DomainResult<Option<ClaimedAgent>> {
        let timeout = self.settings.storage_timeout();

        let claimed = match department_id {
            Some(id) => {
                let candidates: Vec<String> = bounded(
                    timeout,
                    self.membership_repo.list_eligible_for_department(id, pool),
                )
                .await?
                .into_iter()
                .map(|m| m.agent_id)
                .collect();
                if candidates.is_empty() {
                    return Ok(None);
                }
                bounded(
                    timeout,
                    self.membership_repo
                        .claim_next_for_department(id, pool, &candidates),
                )
                .await?
            }
            None => {
                let candidates: Vec<String> =
                    bounded(timeout, self.agent_repo.list_eligible_agents(pool))
                        .await?
                        .into_iter()
                        .map(|a| a.id)
                        .collect();
                if candidates.is_empty() {
                    return Ok(None);
                }
                bounded(timeout, self.agent_repo.claim_next_agent(pool, &candidates)).await?
            }
        };

        claimed.map(Some).ok_or_else(|| {
            DomainError::StorageConflict("candidates changed before the claim".to_string())
        })
    }

    fn assigned(
        &self,
        department_id: Option<&str>,
        pool: RotationPool,
        claimed: ClaimedAgent,
    ) -> Selection {
        metrics::counter!(
            "routing_selections_total",
            "pool" => pool.to_string(),
            "outcome" => "assigned"
        )
        .increment(1);

        tracing::info!(
            "Selected {} ({}) for {} in {} (count now {})",
            claimed.username,
            claimed.agent_id,
            pool,
            department_id.unwrap_or("global rotation"),
            claimed.count
        );

        if let Err(e) = self.event_bus.publish(SystemEvent::AgentSelected {
            agent_id: claimed.agent_id.clone(),
            username: claimed.username.clone(),
            department_id: department_id.map(str::to_string),
            pool,
            timestamp: now_rfc3339(),
        }) {
            tracing::error!("Failed to publish AgentSelected event: {}", e);
        }

        Selection::Assigned(AssignmentResult::from(claimed))
    }

    fn no_agent(&self, pool: RotationPool) -> Selection {
        metrics::counter!(
            "routing_selections_total",
            "pool" => pool.to_string(),
            "outcome" => "no_agent_available"
        )
        .increment(1);
        tracing::debug!("No {} available", pool);
        Selection::NoAgentAvailable
    }
}
