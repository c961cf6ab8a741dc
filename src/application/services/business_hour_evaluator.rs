use crate::application::services::{bounded, now_rfc3339, require_identifier};
use crate::config::{RoutingSettings, SettingsHandle};
use crate::domain::entities::{
    Agent, AgentAvailabilityUpdate, BusinessHourScope, BusinessHourType, LivechatStatus,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::agent_repository::AgentRepository;
use crate::domain::ports::business_hour_repository::BusinessHourRepository;
use crate::domain::ports::department_repository::DepartmentRepository;
use crate::domain::ports::membership_repository::MembershipRepository;
use crate::domain::ports::time_service::Clock;
use crate::domain::services::BusinessHourSchedule;
use crate::shared::events::{EventBus, SystemEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Outcome of an availability refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Livechat agents whose availability was computed
    pub evaluated: usize,
    /// Agents whose stored flags actually changed
    pub updated: u64,
}

/// Decides whether business hours are open and keeps each livechat agent's
/// availability flag in sync with them. Sole writer of `livechat_status`.
#[derive(Clone)]
pub struct BusinessHourEvaluator {
    business_hour_repo: Arc<dyn BusinessHourRepository>,
    agent_repo: Arc<dyn AgentRepository>,
    membership_repo: Arc<dyn MembershipRepository>,
    department_repo: Arc<dyn DepartmentRepository>,
    event_bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    settings: SettingsHandle,
}

impl BusinessHourEvaluator {
    pub fn new(
        business_hour_repo: Arc<dyn BusinessHourRepository>,
        agent_repo: Arc<dyn AgentRepository>,
        membership_repo: Arc<dyn MembershipRepository>,
        department_repo: Arc<dyn DepartmentRepository>,
        event_bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        settings: SettingsHandle,
    ) -> Self {
        Self {
            business_hour_repo,
            agent_repo,
            membership_repo,
            department_repo,
            event_bus,
            clock,
            settings,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Whether `department_id` accepts chats at `at`.
    ///
    /// Only the windows the current business-hour type consults are loaded:
    /// the department's own in `Custom` mode, the global ones in `Single` mode.
    pub async fn is_open(&self, department_id: &str, at: DateTime<Utc>) -> DomainResult<bool> {
        require_identifier(department_id, "department_id")?;
        let settings = self.settings.current();
        let timeout = settings.storage_timeout;

        if bounded(timeout, self.department_repo.get_department(department_id))
            .await?
            .is_none()
        {
            return Err(DomainError::NotFound(format!(
                "Department {} not found",
                department_id
            )));
        }

        if !settings.business_hours_enabled {
            return Ok(true);
        }

        let schedule = match settings.business_hour_type {
            BusinessHourType::Single => BusinessHourSchedule::Single {
                windows: bounded(
                    timeout,
                    self.business_hour_repo.find_by_scope(&BusinessHourScope::Global),
                )
                .await?,
            },
            BusinessHourType::Custom => {
                let scope = BusinessHourScope::Department(department_id.to_string());
                BusinessHourSchedule::custom(
                    bounded(timeout, self.business_hour_repo.find_by_scope(&scope)).await?,
                )
            }
        };

        Ok(schedule.department_verdict(department_id, at).open)
    }

    /// Recompute availability of every livechat agent at the current instant.
    pub async fn refresh_agent_availability(&self) -> DomainResult<RefreshReport> {
        let settings = self.settings.current();
        let agents = bounded(settings.storage_timeout, self.agent_repo.list_livechat_agents()).await?;
        self.refresh(&settings, agents).await
    }

    /// Same computation restricted to `agent_ids`; unknown ids and agents
    /// without `livechat-agent` are skipped.
    pub async fn refresh_agents(&self, agent_ids: &[String]) -> DomainResult<RefreshReport> {
        if agent_ids.is_empty() {
            return Ok(RefreshReport::default());
        }

        let settings = self.settings.current();
        let wanted: HashSet<&str> = agent_ids.iter().map(String::as_str).collect();
        let agents = bounded(settings.storage_timeout, self.agent_repo.list_livechat_agents())
            .await?
            .into_iter()
            .filter(|agent| wanted.contains(agent.id.as_str()))
            .collect();

        self.refresh(&settings, agents).await
    }

    async fn refresh(&self, settings: &RoutingSettings, agents: Vec<Agent>) -> DomainResult<RefreshReport> {
        if agents.is_empty() {
            return Ok(RefreshReport::default());
        }

        let timeout = settings.storage_timeout;
        let schedule = self.load_schedule(settings).await?;

        let mut departments_by_agent: HashMap<String, Vec<String>> = HashMap::new();
        if matches!(schedule, BusinessHourSchedule::Custom { .. }) {
            for membership in bounded(timeout, self.membership_repo.list_active_memberships()).await? {
                departments_by_agent
                    .entry(membership.agent_id)
                    .or_default()
                    .push(membership.department_id);
            }
        }

        let now = self.clock.now();
        let mut updates = Vec::new();
        let mut transitions = Vec::new();

        for agent in &agents {
            let departments = departments_by_agent
                .get(&agent.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let verdict = schedule.agent_verdict(departments, now);
            let livechat_status = if verdict.open {
                LivechatStatus::Available
            } else {
                LivechatStatus::NotAvailable
            };

            if livechat_status == agent.livechat_status
                && verdict.open_window_ids == agent.open_business_hours
            {
                continue;
            }

            if livechat_status != agent.livechat_status {
                transitions.push((agent.id.clone(), agent.livechat_status, livechat_status));
            }
            updates.push(AgentAvailabilityUpdate {
                agent_id: agent.id.clone(),
                livechat_status,
                open_business_hours: verdict.open_window_ids,
            });
        }

        let updated = bounded(timeout, self.agent_repo.update_availability(&updates)).await?;
        metrics::counter!("availability_refresh_updates_total").increment(updated);

        for (agent_id, old_status, new_status) in transitions {
            tracing::info!(
                "Agent {} livechat status {} -> {}",
                agent_id,
                old_status,
                new_status
            );
            if let Err(e) = self.event_bus.publish(SystemEvent::AgentAvailabilityChanged {
                agent_id,
                old_status,
                new_status,
                timestamp: now_rfc3339(),
            }) {
                tracing::error!("Failed to publish AgentAvailabilityChanged event: {}", e);
            }
        }

        let report = RefreshReport {
            evaluated: agents.len(),
            updated,
        };
        tracing::debug!(
            "Availability refresh: evaluated={}, updated={}",
            report.evaluated,
            report.updated
        );
        Ok(report)
    }

    async fn load_schedule(&self, settings: &RoutingSettings) -> DomainResult<BusinessHourSchedule> {
        if !settings.business_hours_enabled {
            return Ok(BusinessHourSchedule::Unrestricted);
        }

        let timeout = settings.storage_timeout;
        match settings.business_hour_type {
            BusinessHourType::Single => Ok(BusinessHourSchedule::Single {
                windows: bounded(
                    timeout,
                    self.business_hour_repo.find_by_scope(&BusinessHourScope::Global),
                )
                .await?,
            }),
            BusinessHourType::Custom => Ok(BusinessHourSchedule::custom(
                bounded(timeout, self.business_hour_repo.list_windows()).await?,
            )),
        }
    }
}
