use crate::domain::entities::agent::Capability;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentAgent {
    pub id: String,
    pub department_id: String,
    pub agent_id: String,
    pub username: String,
    /// Times this agent was picked for a human-agent rotation in this department
    pub fairness_count: i64,
    /// Independent counter for the bot rotation
    pub bot_fairness_count: i64,
    /// Manual tie-break, lower first
    pub order: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl DepartmentAgent {
    pub fn new(department_id: String, agent_id: String, username: String, order: i64) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            department_id,
            agent_id,
            username,
            fairness_count: 0,
            bot_fairness_count: 0,
            order,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Rotation namespace. Humans and bots never compete for the same counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPool {
    Agents,
    Bots,
}

impl RotationPool {
    pub fn capability(&self) -> Capability {
        match self {
            RotationPool::Agents => Capability::LivechatAgent,
            RotationPool::Bots => Capability::LivechatBot,
        }
    }

    /// Bots are not gated by business hours.
    pub fn requires_livechat_availability(&self) -> bool {
        matches!(self, RotationPool::Agents)
    }

    pub fn membership_counter_column(&self) -> &'static str {
        match self {
            RotationPool::Agents => "fairness_count",
            RotationPool::Bots => "bot_fairness_count",
        }
    }

    pub fn agent_counter_column(&self) -> &'static str {
        match self {
            RotationPool::Agents => "routing_count",
            RotationPool::Bots => "bot_routing_count",
        }
    }
}

impl std::fmt::Display for RotationPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationPool::Agents => write!(f, "agents"),
            RotationPool::Bots => write!(f, "bots"),
        }
    }
}

/// DTO for adding (or re-ordering) an agent in a department
#[derive(Debug, Default, Deserialize)]
pub struct AddDepartmentAgentRequest {
    pub order: Option<i64>,
}
