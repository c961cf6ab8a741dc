use serde::{Deserialize, Serialize};

/// Presence as reported by the external presence store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Away,
    Busy,
    #[default]
    Offline,
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresenceStatus::Online => write!(f, "online"),
            PresenceStatus::Away => write!(f, "away"),
            PresenceStatus::Busy => write!(f, "busy"),
            PresenceStatus::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for PresenceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(PresenceStatus::Online),
            "away" => Ok(PresenceStatus::Away),
            "busy" => Ok(PresenceStatus::Busy),
            "offline" => Ok(PresenceStatus::Offline),
            _ => Err(format!("Invalid presence status: {}", s)),
        }
    }
}

/// Livechat availability flag, owned by the business-hours evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LivechatStatus {
    #[default]
    Available,
    NotAvailable,
}

impl std::fmt::Display for LivechatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LivechatStatus::Available => write!(f, "available"),
            LivechatStatus::NotAvailable => write!(f, "not-available"),
        }
    }
}

impl std::str::FromStr for LivechatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(LivechatStatus::Available),
            "not-available" => Ok(LivechatStatus::NotAvailable),
            _ => Err(format!("Invalid livechat status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "livechat-agent")]
    LivechatAgent,
    #[serde(rename = "livechat-bot")]
    LivechatBot,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::LivechatAgent => write!(f, "livechat-agent"),
            Capability::LivechatBot => write!(f, "livechat-bot"),
        }
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "livechat-agent" => Ok(Capability::LivechatAgent),
            "livechat-bot" => Ok(Capability::LivechatBot),
            _ => Err(format!("Invalid capability: {}", s)),
        }
    }
}

/// Local mirror of an agent from the presence and capability stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub username: String,
    pub status: PresenceStatus,
    pub livechat_status: LivechatStatus,
    /// Business-hour windows currently open for this agent (sorted)
    pub open_business_hours: Vec<String>,
    pub capabilities: Vec<Capability>,
    /// Rotation counters used when selecting without a department
    pub routing_count: i64,
    pub bot_routing_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Agent {
    pub fn new(id: String, username: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id,
            username,
            status: PresenceStatus::Offline,
            livechat_status: LivechatStatus::Available,
            open_business_hours: Vec::new(),
            capabilities: Vec::new(),
            routing_count: 0,
            bot_routing_count: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// True while at least one business-hour window is open for the agent
    pub fn is_within_business_hours(&self) -> bool {
        !self.open_business_hours.is_empty()
    }
}

/// Livechat agents bucketed by presence. An agent the evaluator marked
/// `not-available` counts as offline whatever its presence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgentStatusSummary {
    pub available: i64,
    pub away: i64,
    pub busy: i64,
    pub offline: i64,
}

/// Evaluator output for one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentAvailabilityUpdate {
    pub agent_id: String,
    pub livechat_status: LivechatStatus,
    pub open_business_hours: Vec<String>,
}

/// DTO for registering an agent mirrored from the directory
#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    pub id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub status: Option<PresenceStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SetPresenceRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameAgentRequest {
    pub username: String,
}
