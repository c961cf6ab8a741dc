use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentResult {
    pub agent_id: String,
    pub username: String,
}

/// Outcome of a selection. An empty pool is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Assigned(AssignmentResult),
    NoAgentAvailable,
}

impl Selection {
    pub fn assigned(&self) -> Option<&AssignmentResult> {
        match self {
            Selection::Assigned(result) => Some(result),
            Selection::NoAgentAvailable => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, Selection::Assigned(_))
    }
}

/// Row returned by the atomic select-and-increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedAgent {
    pub agent_id: String,
    pub username: String,
    /// Counter value after the increment
    pub count: i64,
}

impl From<ClaimedAgent> for AssignmentResult {
    fn from(claimed: ClaimedAgent) -> Self {
        AssignmentResult {
            agent_id: claimed.agent_id,
            username: claimed.username,
        }
    }
}
