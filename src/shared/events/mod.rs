use crate::domain::entities::{BusinessHourScope, LivechatStatus, RotationPool};
use crate::domain::errors::DomainResult;
use tokio::sync::broadcast;

/// Routing events. Admin edits publish these so availability can be rechecked
/// immediately for the affected agents.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    BusinessHoursChanged {
        scope: BusinessHourScope,
        timestamp: String, // ISO 8601
    },
    MembershipChanged {
        department_id: String,
        agent_id: String,
        timestamp: String, // ISO 8601
    },
    DepartmentUpdated {
        department_id: String,
        archived: bool,
        timestamp: String, // ISO 8601
    },
    DepartmentDeleted {
        department_id: String,
        agent_ids: Vec<String>,
        timestamp: String, // ISO 8601
    },
    AgentCapabilitiesChanged {
        agent_id: String,
        timestamp: String, // ISO 8601
    },
    AgentAvailabilityChanged {
        agent_id: String,
        old_status: LivechatStatus,
        new_status: LivechatStatus,
        timestamp: String, // ISO 8601
    },
    AgentSelected {
        agent_id: String,
        username: String,
        department_id: Option<String>,
        pool: RotationPool,
        timestamp: String, // ISO 8601
    },
}

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

#[async_trait]
pub trait EventBus: Send + Sync {
    fn publish(&self, event: SystemEvent) -> DomainResult<()>;

    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<SystemEvent, BroadcastStreamRecvError>> + Send>>;
}

#[derive(Clone)]
pub struct LocalEventBus {
    tx: broadcast::Sender<SystemEvent>,
}

impl LocalEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl EventBus for LocalEventBus {
    fn publish(&self, event: SystemEvent) -> DomainResult<()> {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("No active subscribers for event: {}", e);
        }
        Ok(())
    }

    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<SystemEvent, BroadcastStreamRecvError>> + Send>> {
        let rx = self.tx.subscribe();
        Box::pin(BroadcastStream::new(rx))
    }
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
