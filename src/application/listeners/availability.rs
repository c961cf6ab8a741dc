use crate::application::services::{BusinessHourEvaluator, MembershipService};
use crate::config::RoutingSettings;
use crate::domain::entities::BusinessHourScope;
use crate::domain::errors::DomainResult;
use crate::shared::events::{EventBus, SystemEvent};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::StreamExt;

/// Recheck availability right after an admin edit instead of waiting for the
/// next periodic pass.
pub async fn handle_event(
    evaluator: &BusinessHourEvaluator,
    membership_service: &MembershipService,
    event: SystemEvent,
) -> DomainResult<()> {
    match event {
        SystemEvent::BusinessHoursChanged { scope, .. } => match scope {
            BusinessHourScope::Global => {
                evaluator.refresh_agent_availability().await?;
            }
            BusinessHourScope::Department(department_id) => {
                refresh_department(evaluator, membership_service, &department_id).await?;
            }
        },
        SystemEvent::DepartmentUpdated { department_id, .. } => {
            refresh_department(evaluator, membership_service, &department_id).await?;
        }
        SystemEvent::MembershipChanged { agent_id, .. }
        | SystemEvent::AgentCapabilitiesChanged { agent_id, .. } => {
            evaluator.refresh_agents(&[agent_id]).await?;
        }
        SystemEvent::DepartmentDeleted { agent_ids, .. } => {
            evaluator.refresh_agents(&agent_ids).await?;
        }
        // Produced by the evaluator and selector themselves
        SystemEvent::AgentAvailabilityChanged { .. } | SystemEvent::AgentSelected { .. } => {}
    }
    Ok(())
}

async fn refresh_department(
    evaluator: &BusinessHourEvaluator,
    membership_service: &MembershipService,
    department_id: &str,
) -> DomainResult<()> {
    let agent_ids: Vec<String> = membership_service
        .list_by_department(department_id)
        .await?
        .into_iter()
        .map(|m| m.agent_id)
        .collect();
    evaluator.refresh_agents(&agent_ids).await?;
    Ok(())
}

pub async fn run_availability_listener(
    event_bus: Arc<dyn EventBus>,
    evaluator: BusinessHourEvaluator,
    membership_service: MembershipService,
) {
    tracing::info!("Availability listener started");

    let mut receiver = event_bus.subscribe();

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(event) => {
                tracing::debug!("Availability listener received event: {:?}", event);
                if let Err(e) = handle_event(&evaluator, &membership_service, event).await {
                    tracing::error!("Availability recheck failed: {}", e);
                }
            }
            Err(e) => {
                // Lagged behind: events were dropped, so recheck everyone
                tracing::warn!("Availability listener lagged: {}", e);
                if let Err(e) = evaluator.refresh_agent_availability().await {
                    tracing::error!("Full availability refresh failed: {}", e);
                }
            }
        }
    }

    tracing::info!("Availability listener stopped");
}

/// Full refresh whenever the routing settings change.
pub async fn run_settings_listener(
    evaluator: BusinessHourEvaluator,
    mut settings_rx: watch::Receiver<RoutingSettings>,
) {
    tracing::info!("Routing settings listener started");

    while settings_rx.changed().await.is_ok() {
        let settings = settings_rx.borrow_and_update().clone();
        tracing::info!(
            "Routing settings changed (business_hours_enabled={}, type={}), rechecking all agents",
            settings.business_hours_enabled,
            settings.business_hour_type
        );
        match evaluator.refresh_agent_availability().await {
            Ok(report) => tracing::info!(
                "Settings refresh complete: evaluated={}, updated={}",
                report.evaluated,
                report.updated
            ),
            Err(e) => tracing::error!("Settings refresh failed: {}", e),
        }
    }

    tracing::info!("Routing settings listener stopped");
}
