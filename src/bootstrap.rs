use crate::application::listeners::{run_availability_listener, run_settings_listener};
use crate::application::services::*;
use crate::config::SettingsHandle;
use crate::domain::ports::agent_repository::AgentRepository;
use crate::domain::ports::business_hour_repository::BusinessHourRepository;
use crate::domain::ports::department_repository::DepartmentRepository;
use crate::domain::ports::membership_repository::MembershipRepository;
use crate::domain::ports::task_spawner::TaskSpawner;
use crate::domain::ports::time_service::{Clock, TimeService};
use crate::infrastructure::http::middleware::AppState;
use crate::infrastructure::persistence::Database;
use crate::infrastructure::runtime::{SystemClock, TokioTaskSpawner, TokioTimeService};
use crate::infrastructure::workers::AvailabilityWorker;
use crate::shared::events::{EventBus, LocalEventBus};
use std::sync::Arc;

/// Wire the services on top of `db`. No background task is started.
pub fn build_services(db: &Database, settings: SettingsHandle, clock: Arc<dyn Clock>) -> AppState {
    let agent_repo: Arc<dyn AgentRepository> = Arc::new(db.clone());
    let business_hour_repo: Arc<dyn BusinessHourRepository> = Arc::new(db.clone());
    let department_repo: Arc<dyn DepartmentRepository> = Arc::new(db.clone());
    let membership_repo: Arc<dyn MembershipRepository> = Arc::new(db.clone());

    let event_bus: Arc<dyn EventBus> = Arc::new(LocalEventBus::new(1000));
    tracing::info!("Event bus initialized with capacity 1000");

    let business_hour_service = BusinessHourService::new(
        business_hour_repo.clone(),
        department_repo.clone(),
        event_bus.clone(),
        clock.clone(),
        settings.clone(),
    );
    let business_hour_evaluator = BusinessHourEvaluator::new(
        business_hour_repo,
        agent_repo.clone(),
        membership_repo.clone(),
        department_repo.clone(),
        event_bus.clone(),
        clock,
        settings.clone(),
    );
    let membership_service = MembershipService::new(
        membership_repo.clone(),
        agent_repo.clone(),
        department_repo.clone(),
        event_bus.clone(),
        settings.clone(),
    );
    let assignment_service = AssignmentService::new(
        membership_repo.clone(),
        agent_repo.clone(),
        department_repo.clone(),
        event_bus.clone(),
        settings.clone(),
    );
    let department_service =
        DepartmentService::new(department_repo, event_bus.clone(), settings.clone());
    let agent_directory_service =
        AgentDirectoryService::new(agent_repo, membership_repo, event_bus.clone(), settings.clone());

    AppState {
        event_bus,
        settings,
        business_hour_service,
        business_hour_evaluator,
        membership_service,
        assignment_service,
        department_service,
        agent_directory_service,
    }
}

/// Start the availability listener, the settings listener and the periodic worker.
pub fn start_background_tasks(
    state: &AppState,
    task_spawner: Arc<dyn TaskSpawner>,
    time_service: Arc<dyn TimeService>,
) {
    let event_bus = state.event_bus.clone();
    let evaluator = state.business_hour_evaluator.clone();
    let membership_service = state.membership_service.clone();
    task_spawner.spawn(
        "availability-listener",
        Box::pin(async move {
            run_availability_listener(event_bus, evaluator, membership_service).await;
        }),
    );

    let evaluator = state.business_hour_evaluator.clone();
    let settings_rx = state.settings.subscribe();
    task_spawner.spawn(
        "settings-listener",
        Box::pin(async move {
            run_settings_listener(evaluator, settings_rx).await;
        }),
    );

    let worker = AvailabilityWorker::new(
        state.business_hour_evaluator.clone(),
        state.settings.clone(),
        time_service,
    );
    task_spawner.spawn(
        "availability-worker",
        Box::pin(async move {
            worker.run().await;
        }),
    );
    tracing::info!("Availability worker started");
}

pub async fn build_app_state(
    db: Database,
    settings: SettingsHandle,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let state = build_services(&db, settings, Arc::new(SystemClock));

    let task_spawner: Arc<dyn TaskSpawner> = Arc::new(TokioTaskSpawner::new());
    let time_service: Arc<dyn TimeService> = Arc::new(TokioTimeService::new());
    start_background_tasks(&state, task_spawner, time_service);

    Ok(state)
}
