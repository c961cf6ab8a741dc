pub mod body;
pub mod error;

pub use body::optional_json;
pub use error::{ApiError, ApiResult};

use crate::application::services::{
    AgentDirectoryService, AssignmentService, BusinessHourEvaluator, BusinessHourService,
    DepartmentService, MembershipService,
};
use crate::config::SettingsHandle;
use crate::shared::events::EventBus;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub event_bus: Arc<dyn EventBus>,
    pub settings: SettingsHandle,
    pub business_hour_service: BusinessHourService,
    pub business_hour_evaluator: BusinessHourEvaluator,
    pub membership_service: MembershipService,
    pub assignment_service: AssignmentService,
    pub department_service: DepartmentService,
    pub agent_directory_service: AgentDirectoryService,
}
