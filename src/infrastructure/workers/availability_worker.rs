use crate::application::services::{BusinessHourEvaluator, RefreshReport};
use crate::config::SettingsHandle;
use crate::domain::errors::DomainResult;
use crate::domain::ports::time_service::TimeService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Periodic availability recheck, independent of traffic, so agents flip as
/// business hours open and close.
pub struct AvailabilityWorker {
    evaluator: BusinessHourEvaluator,
    settings: SettingsHandle,
    time_service: Arc<dyn TimeService>,
}

impl AvailabilityWorker {
    pub fn new(
        evaluator: BusinessHourEvaluator,
        settings: SettingsHandle,
        time_service: Arc<dyn TimeService>,
    ) -> Self {
        Self {
            evaluator,
            settings,
            time_service,
        }
    }

    pub async fn run(&self) {
        info!(
            "Starting AvailabilityWorker (every {:?})",
            self.settings.current().recheck_interval
        );
        loop {
            if let Err(e) = self.tick().await {
                error!("Availability recheck failed: {}", e);
            }
            // Re-read each pass so an interval change applies without a restart
            let interval = self.settings.current().recheck_interval;
            self.time_service.sleep(interval.max(Duration::from_secs(1))).await;
        }
    }

    /// One recheck pass
    pub async fn tick(&self) -> DomainResult<RefreshReport> {
        let report = self.evaluator.refresh_agent_availability().await?;
        if report.updated > 0 {
            info!(
                "Availability recheck: evaluated={}, updated={}",
                report.evaluated, report.updated
            );
        }
        Ok(report)
    }
}
