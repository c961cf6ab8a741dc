use crate::domain::entities::BusinessHourWindow;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

/// Business-hour configuration resolved for one evaluation pass.
///
/// Each variant carries only the windows its strategy consults.
#[derive(Debug, Clone)]
pub enum BusinessHourSchedule {
    /// Business hours disabled: everything is open.
    Unrestricted,
    /// One schedule applied to every agent and department.
    Single { windows: Vec<BusinessHourWindow> },
    /// Per-department schedules; agents without a department fall back to the default windows.
    Custom {
        default_windows: Vec<BusinessHourWindow>,
        departments: HashMap<String, Vec<BusinessHourWindow>>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleVerdict {
    pub open: bool,
    /// Ids of the windows that matched, sorted
    pub open_window_ids: Vec<String>,
}

impl ScheduleVerdict {
    fn unrestricted() -> Self {
        Self {
            open: true,
            open_window_ids: Vec::new(),
        }
    }
}

impl BusinessHourSchedule {
    pub fn custom(windows: Vec<BusinessHourWindow>) -> Self {
        let mut default_windows = Vec::new();
        let mut departments: HashMap<String, Vec<BusinessHourWindow>> = HashMap::new();
        for window in windows {
            match window.scope.department_id() {
                Some(department_id) => departments
                    .entry(department_id.to_string())
                    .or_default()
                    .push(window),
                None => default_windows.push(window),
            }
        }
        BusinessHourSchedule::Custom {
            default_windows,
            departments,
        }
    }

    pub fn department_verdict(&self, department_id: &str, at: DateTime<Utc>) -> ScheduleVerdict {
        match self {
            BusinessHourSchedule::Unrestricted => ScheduleVerdict::unrestricted(),
            BusinessHourSchedule::Single { windows } => evaluate_windows(windows, at),
            BusinessHourSchedule::Custom { departments, .. } => departments
                .get(department_id)
                .map(|windows| evaluate_windows(windows, at))
                .unwrap_or_else(ScheduleVerdict::unrestricted),
        }
    }

    /// Availability of an agent serving `department_ids` (archived departments already removed).
    pub fn agent_verdict(&self, department_ids: &[String], at: DateTime<Utc>) -> ScheduleVerdict {
        match self {
            BusinessHourSchedule::Unrestricted => ScheduleVerdict::unrestricted(),
            BusinessHourSchedule::Single { windows } => evaluate_windows(windows, at),
            BusinessHourSchedule::Custom {
                default_windows, ..
            } if department_ids.is_empty() => evaluate_windows(default_windows, at),
            BusinessHourSchedule::Custom { .. } => {
                let mut open = false;
                let mut ids = BTreeSet::new();
                for department_id in department_ids {
                    let verdict = self.department_verdict(department_id, at);
                    open |= verdict.open;
                    ids.extend(verdict.open_window_ids);
                }
                ScheduleVerdict {
                    open,
                    open_window_ids: ids.into_iter().collect(),
                }
            }
        }
    }
}

/// No windows means no restriction. A window that cannot be evaluated never opens.
fn evaluate_windows(windows: &[BusinessHourWindow], at: DateTime<Utc>) -> ScheduleVerdict {
    if windows.is_empty() {
        return ScheduleVerdict::unrestricted();
    }

    let mut ids = BTreeSet::new();
    for window in windows {
        match window.contains(at) {
            Ok(true) => {
                ids.insert(window.id.clone());
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Ignoring misconfigured business hour window: {}", e);
            }
        }
    }

    ScheduleVerdict {
        open: !ids.is_empty(),
        open_window_ids: ids.into_iter().collect(),
    }
}
