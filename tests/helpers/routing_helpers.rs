#![allow(dead_code)]
use super::test_db::{setup_test_db, TestDatabase};
use chrono::{DateTime, Utc};
use oxidesk_routing::bootstrap::build_services;
use oxidesk_routing::config::{RoutingSettings, SettingsHandle};
use oxidesk_routing::domain::entities::{
    AddDepartmentAgentRequest, Agent, BusinessHourType, BusinessHourWindow, Capability,
    CreateDepartmentRequest, Department, DepartmentAgent, PresenceStatus, RegisterAgentRequest,
    SaveBusinessHourRequest,
};
use oxidesk_routing::domain::ports::time_service::Clock;
use oxidesk_routing::infrastructure::http::middleware::AppState;
use sqlx::Row;
use std::sync::{Arc, Mutex};

/// Clock pinned to an instant the test controls
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub struct RoutingTestContext {
    pub test_db: TestDatabase,
    pub state: AppState,
    pub clock: Arc<FixedClock>,
}

impl RoutingTestContext {
    pub async fn teardown(self) {
        self.test_db.teardown().await;
    }
}

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid RFC 3339 instant")
        .with_timezone(&Utc)
}

pub fn custom_settings() -> RoutingSettings {
    RoutingSettings::default()
}

pub fn single_settings() -> RoutingSettings {
    RoutingSettings {
        business_hour_type: BusinessHourType::Single,
        ..RoutingSettings::default()
    }
}

/// Services over a fresh database, no background tasks, clock at Monday 2024-01-01 10:00 UTC
pub async fn setup_routing(settings: RoutingSettings) -> RoutingTestContext {
    let test_db = setup_test_db().await;
    let clock = Arc::new(FixedClock::new(at("2024-01-01T10:00:00Z")));
    let state = build_services(
        &test_db.db(),
        SettingsHandle::new(settings),
        clock.clone() as Arc<dyn Clock>,
    );
    RoutingTestContext {
        test_db,
        state,
        clock,
    }
}

pub async fn create_department(state: &AppState, id: &str) -> Department {
    state
        .department_service
        .create(CreateDepartmentRequest {
            id: Some(id.to_string()),
            name: format!("{} team", id),
        })
        .await
        .expect("Failed to create department")
}

/// Online agent holding `livechat-agent`
pub async fn create_agent(state: &AppState, id: &str, username: &str) -> Agent {
    create_agent_with(
        state,
        id,
        username,
        vec![Capability::LivechatAgent],
        PresenceStatus::Online,
    )
    .await
}

pub async fn create_bot(state: &AppState, id: &str, username: &str) -> Agent {
    create_agent_with(
        state,
        id,
        username,
        vec![Capability::LivechatBot],
        PresenceStatus::Online,
    )
    .await
}

pub async fn create_agent_with(
    state: &AppState,
    id: &str,
    username: &str,
    capabilities: Vec<Capability>,
    status: PresenceStatus,
) -> Agent {
    state
        .agent_directory_service
        .register_agent(RegisterAgentRequest {
            id: Some(id.to_string()),
            username: username.to_string(),
            capabilities,
            status: Some(status),
        })
        .await
        .expect("Failed to register agent")
}

pub async fn add_member(
    state: &AppState,
    department_id: &str,
    agent_id: &str,
    order: i64,
) -> DepartmentAgent {
    state
        .membership_service
        .add_agent(
            department_id,
            agent_id,
            AddDepartmentAgentRequest { order: Some(order) },
        )
        .await
        .expect("Failed to add agent to department")
}

pub async fn save_window(
    state: &AppState,
    department_id: Option<&str>,
    day: &str,
    start: &str,
    end: &str,
    timezone: &str,
) -> BusinessHourWindow {
    state
        .business_hour_service
        .save(SaveBusinessHourRequest {
            department_id: department_id.map(str::to_string),
            day: day.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            timezone: timezone.to_string(),
        })
        .await
        .expect("Failed to save business hour")
}

/// Seed a fairness counter directly
pub async fn set_fairness_count(
    test_db: &TestDatabase,
    department_id: &str,
    agent_id: &str,
    count: i64,
) {
    sqlx::query(
        "UPDATE department_agents SET fairness_count = ? WHERE department_id = ? AND agent_id = ?",
    )
    .bind(count)
    .bind(department_id)
    .bind(agent_id)
    .execute(test_db.db().pool())
    .await
    .expect("Failed to set fairness count");
}

pub async fn fairness_counts(test_db: &TestDatabase, department_id: &str) -> Vec<(String, i64, i64)> {
    let rows = sqlx::query(
        "SELECT agent_id, fairness_count, bot_fairness_count FROM department_agents
         WHERE department_id = ? ORDER BY agent_id",
    )
    .bind(department_id)
    .fetch_all(test_db.db().pool())
    .await
    .expect("Failed to read fairness counts");

    rows.iter()
        .map(|row| {
            (
                row.try_get("agent_id").unwrap(),
                row.try_get("fairness_count").unwrap(),
                row.try_get("bot_fairness_count").unwrap(),
            )
        })
        .collect()
}

/// Store a window bypassing validation, as a corrupted row would look
pub async fn insert_raw_window(
    test_db: &TestDatabase,
    id: &str,
    department_id: &str,
    day: &str,
    start: &str,
    end: &str,
    timezone: &str,
) {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO business_hours
            (id, department_id, day, start_time, end_time, timezone, utc_offset, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, '+00:00', ?, ?)",
    )
    .bind(id)
    .bind(department_id)
    .bind(day)
    .bind(start)
    .bind(end)
    .bind(timezone)
    .bind(&now)
    .bind(&now)
    .execute(test_db.db().pool())
    .await
    .expect("Failed to insert raw business hour");
}
