mod helpers;

use helpers::*;
use async_trait::async_trait;
use oxidesk_routing::application::services::AssignmentService;
use oxidesk_routing::domain::entities::{
    Capability, ClaimedAgent, DepartmentAgent, PresenceStatus, RotationPool, Selection,
    UpdateDepartmentRequest,
};
use oxidesk_routing::domain::errors::DomainResult;
use oxidesk_routing::domain::ports::agent_repository::AgentRepository;
use oxidesk_routing::domain::ports::department_repository::DepartmentRepository;
use oxidesk_routing::domain::ports::membership_repository::MembershipRepository;
use oxidesk_routing::infrastructure::persistence::Database;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Membership store whose first `misses` claims find nothing, as if every
/// candidate went away between the eligibility read and the claim.
struct VanishingClaims {
    inner: Database,
    misses: usize,
    claims: AtomicUsize,
}

impl VanishingClaims {
    fn new(inner: Database, misses: usize) -> Self {
        Self {
            inner,
            misses,
            claims: AtomicUsize::new(0),
        }
    }

    fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MembershipRepository for VanishingClaims {
    async fn upsert_membership(&self, membership: &DepartmentAgent) -> DomainResult<DepartmentAgent> {
        self.inner.upsert_membership(membership).await
    }

    async fn remove_membership(&self, department_id: &str, agent_id: &str) -> DomainResult<bool> {
        self.inner.remove_membership(department_id, agent_id).await
    }

    async fn remove_agent_memberships(&self, agent_id: &str) -> DomainResult<u64> {
        self.inner.remove_agent_memberships(agent_id).await
    }

    async fn list_by_department(&self, department_id: &str) -> DomainResult<Vec<DepartmentAgent>> {
        self.inner.list_by_department(department_id).await
    }

    async fn list_by_agent(&self, agent_id: &str) -> DomainResult<Vec<DepartmentAgent>> {
        self.inner.list_by_agent(agent_id).await
    }

    async fn list_active_memberships(&self) -> DomainResult<Vec<DepartmentAgent>> {
        self.inner.list_active_memberships().await
    }

    async fn list_eligible_for_department(
        &self,
        department_id: &str,
        pool: RotationPool,
    ) -> DomainResult<Vec<DepartmentAgent>> {
        self.inner.list_eligible_for_department(department_id, pool).await
    }

    async fn claim_next_for_department(
        &self,
        department_id: &str,
        pool: RotationPool,
        candidate_agent_ids: &[String],
    ) -> DomainResult<Option<ClaimedAgent>> {
        let call = self.claims.fetch_add(1, Ordering::SeqCst);
        if call < self.misses {
            return Ok(None);
        }
        self.inner
            .claim_next_for_department(department_id, pool, candidate_agent_ids)
            .await
    }

    async fn list_queue(&self, usernames: &[String]) -> DomainResult<Vec<DepartmentAgent>> {
        self.inner.list_queue(usernames).await
    }

    async fn rename_agent(&self, agent_id: &str, username: &str) -> DomainResult<u64> {
        MembershipRepository::rename_agent(&self.inner, agent_id, username).await
    }

    async fn reset_counts(&self, department_id: &str) -> DomainResult<u64> {
        self.inner.reset_counts(department_id).await
    }
}

fn service_with_claims(ctx: &RoutingTestContext, claims: Arc<VanishingClaims>) -> AssignmentService {
    let db = Arc::new(ctx.test_db.db());
    AssignmentService::new(
        claims as Arc<dyn MembershipRepository>,
        db.clone() as Arc<dyn AgentRepository>,
        db as Arc<dyn DepartmentRepository>,
        ctx.state.event_bus.clone(),
        ctx.state.settings.clone(),
    )
}

fn assigned_id(selection: &Selection) -> String {
    selection
        .assigned()
        .map(|result| result.agent_id.clone())
        .expect("expected an agent to be assigned")
}

#[tokio::test]
async fn test_least_used_agent_wins_and_is_incremented() {
    let ctx = setup_routing(custom_settings()).await;
    create_department(&ctx.state, "support").await;
    create_agent(&ctx.state, "a", "alice").await;
    create_agent(&ctx.state, "b", "bob").await;
    create_agent(&ctx.state, "c", "carol").await;
    add_member(&ctx.state, "support", "a", 0).await;
    add_member(&ctx.state, "support", "b", 0).await;
    add_member(&ctx.state, "support", "c", 0).await;
    set_fairness_count(&ctx.test_db, "support", "a", 2).await;
    set_fairness_count(&ctx.test_db, "support", "b", 1).await;
    set_fairness_count(&ctx.test_db, "support", "c", 1).await;

    let selection = ctx
        .state
        .assignment_service
        .select_next(Some("support"))
        .await
        .unwrap();

    // b and c tie on count and order, "bob" < "carol"
    let result = selection.assigned().expect("agent assigned");
    assert_eq!(result.agent_id, "b");
    assert_eq!(result.username, "bob");
    assert_eq!(
        fairness_counts(&ctx.test_db, "support").await,
        vec![
            ("a".to_string(), 2, 0),
            ("b".to_string(), 2, 0),
            ("c".to_string(), 1, 0),
        ]
    );

    ctx.teardown().await;
}

#[tokio::test]
async fn test_order_breaks_count_ties_before_username() {
    let ctx = setup_routing(custom_settings()).await;
    create_department(&ctx.state, "sales").await;
    create_agent(&ctx.state, "a", "zed").await;
    create_agent(&ctx.state, "b", "amy").await;
    add_member(&ctx.state, "sales", "a", 1).await;
    add_member(&ctx.state, "sales", "b", 2).await;
    set_fairness_count(&ctx.test_db, "sales", "a", 5).await;
    set_fairness_count(&ctx.test_db, "sales", "b", 5).await;

    let selection = ctx
        .state
        .assignment_service
        .select_next(Some("sales"))
        .await
        .unwrap();

    assert_eq!(assigned_id(&selection), "a");
    assert_eq!(
        fairness_counts(&ctx.test_db, "sales").await,
        vec![("a".to_string(), 6, 0), ("b".to_string(), 5, 0)]
    );

    ctx.teardown().await;
}

#[tokio::test]
async fn test_rotation_cycles_through_members() {
    let ctx = setup_routing(custom_settings()).await;
    create_department(&ctx.state, "support").await;
    for (id, name) in [("a", "alice"), ("b", "bob"), ("c", "carol")] {
        create_agent(&ctx.state, id, name).await;
        add_member(&ctx.state, "support", id, 0).await;
    }

    let mut picks = Vec::new();
    for _ in 0..6 {
        let selection = ctx
            .state
            .assignment_service
            .select_next(Some("support"))
            .await
            .unwrap();
        picks.push(assigned_id(&selection));
    }

    assert_eq!(picks, vec!["a", "b", "c", "a", "b", "c"]);

    ctx.teardown().await;
}

#[tokio::test]
async fn test_no_eligible_agent_changes_nothing() {
    let ctx = setup_routing(custom_settings()).await;
    create_department(&ctx.state, "support").await;
    create_agent_with(
        &ctx.state,
        "a",
        "alice",
        vec![Capability::LivechatAgent],
        PresenceStatus::Offline,
    )
    .await;
    // Online, but without the livechat capability
    create_agent_with(&ctx.state, "b", "bob", vec![], PresenceStatus::Online).await;
    add_member(&ctx.state, "support", "a", 0).await;
    add_member(&ctx.state, "support", "b", 0).await;

    let selection = ctx
        .state
        .assignment_service
        .select_next(Some("support"))
        .await
        .unwrap();

    assert_eq!(selection, Selection::NoAgentAvailable);
    assert_eq!(
        fairness_counts(&ctx.test_db, "support").await,
        vec![("a".to_string(), 0, 0), ("b".to_string(), 0, 0)]
    );

    ctx.teardown().await;
}

#[tokio::test]
async fn test_agent_outside_business_hours_is_skipped() {
    let ctx = setup_routing(custom_settings()).await;
    create_department(&ctx.state, "day").await;
    create_department(&ctx.state, "night").await;
    create_agent(&ctx.state, "a", "alice").await;
    create_agent(&ctx.state, "b", "bob").await;
    add_member(&ctx.state, "day", "a", 0).await;
    add_member(&ctx.state, "night", "b", 0).await;
    add_member(&ctx.state, "day", "b", 1).await;
    save_window(&ctx.state, Some("day"), "Monday", "09:00", "17:00", "UTC").await;
    save_window(&ctx.state, Some("night"), "Monday", "20:00", "23:00", "UTC").await;

    // Monday 10:00: alice open through "day", bob open through "day" too
    ctx.state
        .business_hour_evaluator
        .refresh_agent_availability()
        .await
        .unwrap();
    let selection = ctx
        .state
        .assignment_service
        .select_next(Some("night"))
        .await
        .unwrap();
    assert_eq!(assigned_id(&selection), "b");

    // Monday 18:00: both departments closed
    ctx.clock.set(at("2024-01-01T18:00:00Z"));
    ctx.state
        .business_hour_evaluator
        .refresh_agent_availability()
        .await
        .unwrap();
    let selection = ctx
        .state
        .assignment_service
        .select_next(Some("day"))
        .await
        .unwrap();
    assert_eq!(selection, Selection::NoAgentAvailable);

    ctx.teardown().await;
}

#[tokio::test]
async fn test_bot_rotation_is_independent() {
    let ctx = setup_routing(custom_settings()).await;
    create_department(&ctx.state, "support").await;
    create_agent(&ctx.state, "a", "alice").await;
    create_bot(&ctx.state, "bot-1", "helper").await;
    create_bot(&ctx.state, "bot-2", "assistant").await;
    add_member(&ctx.state, "support", "a", 0).await;
    add_member(&ctx.state, "support", "bot-1", 0).await;
    add_member(&ctx.state, "support", "bot-2", 0).await;

    let bot = ctx
        .state
        .assignment_service
        .select_next_bot(Some("support"))
        .await
        .unwrap();
    // Tie on count and order: "assistant" < "helper"
    assert_eq!(assigned_id(&bot), "bot-2");

    let agent = ctx
        .state
        .assignment_service
        .select_next(Some("support"))
        .await
        .unwrap();
    assert_eq!(assigned_id(&agent), "a");

    assert_eq!(
        fairness_counts(&ctx.test_db, "support").await,
        vec![
            ("a".to_string(), 1, 0),
            ("bot-1".to_string(), 0, 0),
            ("bot-2".to_string(), 0, 1),
        ]
    );

    ctx.teardown().await;
}

#[tokio::test]
async fn test_bots_ignore_business_hours() {
    let ctx = setup_routing(custom_settings()).await;
    create_department(&ctx.state, "support").await;
    create_bot(&ctx.state, "bot-1", "helper").await;
    add_member(&ctx.state, "support", "bot-1", 0).await;
    save_window(&ctx.state, Some("support"), "Tuesday", "09:00", "17:00", "UTC").await;
    ctx.state
        .business_hour_evaluator
        .refresh_agent_availability()
        .await
        .unwrap();

    let bot = ctx
        .state
        .assignment_service
        .select_next_bot(Some("support"))
        .await
        .unwrap();
    assert_eq!(assigned_id(&bot), "bot-1");

    ctx.teardown().await;
}

#[tokio::test]
async fn test_archived_and_unknown_departments_route_nothing() {
    let ctx = setup_routing(custom_settings()).await;
    create_department(&ctx.state, "legacy").await;
    create_agent(&ctx.state, "a", "alice").await;
    add_member(&ctx.state, "legacy", "a", 0).await;
    ctx.state
        .department_service
        .update(
            "legacy",
            UpdateDepartmentRequest {
                name: None,
                archived: Some(true),
            },
        )
        .await
        .unwrap();

    let service = &ctx.state.assignment_service;
    assert_eq!(
        service.select_next(Some("legacy")).await.unwrap(),
        Selection::NoAgentAvailable
    );
    assert_eq!(
        service.select_next(Some("missing")).await.unwrap(),
        Selection::NoAgentAvailable
    );
    assert_eq!(
        fairness_counts(&ctx.test_db, "legacy").await,
        vec![("a".to_string(), 0, 0)]
    );

    ctx.teardown().await;
}

#[tokio::test]
async fn test_global_rotation_uses_agent_counters() {
    let ctx = setup_routing(custom_settings()).await;
    create_agent(&ctx.state, "a", "alice").await;
    create_agent(&ctx.state, "b", "bob").await;
    create_agent_with(
        &ctx.state,
        "c",
        "carol",
        vec![Capability::LivechatAgent],
        PresenceStatus::Offline,
    )
    .await;

    let service = &ctx.state.assignment_service;
    let first = assigned_id(&service.select_next(None).await.unwrap());
    let second = assigned_id(&service.select_next(None).await.unwrap());
    let third = assigned_id(&service.select_next(None).await.unwrap());
    assert_eq!((first.as_str(), second.as_str(), third.as_str()), ("a", "b", "a"));

    let alice = ctx.state.agent_directory_service.get_agent("a").await.unwrap();
    let carol = ctx.state.agent_directory_service.get_agent("c").await.unwrap();
    assert_eq!(alice.routing_count, 2);
    assert_eq!(carol.routing_count, 0);

    // Blank department means global rotation too
    assert_eq!(assigned_id(&service.select_next(Some("  ")).await.unwrap()), "b");

    ctx.teardown().await;
}

#[tokio::test]
async fn test_claim_skips_candidate_that_went_offline() {
    let ctx = setup_routing(custom_settings()).await;
    create_department(&ctx.state, "support").await;
    create_agent(&ctx.state, "a", "alice").await;
    add_member(&ctx.state, "support", "a", 0).await;

    let candidates = vec!["a".to_string()];
    ctx.state
        .agent_directory_service
        .set_presence("a", PresenceStatus::Offline)
        .await
        .unwrap();

    let claimed = ctx
        .test_db
        .db()
        .claim_next_for_department("support", RotationPool::Agents, &candidates)
        .await
        .unwrap();
    assert!(claimed.is_none());
    assert_eq!(
        fairness_counts(&ctx.test_db, "support").await,
        vec![("a".to_string(), 0, 0)]
    );

    ctx.teardown().await;
}

#[tokio::test]
async fn test_vanished_candidate_is_retried_once() {
    let ctx = setup_routing(custom_settings()).await;
    create_department(&ctx.state, "support").await;
    create_agent(&ctx.state, "a", "alice").await;
    add_member(&ctx.state, "support", "a", 0).await;

    let claims = Arc::new(VanishingClaims::new(ctx.test_db.db(), 1));
    let service = service_with_claims(&ctx, claims.clone());

    let selection = service.select_next(Some("support")).await.unwrap();
    assert_eq!(assigned_id(&selection), "a");
    assert_eq!(claims.claims(), 2);
    assert_eq!(
        fairness_counts(&ctx.test_db, "support").await,
        vec![("a".to_string(), 1, 0)]
    );

    ctx.teardown().await;
}

#[tokio::test]
async fn test_second_vanished_claim_gives_no_agent() {
    let ctx = setup_routing(custom_settings()).await;
    create_department(&ctx.state, "support").await;
    create_agent(&ctx.state, "a", "alice").await;
    add_member(&ctx.state, "support", "a", 0).await;

    let claims = Arc::new(VanishingClaims::new(ctx.test_db.db(), 2));
    let service = service_with_claims(&ctx, claims.clone());

    let selection = service.select_next(Some("support")).await.unwrap();
    assert_eq!(selection, Selection::NoAgentAvailable);
    assert_eq!(claims.claims(), 2);
    assert_eq!(
        fairness_counts(&ctx.test_db, "support").await,
        vec![("a".to_string(), 0, 0)]
    );

    ctx.teardown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_selections_pick_distinct_agents() {
    let ctx = setup_routing(custom_settings()).await;
    create_department(&ctx.state, "support").await;
    let ids = ["a", "b", "c", "d", "e"];
    for id in ids {
        create_agent(&ctx.state, id, &format!("agent-{}", id)).await;
        add_member(&ctx.state, "support", id, 0).await;
    }

    let mut handles = Vec::new();
    for _ in 0..ids.len() {
        let service = ctx.state.assignment_service.clone();
        handles.push(tokio::spawn(async move {
            service.select_next(Some("support")).await
        }));
    }

    let mut winners = HashSet::new();
    for handle in handles {
        let selection = handle.await.unwrap().unwrap();
        winners.insert(assigned_id(&selection));
    }

    assert_eq!(winners.len(), ids.len());
    for (agent_id, count, bot_count) in fairness_counts(&ctx.test_db, "support").await {
        assert_eq!(count, 1, "agent {} selected more than once", agent_id);
        assert_eq!(bot_count, 0);
    }

    ctx.teardown().await;
}
