use crate::infrastructure::http::controllers::{
    agents, assignments, availability, business_hours, departments,
};
use crate::infrastructure::http::middleware::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Routing
        .route("/api/routing/next", post(assignments::select_next_agent))
        .route("/api/routing/next-bot", post(assignments::select_next_bot))
        // Business hours
        .route(
            "/api/business-hours",
            post(business_hours::save_business_hour).get(business_hours::list_business_hours),
        )
        .route(
            "/api/business-hours/:id",
            delete(business_hours::delete_business_hour),
        )
        // Departments
        .route(
            "/api/departments",
            post(departments::create_department).get(departments::list_departments),
        )
        .route(
            "/api/departments/:id",
            get(departments::get_department)
                .patch(departments::update_department)
                .delete(departments::delete_department),
        )
        .route(
            "/api/departments/:id/open",
            get(business_hours::is_department_open),
        )
        .route(
            "/api/departments/:id/business-hours",
            delete(business_hours::delete_department_business_hours),
        )
        .route(
            "/api/departments/:id/agents",
            get(departments::list_department_agents),
        )
        .route(
            "/api/departments/:id/agents/reset-counts",
            post(departments::reset_department_counts),
        )
        .route(
            "/api/departments/:id/agents/:agent_id",
            put(departments::add_department_agent).delete(departments::remove_department_agent),
        )
        .route("/api/queue", get(departments::list_queue))
        // Agent directory
        .route(
            "/api/agents",
            post(agents::register_agent).get(agents::list_agents),
        )
        .route("/api/agents/status-summary", get(agents::status_summary))
        .route("/api/agents/:id", get(agents::get_agent))
        .route(
            "/api/agents/:id/business-hours",
            get(agents::agent_business_hours),
        )
        .route("/api/agents/:id/presence", put(agents::set_presence))
        .route(
            "/api/agents/:id/capabilities/:capability",
            put(agents::grant_capability).delete(agents::revoke_capability),
        )
        .route("/api/agents/:id/username", put(agents::rename_agent))
        // Availability
        .route(
            "/api/availability/refresh",
            post(availability::refresh_availability),
        )
        .route("/health", get(availability::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
