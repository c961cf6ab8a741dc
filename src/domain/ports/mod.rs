pub mod agent_repository;
pub mod business_hour_repository;
pub mod department_repository;
pub mod membership_repository;
pub mod task_spawner;
pub mod time_service;
