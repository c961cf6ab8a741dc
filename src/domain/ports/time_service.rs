use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[async_trait]
pub trait TimeService: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Source of "now" for business-hour evaluation
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
