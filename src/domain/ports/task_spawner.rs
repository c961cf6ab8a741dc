use futures::future::BoxFuture;

/// Spawns the long-running background loops (availability worker, listeners).
/// Kept behind a trait so tests can run them inline or not at all.
pub trait TaskSpawner: Send + Sync {
    /// `name` identifies the task in logs
    fn spawn(&self, name: &'static str, future: BoxFuture<'static, ()>);
}
