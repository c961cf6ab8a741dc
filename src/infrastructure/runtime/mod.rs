pub mod tokio;

pub use self::tokio::{SystemClock, TokioTaskSpawner, TokioTimeService};
