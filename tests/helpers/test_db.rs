use oxidesk_routing::infrastructure::persistence::Database;
use std::path::PathBuf;

/// File-backed SQLite database for one test; removed on teardown.
pub struct TestDatabase {
    db: Database,
    path: PathBuf,
}

impl TestDatabase {
    pub fn db(&self) -> Database {
        self.db.clone()
    }

    pub async fn teardown(self) {
        self.db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

pub async fn setup_test_db() -> TestDatabase {
    // Unique file per test so tests can run in parallel
    let path = std::env::temp_dir().join(format!("routing_test_{}.db", uuid::Uuid::new_v4()));
    let db_url = format!("sqlite://{}?mode=rwc", path.display());

    let db = Database::connect(&db_url)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    TestDatabase { db, path }
}
