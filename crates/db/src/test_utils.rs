//! Test utilities for database tests.
//!
//! A template database is migrated once per test binary; every test then gets
//! a private copy of it in its own temp directory.

use std::{
    str::FromStr,
    sync::OnceLock,
    time::Duration,
};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tempfile::TempDir;
use tokio::sync::OnceCell;

use crate::models::{user::User, workspace::Workspace};

static TEMPLATE_DIR: OnceLock<TempDir> = OnceLock::new();
static TEMPLATE_READY: OnceCell<()> = OnceCell::const_new();

fn get_template_dir() -> &'static TempDir {
    TEMPLATE_DIR.get_or_init(|| TempDir::new().expect("Failed to create template temp dir"))
}

async fn ensure_template_ready() {
    TEMPLATE_READY
        .get_or_init(|| async {
            let template_path = get_template_dir().path().join("template.db");

            let options =
                SqliteConnectOptions::from_str(&format!("sqlite://{}", template_path.display()))
                    .expect("Invalid template database URL")
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Delete);

            let pool = SqlitePoolOptions::new()
                .min_connections(0)
                .max_connections(1)
                .connect_with(options)
                .await
                .expect("Failed to create template pool");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations on template");

            // Release the file before it gets copied
            pool.close().await;
        })
        .await;
}

/// Create a test database pool with migrations applied.
///
/// Returns the pool and a TempDir that must be kept alive for the duration of the test.
pub async fn create_test_pool() -> (SqlitePool, TempDir) {
    ensure_template_ready().await;

    let temp_dir = TempDir::new().expect("Failed to create test temp dir");
    let db_path = temp_dir.path().join("test.db");

    let template_path = get_template_dir().path().join("template.db");
    std::fs::copy(&template_path, &db_path).expect("Failed to copy template database");

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
        .expect("Invalid test database URL")
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .expect("Failed to create test pool");

    (pool, temp_dir)
}

/// Inserts a user whose token hash is derived from the email.
pub async fn create_test_user(pool: &SqlitePool, email: &str) -> User {
    User::create(pool, Some("Test User"), email, &format!("hash-{email}"))
        .await
        .expect("Failed to create test user")
}

/// Inserts a workspace with `owner` as its active admin.
pub async fn create_test_workspace(pool: &SqlitePool, owner: &User, slug: &str) -> Workspace {
    Workspace::create(
        pool,
        &utils::uid::generate_uid(),
        "Test Workspace",
        slug,
        None,
        owner.id,
        &owner.email,
    )
    .await
    .expect("Failed to create test workspace")
}
