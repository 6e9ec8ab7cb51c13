use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    /// sha256 hex of the user's API token
    #[serde(skip)]
    #[ts(skip)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub async fn create(
        pool: &SqlitePool,
        name: Option<&str>,
        email: &str,
        token_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, name, email, token_hash)
               VALUES (?, ?, ?, ?)
               RETURNING id, name, email, token_hash, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email.to_lowercase())
        .bind(token_hash)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, token_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, token_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email.to_lowercase())
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_token_hash(
        pool: &SqlitePool,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, token_hash, created_at FROM users WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await
    }
}
