use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Member,
    Guest,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemberStatus {
    Invited,
    Active,
    Removed,
}

/// Membership row joined with the member's display name.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub id: i64,
    pub public_id: String,
    pub workspace_id: i64,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub name: Option<String>,
    pub role: MemberRole,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspace {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AddWorkspaceMember {
    pub email: String,
    #[serde(default = "default_role")]
    pub role: MemberRole,
}

fn default_role() -> MemberRole {
    MemberRole::Member
}

const WORKSPACE_COLUMNS: &str =
    "id, public_id, name, slug, description, created_by, created_at, updated_at";

const MEMBER_SELECT: &str = r#"SELECT m.id, m.public_id, m.workspace_id, m.user_id, m.email,
           u.name AS name, m.role, m.status, m.created_at
      FROM workspace_members m
      LEFT JOIN users u ON u.id = m.user_id"#;

impl Workspace {
    /// Inserts the workspace and makes `created_by` an active admin of it.
    pub async fn create(
        pool: &SqlitePool,
        public_id: &str,
        name: &str,
        slug: &str,
        description: Option<&str>,
        created_by: Uuid,
        creator_email: &str,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let workspace = sqlx::query_as::<_, Workspace>(&format!(
            "INSERT INTO workspaces (public_id, name, slug, description, created_by)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {WORKSPACE_COLUMNS}"
        ))
        .bind(public_id)
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO workspace_members (public_id, workspace_id, user_id, email, role, status, created_by)
             VALUES (?, ?, ?, ?, 'admin', 'active', ?)",
        )
        .bind(utils::uid::generate_uid())
        .bind(workspace.id)
        .bind(created_by)
        .bind(creator_email)
        .bind(created_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(workspace)
    }

    pub async fn find_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Workspace>(&format!(
            "SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE public_id = ? AND deleted_at IS NULL"
        ))
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Workspace>(&format!(
            "SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE slug = ? AND deleted_at IS NULL"
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Workspace>(&format!(
            "SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Workspaces where `user_id` is an active member.
    pub async fn find_all_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Workspace>(
            r#"SELECT w.id, w.public_id, w.name, w.slug, w.description, w.created_by,
                      w.created_at, w.updated_at
                 FROM workspaces w
                 JOIN workspace_members m ON m.workspace_id = w.id
                WHERE m.user_id = ?
                  AND m.status = 'active'
                  AND m.deleted_at IS NULL
                  AND w.deleted_at IS NULL
                ORDER BY w.created_at ASC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn is_slug_available(pool: &SqlitePool, slug: &str) -> Result<bool, sqlx::Error> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM workspaces WHERE slug = ? AND deleted_at IS NULL)",
        )
        .bind(slug)
        .fetch_one(pool)
        .await?;
        Ok(!taken)
    }
}

impl WorkspaceMember {
    pub async fn find_all(
        pool: &SqlitePool,
        workspace_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WorkspaceMember>(&format!(
            "{MEMBER_SELECT}
             WHERE m.workspace_id = ? AND m.deleted_at IS NULL
             ORDER BY m.created_at ASC"
        ))
        .bind(workspace_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, WorkspaceMember>(&format!(
            "{MEMBER_SELECT} WHERE m.public_id = ? AND m.deleted_at IS NULL"
        ))
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_card(pool: &SqlitePool, card_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WorkspaceMember>(&format!(
            "{MEMBER_SELECT}
             JOIN card_members cm ON cm.workspace_member_id = m.id
             WHERE cm.card_id = ? AND m.deleted_at IS NULL
             ORDER BY m.created_at ASC"
        ))
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    /// Active, non-deleted membership of `user_id` in `workspace_id`.
    pub async fn find_active_for_user(
        pool: &SqlitePool,
        workspace_id: i64,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, WorkspaceMember>(&format!(
            "{MEMBER_SELECT}
             WHERE m.workspace_id = ? AND m.user_id = ?
               AND m.status = 'active' AND m.deleted_at IS NULL"
        ))
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_email(
        pool: &SqlitePool,
        workspace_id: i64,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, WorkspaceMember>(&format!(
            "{MEMBER_SELECT}
             WHERE m.workspace_id = ? AND m.email = ? AND m.deleted_at IS NULL"
        ))
        .bind(workspace_id)
        .bind(email.to_lowercase())
        .fetch_optional(pool)
        .await
    }

    /// Adds a member by email. A known user joins as active right away;
    /// an unknown address stays invited until that user exists.
    pub async fn add(
        pool: &SqlitePool,
        workspace_id: i64,
        email: &str,
        user_id: Option<Uuid>,
        role: MemberRole,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let status = if user_id.is_some() {
            MemberStatus::Active
        } else {
            MemberStatus::Invited
        };
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO workspace_members (public_id, workspace_id, user_id, email, role, status, created_by)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(utils::uid::generate_uid())
        .bind(workspace_id)
        .bind(user_id)
        .bind(email.to_lowercase())
        .bind(role)
        .bind(status)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        sqlx::query_as::<_, WorkspaceMember>(&format!("{MEMBER_SELECT} WHERE m.id = ?"))
            .bind(id)
            .fetch_one(pool)
            .await
    }

    pub async fn soft_delete(
        pool: &SqlitePool,
        id: i64,
        deleted_by: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workspace_members
                SET status = 'removed', deleted_at = datetime('now', 'subsec'), deleted_by = ?
              WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(deleted_by)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub fn is_admin(&self) -> bool {
        self.role == MemberRole::Admin
    }
}
