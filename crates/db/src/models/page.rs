//! Wiki pages, their per-page tags and the workspace's reusable page labels.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    user::User,
    visibility::Visibility,
    workspace::{Workspace, WorkspaceMember},
};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub visibility: Visibility,
    pub workspace_id: i64,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct PageRef {
    pub id: i64,
    pub workspace_id: i64,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PageTag {
    pub public_id: String,
    pub name: String,
    pub colour_code: Option<String>,
    #[serde(skip)]
    #[ts(skip)]
    pub page_id: i64,
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct PageTagRef {
    pub id: i64,
    pub page_id: i64,
    pub workspace_id: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PageLabel {
    #[serde(skip)]
    #[ts(skip)]
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub colour_code: Option<String>,
    #[serde(skip)]
    #[ts(skip)]
    pub workspace_id: i64,
}

/// Row of the workspace page index.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub public_id: String,
    pub title: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<PageTag>,
    pub labels: Vec<PageLabel>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PageWorkspace {
    pub public_id: String,
    pub slug: String,
    pub members: Vec<WorkspaceMember>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PageDetail {
    #[serde(flatten)]
    pub page: Page,
    pub author: Option<User>,
    pub workspace: PageWorkspace,
    pub tags: Vec<PageTag>,
    pub labels: Vec<PageLabel>,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreatePage {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePage {
    pub title: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub slug: Option<String>,
}

/// Body for creating a tag or a page label.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagLike {
    pub name: String,
    pub colour_code: Option<String>,
}

/// Body for updating a tag or a page label.
#[derive(Debug, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTagLike {
    pub name: Option<String>,
    pub colour_code: Option<String>,
}

const PAGE_COLUMNS: &str = "id, public_id, title, description, slug, visibility, workspace_id, \
                            created_by, created_at, updated_at";

impl Page {
    pub async fn create(
        pool: &SqlitePool,
        workspace_id: i64,
        data: &CreatePage,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Page>(&format!(
            "INSERT INTO pages (public_id, title, description, workspace_id, created_by)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {PAGE_COLUMNS}"
        ))
        .bind(utils::uid::generate_uid())
        .bind(&data.title)
        .bind(data.description.as_deref())
        .bind(workspace_id)
        .bind(created_by)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &UpdatePage,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Page>(&format!(
            "UPDATE pages
                SET title = COALESCE(?, title),
                    description = COALESCE(?, description),
                    visibility = COALESCE(?, visibility),
                    slug = COALESCE(?, slug),
                    updated_at = datetime('now', 'subsec')
              WHERE id = ? AND deleted_at IS NULL
              RETURNING {PAGE_COLUMNS}"
        ))
        .bind(data.title.as_deref())
        .bind(data.description.as_deref())
        .bind(data.visibility)
        .bind(data.slug.as_deref())
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
            "UPDATE pages SET deleted_at = datetime('now', 'subsec'), deleted_by = ?
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(deleted_by)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_ref_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<PageRef>, sqlx::Error> {
        sqlx::query_as::<_, PageRef>(
            "SELECT id, workspace_id, visibility FROM pages
             WHERE public_id = ? AND deleted_at IS NULL",
        )
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Page>(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE public_id = ? AND deleted_at IS NULL"
        ))
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Page>(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE slug = ? AND deleted_at IS NULL"
        ))
        .bind(slug.to_lowercase())
        .fetch_optional(pool)
        .await
    }

    /// Slugs are unique across all live pages; `exclude` skips the page
    /// being renamed.
    pub async fn is_slug_available(
        pool: &SqlitePool,
        slug: &str,
        exclude: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM pages
                  WHERE slug = ? AND deleted_at IS NULL AND (? IS NULL OR id != ?))",
        )
        .bind(slug.to_lowercase())
        .bind(exclude)
        .bind(exclude)
        .fetch_one(pool)
        .await?;
        Ok(!taken)
    }

    /// Newest first, each with its live tags and labels.
    pub async fn find_all_by_workspace(
        pool: &SqlitePool,
        workspace_id: i64,
    ) -> Result<Vec<PageSummary>, sqlx::Error> {
        let pages = sqlx::query_as::<_, Page>(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages
             WHERE workspace_id = ? AND deleted_at IS NULL
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;

        let mut tags: HashMap<i64, Vec<PageTag>> = HashMap::new();
        for tag in sqlx::query_as::<_, PageTag>(
            r#"SELECT t.public_id, t.name, t.colour_code, t.page_id
                 FROM page_tags t
                 JOIN pages p ON p.id = t.page_id
                WHERE p.workspace_id = ? AND t.deleted_at IS NULL
                ORDER BY t.id ASC"#,
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?
        {
            tags.entry(tag.page_id).or_default().push(tag);
        }

        let mut labels: HashMap<i64, Vec<PageLabel>> = HashMap::new();
        for (page_id, label) in PageLabel::links_for_workspace(pool, workspace_id).await? {
            labels.entry(page_id).or_default().push(label);
        }

        Ok(pages
            .into_iter()
            .map(|page| PageSummary {
                tags: tags.remove(&page.id).unwrap_or_default(),
                labels: labels.remove(&page.id).unwrap_or_default(),
                public_id: page.public_id,
                title: page.title,
                visibility: page.visibility,
                created_at: page.created_at,
            })
            .collect())
    }

    /// Page with its author, workspace members, tags and labels.
    pub async fn detail(pool: &SqlitePool, page: Page) -> Result<PageDetail, sqlx::Error> {
        let author = match page.created_by {
            Some(user_id) => User::find_by_id(pool, user_id).await?,
            None => None,
        };
        let workspace = Workspace::find_by_id(pool, page.workspace_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let members = WorkspaceMember::find_all(pool, workspace.id).await?;
        let tags = PageTag::find_by_page(pool, page.id).await?;
        let labels = PageLabel::find_by_page(pool, page.id).await?;

        Ok(PageDetail {
            page,
            author,
            workspace: PageWorkspace {
                public_id: workspace.public_id,
                slug: workspace.slug,
                members,
            },
            tags,
            labels,
        })
    }
}

const TAG_COLUMNS: &str = "public_id, name, colour_code, page_id";

impl PageTag {
    pub async fn create(
        pool: &SqlitePool,
        page_id: i64,
        data: &CreateTagLike,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PageTag>(&format!(
            "INSERT INTO page_tags (public_id, name, colour_code, page_id, created_by)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {TAG_COLUMNS}"
        ))
        .bind(utils::uid::generate_uid())
        .bind(&data.name)
        .bind(data.colour_code.as_deref())
        .bind(page_id)
        .bind(created_by)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_page(pool: &SqlitePool, page_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PageTag>(&format!(
            "SELECT {TAG_COLUMNS} FROM page_tags
             WHERE page_id = ? AND deleted_at IS NULL
             ORDER BY id ASC"
        ))
        .bind(page_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_ref_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<PageTagRef>, sqlx::Error> {
        sqlx::query_as::<_, PageTagRef>(
            r#"SELECT t.id, t.page_id, p.workspace_id
                 FROM page_tags t
                 JOIN pages p ON p.id = t.page_id
                WHERE t.public_id = ? AND t.deleted_at IS NULL AND p.deleted_at IS NULL"#,
        )
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &UpdateTagLike,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PageTag>(&format!(
            "UPDATE page_tags
                SET name = COALESCE(?, name),
                    colour_code = COALESCE(?, colour_code),
                    updated_at = datetime('now', 'subsec')
              WHERE id = ? AND deleted_at IS NULL
              RETURNING {TAG_COLUMNS}"
        ))
        .bind(data.name.as_deref())
        .bind(data.colour_code.as_deref())
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
            "UPDATE page_tags SET deleted_at = datetime('now', 'subsec'), deleted_by = ?
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(deleted_by)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

const LABEL_COLUMNS: &str = "id, public_id, name, colour_code, workspace_id";

impl PageLabel {
    pub async fn create(
        pool: &SqlitePool,
        workspace_id: i64,
        data: &CreateTagLike,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PageLabel>(&format!(
            "INSERT INTO page_labels (public_id, name, colour_code, workspace_id, created_by)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {LABEL_COLUMNS}"
        ))
        .bind(utils::uid::generate_uid())
        .bind(&data.name)
        .bind(data.colour_code.as_deref())
        .bind(workspace_id)
        .bind(created_by)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_workspace(
        pool: &SqlitePool,
        workspace_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PageLabel>(&format!(
            "SELECT {LABEL_COLUMNS} FROM page_labels
             WHERE workspace_id = ? AND deleted_at IS NULL
             ORDER BY id ASC"
        ))
        .bind(workspace_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PageLabel>(&format!(
            "SELECT {LABEL_COLUMNS} FROM page_labels WHERE public_id = ? AND deleted_at IS NULL"
        ))
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_page(pool: &SqlitePool, page_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PageLabel>(
            r#"SELECT l.id, l.public_id, l.name, l.colour_code, l.workspace_id
                 FROM page_labels l
                 JOIN page_label_assignments a ON a.label_id = l.id
                WHERE a.page_id = ? AND l.deleted_at IS NULL
                ORDER BY l.id ASC"#,
        )
        .bind(page_id)
        .fetch_all(pool)
        .await
    }

    async fn links_for_workspace(
        pool: &SqlitePool,
        workspace_id: i64,
    ) -> Result<Vec<(i64, PageLabel)>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (i64, i64, String, String, Option<String>, i64)>(
            r#"SELECT a.page_id, l.id, l.public_id, l.name, l.colour_code, l.workspace_id
                 FROM page_label_assignments a
                 JOIN page_labels l ON l.id = a.label_id
                WHERE l.workspace_id = ? AND l.deleted_at IS NULL
                ORDER BY l.id ASC"#,
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(page_id, id, public_id, name, colour_code, workspace_id)| {
                (
                    page_id,
                    PageLabel {
                        id,
                        public_id,
                        name,
                        colour_code,
                        workspace_id,
                    },
                )
            })
            .collect())
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &UpdateTagLike,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PageLabel>(&format!(
            "UPDATE page_labels
                SET name = COALESCE(?, name),
                    colour_code = COALESCE(?, colour_code),
                    updated_at = datetime('now', 'subsec')
              WHERE id = ? AND deleted_at IS NULL
              RETURNING {LABEL_COLUMNS}"
        ))
        .bind(data.name.as_deref())
        .bind(data.colour_code.as_deref())
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
            "UPDATE page_labels SET deleted_at = datetime('now', 'subsec'), deleted_by = ?
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(deleted_by)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Idempotent.
    pub async fn attach(pool: &SqlitePool, page_id: i64, label_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO page_label_assignments (page_id, label_id) VALUES (?, ?)")
            .bind(page_id)
            .bind(label_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn detach(pool: &SqlitePool, page_id: i64, label_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM page_label_assignments WHERE page_id = ? AND label_id = ?")
            .bind(page_id)
            .bind(label_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
