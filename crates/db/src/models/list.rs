use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    card::Card,
    card_activity::CardActivity,
    ordering::{LISTS, begin_write},
};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub index: i64,
    pub board_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A list with the ids needed for access checks and event routing.
#[derive(Debug, Clone, FromRow)]
pub struct ListRef {
    pub id: i64,
    pub public_id: String,
    pub board_id: i64,
    pub workspace_id: i64,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateList {
    pub board_public_id: String,
    pub name: String,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateList {
    pub name: Option<String>,
    pub index: Option<i64>,
}

const LIST_COLUMNS: &str = r#"id, public_id, name, "index", board_id, created_at, updated_at"#;

impl List {
    /// Appends a new list after the board's last list.
    pub async fn create(
        pool: &SqlitePool,
        name: &str,
        board_id: i64,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = begin_write(pool).await?;
        let index = LISTS.count(&mut tx, board_id).await?;
        let list = Self::insert(&mut tx, name, index, board_id, created_by).await?;
        tx.commit().await?;
        Ok(list)
    }

    /// Creates lists for a fresh board, indexed by position.
    pub async fn bulk_create(
        conn: &mut SqliteConnection,
        board_id: i64,
        names: &[String],
        created_by: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut lists = Vec::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            lists.push(Self::insert(&mut *conn, name, index as i64, board_id, created_by).await?);
        }
        Ok(lists)
    }

    async fn insert(
        conn: &mut SqliteConnection,
        name: &str,
        index: i64,
        board_id: i64,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, List>(&format!(
            r#"INSERT INTO lists (public_id, name, "index", board_id, created_by)
               VALUES (?, ?, ?, ?, ?)
               RETURNING {LIST_COLUMNS}"#
        ))
        .bind(utils::uid::generate_uid())
        .bind(name)
        .bind(index)
        .bind(board_id)
        .bind(created_by)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(&format!(
            "SELECT {LIST_COLUMNS} FROM lists WHERE public_id = ? AND deleted_at IS NULL"
        ))
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(&format!(
            "SELECT {LIST_COLUMNS} FROM lists WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_ref_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<ListRef>, sqlx::Error> {
        sqlx::query_as::<_, ListRef>(
            r#"SELECT l.id, l.public_id, l.board_id, b.workspace_id
                 FROM lists l
                 JOIN boards b ON b.id = l.board_id
                WHERE l.public_id = ? AND l.deleted_at IS NULL AND b.deleted_at IS NULL"#,
        )
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_board(pool: &SqlitePool, board_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(&format!(
            r#"SELECT {LIST_COLUMNS} FROM lists
               WHERE board_id = ? AND deleted_at IS NULL
               ORDER BY "index" ASC"#
        ))
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    pub async fn rename(pool: &SqlitePool, id: i64, name: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, List>(&format!(
            "UPDATE lists SET name = ?, updated_at = datetime('now', 'subsec')
             WHERE id = ? AND deleted_at IS NULL
             RETURNING {LIST_COLUMNS}"
        ))
        .bind(name)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Moves the list to `new_index` (clamped), shifting its siblings.
    pub async fn reorder(pool: &SqlitePool, id: i64, new_index: i64) -> Result<Self, sqlx::Error> {
        let mut tx = begin_write(pool).await?;
        let current = LISTS.position(&mut tx, id).await?;

        LISTS
            .move_within(&mut tx, current.parent_id, id, current.index, new_index)
            .await?;

        let list = sqlx::query_as::<_, List>(&format!(
            "SELECT {LIST_COLUMNS} FROM lists WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(list)
    }

    /// Soft-deletes the list and its cards, records `card.archived` for each
    /// card and closes the gap among the remaining lists. Returns the ids of
    /// the archived cards.
    pub async fn archive(
        pool: &SqlitePool,
        list: &List,
        deleted_by: Uuid,
    ) -> Result<Vec<i64>, sqlx::Error> {
        let mut tx = begin_write(pool).await?;
        let at = LISTS.position(&mut tx, list.id).await?;

        let card_ids = Card::soft_delete_by_list_ids(&mut tx, &[list.id], deleted_by).await?;
        CardActivity::create_archived(&mut tx, &card_ids, deleted_by).await?;

        sqlx::query(
            "UPDATE lists SET deleted_at = datetime('now', 'subsec'), deleted_by = ?
             WHERE id = ?",
        )
        .bind(deleted_by)
        .bind(list.id)
        .execute(&mut *tx)
        .await?;

        LISTS.close_gap(&mut tx, at.parent_id, at.index).await?;

        tx.commit().await?;
        Ok(card_ids)
    }

    /// Soft-deletes every list of a board. Returns the deleted list ids.
    pub async fn soft_delete_by_board(
        conn: &mut SqliteConnection,
        board_id: i64,
        deleted_by: Uuid,
    ) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE lists SET deleted_at = datetime('now', 'subsec'), deleted_by = ?
             WHERE board_id = ? AND deleted_at IS NULL
             RETURNING id",
        )
        .bind(deleted_by)
        .bind(board_id)
        .fetch_all(conn)
        .await
    }
}
