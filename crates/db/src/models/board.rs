use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    card::Card, card_activity::CardActivity, label::Label, list::List, visibility::Visibility,
};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub visibility: Visibility,
    pub workspace_id: i64,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct BoardRef {
    pub id: i64,
    pub workspace_id: i64,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoard {
    pub name: String,
    #[serde(default)]
    pub lists: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBoard {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub visibility: Option<Visibility>,
}

/// Card filters for the board view. Empty means "no filter".
#[derive(Debug, Clone, Default)]
pub struct BoardFilters {
    pub members: Vec<String>,
    pub labels: Vec<String>,
}

impl BoardFilters {
    fn matches(&self, labels: &[String], members: &[String]) -> bool {
        let member_ok =
            self.members.is_empty() || members.iter().any(|m| self.members.contains(m));
        let label_ok = self.labels.is_empty() || labels.iter().any(|l| self.labels.contains(l));
        member_ok && label_ok
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CardSummary {
    #[serde(flatten)]
    pub card: Card,
    pub label_public_ids: Vec<String>,
    pub member_public_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ListWithCards {
    #[serde(flatten)]
    pub list: List,
    pub cards: Vec<CardSummary>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub labels: Vec<Label>,
    pub lists: Vec<ListWithCards>,
}

const BOARD_COLUMNS: &str = "id, public_id, name, description, slug, visibility, workspace_id, \
                             created_by, created_at, updated_at";

impl Board {
    /// Creates the board together with its initial lists and labels in one
    /// transaction.
    pub async fn create_with_lists_and_labels(
        pool: &SqlitePool,
        workspace_id: i64,
        name: &str,
        slug: &str,
        lists: &[String],
        labels: &[String],
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let board = sqlx::query_as::<_, Board>(&format!(
            "INSERT INTO boards (public_id, name, slug, workspace_id, created_by)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {BOARD_COLUMNS}"
        ))
        .bind(utils::uid::generate_uid())
        .bind(name)
        .bind(slug)
        .bind(workspace_id)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        List::bulk_create(&mut tx, board.id, lists, created_by).await?;
        Label::bulk_create(&mut tx, board.id, labels, created_by).await?;

        tx.commit().await?;
        Ok(board)
    }

    pub async fn find_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(&format!(
            "SELECT {BOARD_COLUMNS} FROM boards WHERE public_id = ? AND deleted_at IS NULL"
        ))
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_ref_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<BoardRef>, sqlx::Error> {
        sqlx::query_as::<_, BoardRef>(
            "SELECT id, workspace_id FROM boards WHERE public_id = ? AND deleted_at IS NULL",
        )
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    /// Public board by slug within a workspace; private boards are invisible here.
    pub async fn find_public_by_slug(
        pool: &SqlitePool,
        workspace_id: i64,
        slug: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(&format!(
            "SELECT {BOARD_COLUMNS} FROM boards
             WHERE workspace_id = ? AND slug = ? AND visibility = 'public'
               AND deleted_at IS NULL"
        ))
        .bind(workspace_id)
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_all_by_workspace(
        pool: &SqlitePool,
        workspace_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(&format!(
            "SELECT {BOARD_COLUMNS} FROM boards
             WHERE workspace_id = ? AND deleted_at IS NULL
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(workspace_id)
        .fetch_all(pool)
        .await
    }

    /// Whether `slug` is free among live boards of the workspace, optionally
    /// ignoring the board `exclude`.
    pub async fn is_slug_available(
        pool: &SqlitePool,
        workspace_id: i64,
        slug: &str,
        exclude: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM boards
                  WHERE workspace_id = ? AND slug = ? AND deleted_at IS NULL
                    AND (? IS NULL OR id != ?))",
        )
        .bind(workspace_id)
        .bind(slug)
        .bind(exclude)
        .bind(exclude)
        .fetch_one(pool)
        .await?;
        Ok(!taken)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &UpdateBoard,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Board>(&format!(
            "UPDATE boards
                SET name = COALESCE(?, name),
                    slug = COALESCE(?, slug),
                    visibility = COALESCE(?, visibility),
                    updated_at = datetime('now', 'subsec')
              WHERE id = ? AND deleted_at IS NULL
              RETURNING {BOARD_COLUMNS}"
        ))
        .bind(data.name.as_deref())
        .bind(data.slug.as_deref())
        .bind(data.visibility)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Soft-deletes the board, its lists and their cards, recording
    /// `card.archived` once per card. Returns the archived card ids.
    pub async fn archive(
        pool: &SqlitePool,
        board_id: i64,
        deleted_by: Uuid,
    ) -> Result<Vec<i64>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let affected = sqlx::query(
            "UPDATE boards SET deleted_at = datetime('now', 'subsec'), deleted_by = ?
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(deleted_by)
        .bind(board_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        let list_ids = List::soft_delete_by_board(&mut tx, board_id, deleted_by).await?;
        let card_ids = Card::soft_delete_by_list_ids(&mut tx, &list_ids, deleted_by).await?;
        CardActivity::create_archived(&mut tx, &card_ids, deleted_by).await?;

        tx.commit().await?;
        Ok(card_ids)
    }

    /// Board with labels and lists, each list carrying the cards that pass
    /// `filters`.
    pub async fn detail(
        pool: &SqlitePool,
        board: Board,
        filters: &BoardFilters,
    ) -> Result<BoardDetail, sqlx::Error> {
        let labels = Label::find_by_board(pool, board.id).await?;
        let lists = List::find_by_board(pool, board.id).await?;
        let cards = Card::find_by_board(pool, board.id).await?;

        let mut card_labels: HashMap<i64, Vec<String>> = HashMap::new();
        for (card_id, label) in Card::label_links_for_board(pool, board.id).await? {
            card_labels.entry(card_id).or_default().push(label);
        }
        let mut card_members: HashMap<i64, Vec<String>> = HashMap::new();
        for (card_id, member) in Card::member_links_for_board(pool, board.id).await? {
            card_members.entry(card_id).or_default().push(member);
        }

        let mut by_list: HashMap<i64, Vec<CardSummary>> = HashMap::new();
        for card in cards {
            let label_public_ids = card_labels.remove(&card.id).unwrap_or_default();
            let member_public_ids = card_members.remove(&card.id).unwrap_or_default();
            if !filters.matches(&label_public_ids, &member_public_ids) {
                continue;
            }
            by_list.entry(card.list_id).or_default().push(CardSummary {
                card,
                label_public_ids,
                member_public_ids,
            });
        }

        let list_ids: HashSet<i64> = lists.iter().map(|l| l.id).collect();
        by_list.retain(|id, _| list_ids.contains(id));

        let lists = lists
            .into_iter()
            .map(|list| ListWithCards {
                cards: by_list.remove(&list.id).unwrap_or_default(),
                list,
            })
            .collect();

        Ok(BoardDetail {
            board,
            labels,
            lists,
        })
    }
}
