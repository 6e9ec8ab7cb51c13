use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    card_activity::{CardActivity, CardActivityType, NewCardActivity},
    ordering::{CHECKLIST_ITEMS, CHECKLISTS, begin_write},
};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub index: i64,
    pub card_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    pub completed: bool,
    pub index: i64,
    pub checklist_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistWithItems {
    #[serde(flatten)]
    pub checklist: Checklist,
    pub items: Vec<ChecklistItem>,
}

/// Checklist plus the card/board/workspace it hangs off.
#[derive(Debug, Clone, FromRow)]
pub struct ChecklistRef {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub index: i64,
    pub card_id: i64,
    pub card_public_id: String,
    pub board_id: i64,
    pub workspace_id: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChecklistItemRef {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    pub completed: bool,
    pub index: i64,
    pub checklist_id: i64,
    pub card_id: i64,
    pub card_public_id: String,
    pub board_id: i64,
    pub workspace_id: i64,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistName {
    pub name: String,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateChecklistItem {
    pub title: String,
}

#[derive(Debug, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChecklistItem {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

const CHECKLIST_COLUMNS: &str = r#"id, public_id, name, "index", card_id, created_at, updated_at"#;

const ITEM_COLUMNS: &str =
    r#"id, public_id, title, completed, "index", checklist_id, created_at, updated_at"#;

impl Checklist {
    /// Appends a checklist to the card.
    pub async fn create(
        pool: &SqlitePool,
        card_id: i64,
        name: &str,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = begin_write(pool).await?;
        let index = CHECKLISTS.count(&mut tx, card_id).await?;

        let checklist = sqlx::query_as::<_, Checklist>(&format!(
            r#"INSERT INTO checklists (public_id, name, "index", card_id, created_by)
               VALUES (?, ?, ?, ?, ?)
               RETURNING {CHECKLIST_COLUMNS}"#
        ))
        .bind(utils::uid::generate_uid())
        .bind(name)
        .bind(index)
        .bind(card_id)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        CardActivity::create(
            &mut *tx,
            &NewCardActivity {
                to_title: Some(checklist.name.clone()),
                ..NewCardActivity::new(CardActivityType::ChecklistAdded, card_id, created_by)
            },
        )
        .await?;

        tx.commit().await?;
        Ok(checklist)
    }

    pub async fn find_ref_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<ChecklistRef>, sqlx::Error> {
        sqlx::query_as::<_, ChecklistRef>(
            r#"SELECT cl.id, cl.public_id, cl.name, cl."index", cl.card_id,
                      c.public_id AS card_public_id, l.board_id, b.workspace_id
                 FROM checklists cl
                 JOIN cards c ON c.id = cl.card_id
                 JOIN lists l ON l.id = c.list_id
                 JOIN boards b ON b.id = l.board_id
                WHERE cl.public_id = ?
                  AND cl.deleted_at IS NULL
                  AND c.deleted_at IS NULL"#,
        )
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn rename(
        pool: &SqlitePool,
        checklist: &ChecklistRef,
        name: &str,
        updated_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let renamed = sqlx::query_as::<_, Checklist>(&format!(
            "UPDATE checklists SET name = ?, updated_at = datetime('now', 'subsec')
             WHERE id = ? AND deleted_at IS NULL
             RETURNING {CHECKLIST_COLUMNS}"
        ))
        .bind(name)
        .bind(checklist.id)
        .fetch_one(&mut *tx)
        .await?;

        CardActivity::create(
            &mut *tx,
            &NewCardActivity {
                from_title: Some(checklist.name.clone()),
                to_title: Some(renamed.name.clone()),
                ..NewCardActivity::new(
                    CardActivityType::ChecklistRenamed,
                    checklist.card_id,
                    updated_by,
                )
            },
        )
        .await?;

        tx.commit().await?;
        Ok(renamed)
    }

    /// Soft-deletes the checklist together with its items.
    pub async fn archive(
        pool: &SqlitePool,
        checklist: &ChecklistRef,
        deleted_by: Uuid,
    ) -> Result<(), sqlx::Error> {
        let mut tx = begin_write(pool).await?;
        let at = CHECKLISTS.position(&mut tx, checklist.id).await?;

        sqlx::query(
            "UPDATE checklist_items SET deleted_at = datetime('now', 'subsec'), deleted_by = ?
             WHERE checklist_id = ? AND deleted_at IS NULL",
        )
        .bind(deleted_by)
        .bind(checklist.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE checklists SET deleted_at = datetime('now', 'subsec'), deleted_by = ?
             WHERE id = ?",
        )
        .bind(deleted_by)
        .bind(checklist.id)
        .execute(&mut *tx)
        .await?;

        CHECKLISTS.close_gap(&mut tx, at.parent_id, at.index).await?;

        CardActivity::create(
            &mut *tx,
            &NewCardActivity {
                from_title: Some(checklist.name.clone()),
                ..NewCardActivity::new(
                    CardActivityType::ChecklistDeleted,
                    checklist.card_id,
                    deleted_by,
                )
            },
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn find_by_card_with_items(
        pool: &SqlitePool,
        card_id: i64,
    ) -> Result<Vec<ChecklistWithItems>, sqlx::Error> {
        let checklists = sqlx::query_as::<_, Checklist>(&format!(
            r#"SELECT {CHECKLIST_COLUMNS} FROM checklists
               WHERE card_id = ? AND deleted_at IS NULL
               ORDER BY "index" ASC"#
        ))
        .bind(card_id)
        .fetch_all(pool)
        .await?;

        let items = sqlx::query_as::<_, ChecklistItem>(
            r#"SELECT i.id, i.public_id, i.title, i.completed, i."index", i.checklist_id,
                      i.created_at, i.updated_at
                 FROM checklist_items i
                 JOIN checklists cl ON cl.id = i.checklist_id
                WHERE cl.card_id = ? AND i.deleted_at IS NULL
                ORDER BY i."index" ASC"#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await?;

        let mut by_checklist: HashMap<i64, Vec<ChecklistItem>> = HashMap::new();
        for item in items {
            by_checklist.entry(item.checklist_id).or_default().push(item);
        }

        Ok(checklists
            .into_iter()
            .map(|checklist| ChecklistWithItems {
                items: by_checklist.remove(&checklist.id).unwrap_or_default(),
                checklist,
            })
            .collect())
    }
}

impl ChecklistItem {
    pub async fn create(
        pool: &SqlitePool,
        checklist: &ChecklistRef,
        title: &str,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = begin_write(pool).await?;
        let index = CHECKLIST_ITEMS.count(&mut tx, checklist.id).await?;

        let item = sqlx::query_as::<_, ChecklistItem>(&format!(
            r#"INSERT INTO checklist_items (public_id, title, "index", checklist_id, created_by)
               VALUES (?, ?, ?, ?, ?)
               RETURNING {ITEM_COLUMNS}"#
        ))
        .bind(utils::uid::generate_uid())
        .bind(title)
        .bind(index)
        .bind(checklist.id)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        CardActivity::create(
            &mut *tx,
            &NewCardActivity {
                to_title: Some(item.title.clone()),
                ..NewCardActivity::new(
                    CardActivityType::ChecklistItemAdded,
                    checklist.card_id,
                    created_by,
                )
            },
        )
        .await?;

        tx.commit().await?;
        Ok(item)
    }

    pub async fn find_ref_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<ChecklistItemRef>, sqlx::Error> {
        sqlx::query_as::<_, ChecklistItemRef>(
            r#"SELECT i.id, i.public_id, i.title, i.completed, i."index", i.checklist_id,
                      cl.card_id, c.public_id AS card_public_id, l.board_id, b.workspace_id
                 FROM checklist_items i
                 JOIN checklists cl ON cl.id = i.checklist_id
                 JOIN cards c ON c.id = cl.card_id
                 JOIN lists l ON l.id = c.list_id
                 JOIN boards b ON b.id = l.board_id
                WHERE i.public_id = ?
                  AND i.deleted_at IS NULL
                  AND cl.deleted_at IS NULL"#,
        )
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    /// Updates title and/or completion. A completion flip records
    /// `item.completed`/`item.uncompleted`; a title change records `item.updated`.
    pub async fn update(
        pool: &SqlitePool,
        item: &ChecklistItemRef,
        title: Option<&str>,
        completed: Option<bool>,
        updated_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let updated = sqlx::query_as::<_, ChecklistItem>(&format!(
            "UPDATE checklist_items
                SET title = COALESCE(?, title),
                    completed = COALESCE(?, completed),
                    updated_at = datetime('now', 'subsec')
              WHERE id = ? AND deleted_at IS NULL
              RETURNING {ITEM_COLUMNS}"
        ))
        .bind(title)
        .bind(completed)
        .bind(item.id)
        .fetch_one(&mut *tx)
        .await?;

        if completed.is_some() && updated.completed != item.completed {
            let activity_type = if updated.completed {
                CardActivityType::ChecklistItemCompleted
            } else {
                CardActivityType::ChecklistItemUncompleted
            };
            CardActivity::create(
                &mut *tx,
                &NewCardActivity {
                    to_title: Some(updated.title.clone()),
                    ..NewCardActivity::new(activity_type, item.card_id, updated_by)
                },
            )
            .await?;
        }

        if updated.title != item.title {
            CardActivity::create(
                &mut *tx,
                &NewCardActivity {
                    from_title: Some(item.title.clone()),
                    to_title: Some(updated.title.clone()),
                    ..NewCardActivity::new(
                        CardActivityType::ChecklistItemUpdated,
                        item.card_id,
                        updated_by,
                    )
                },
            )
            .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn archive(
        pool: &SqlitePool,
        item: &ChecklistItemRef,
        deleted_by: Uuid,
    ) -> Result<(), sqlx::Error> {
        let mut tx = begin_write(pool).await?;
        let at = CHECKLIST_ITEMS.position(&mut tx, item.id).await?;

        sqlx::query(
            "UPDATE checklist_items SET deleted_at = datetime('now', 'subsec'), deleted_by = ?
             WHERE id = ?",
        )
        .bind(deleted_by)
        .bind(item.id)
        .execute(&mut *tx)
        .await?;

        CHECKLIST_ITEMS.close_gap(&mut tx, at.parent_id, at.index).await?;

        CardActivity::create(
            &mut *tx,
            &NewCardActivity {
                from_title: Some(item.title.clone()),
                ..NewCardActivity::new(
                    CardActivityType::ChecklistItemDeleted,
                    item.card_id,
                    deleted_by,
                )
            },
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{board::Board, card::Card, list::List},
        test_utils::{create_test_pool, create_test_user, create_test_workspace},
    };

    async fn card_fixture(pool: &SqlitePool) -> (Uuid, Card) {
        let user = create_test_user(pool, "owner@example.com").await;
        let workspace = create_test_workspace(pool, &user, "acme").await;
        let board = Board::create_with_lists_and_labels(
            pool,
            workspace.id,
            "Board",
            "board",
            &["Todo".to_string()],
            &[],
            user.id,
        )
        .await
        .unwrap();
        let list = List::find_by_board(pool, board.id).await.unwrap().remove(0);
        let card = Card::create(pool, list.id, "card", "", Default::default(), &[], &[], user.id)
            .await
            .unwrap();
        (user.id, card)
    }

    async fn activity_kinds(pool: &SqlitePool, card_id: i64) -> Vec<CardActivityType> {
        CardActivity::find_by_card(pool, card_id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.activity_type)
            .collect()
    }

    #[tokio::test]
    async fn checklist_lifecycle_records_activities() {
        let (pool, _temp_dir) = create_test_pool().await;
        let (user_id, card) = card_fixture(&pool).await;

        let first = Checklist::create(&pool, card.id, "Launch", user_id).await.unwrap();
        let second = Checklist::create(&pool, card.id, "Followup", user_id).await.unwrap();
        assert_eq!((first.index, second.index), (0, 1));

        let first_ref = Checklist::find_ref_by_public_id(&pool, &first.public_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first_ref.card_public_id, card.public_id);

        let renamed = Checklist::rename(&pool, &first_ref, "Ship", user_id).await.unwrap();
        assert_eq!(renamed.name, "Ship");

        ChecklistItem::create(&pool, &first_ref, "write docs", user_id)
            .await
            .unwrap();
        Checklist::archive(&pool, &first_ref, user_id).await.unwrap();

        let remaining = Checklist::find_by_card_with_items(&pool, card.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].checklist.name, "Followup");
        assert_eq!(remaining[0].checklist.index, 0);

        let live_items: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM checklist_items WHERE checklist_id = ? AND deleted_at IS NULL",
        )
        .bind(first.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(live_items, 0);

        assert_eq!(
            activity_kinds(&pool, card.id).await,
            [
                CardActivityType::Created,
                CardActivityType::ChecklistAdded,
                CardActivityType::ChecklistAdded,
                CardActivityType::ChecklistRenamed,
                CardActivityType::ChecklistItemAdded,
                CardActivityType::ChecklistDeleted,
            ]
        );
    }

    #[tokio::test]
    async fn item_update_distinguishes_completion_and_title() {
        let (pool, _temp_dir) = create_test_pool().await;
        let (user_id, card) = card_fixture(&pool).await;
        let checklist = Checklist::create(&pool, card.id, "Launch", user_id).await.unwrap();
        let checklist = Checklist::find_ref_by_public_id(&pool, &checklist.public_id)
            .await
            .unwrap()
            .unwrap();
        let item = ChecklistItem::create(&pool, &checklist, "docs", user_id)
            .await
            .unwrap();
        assert!(!item.completed);

        let item_ref = ChecklistItem::find_ref_by_public_id(&pool, &item.public_id)
            .await
            .unwrap()
            .unwrap();
        let done = ChecklistItem::update(&pool, &item_ref, None, Some(true), user_id)
            .await
            .unwrap();
        assert!(done.completed);

        let item_ref = ChecklistItem::find_ref_by_public_id(&pool, &item.public_id)
            .await
            .unwrap()
            .unwrap();
        ChecklistItem::update(&pool, &item_ref, Some("write docs"), None, user_id)
            .await
            .unwrap();

        let kinds = activity_kinds(&pool, card.id).await;
        assert_eq!(
            &kinds[kinds.len() - 2..],
            [
                CardActivityType::ChecklistItemCompleted,
                CardActivityType::ChecklistItemUpdated,
            ]
        );

        let item_ref = ChecklistItem::find_ref_by_public_id(&pool, &item.public_id)
            .await
            .unwrap()
            .unwrap();
        ChecklistItem::archive(&pool, &item_ref, user_id).await.unwrap();
        assert!(ChecklistItem::find_ref_by_public_id(&pool, &item.public_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn stale_item_ref_archives_at_current_index() {
        let (pool, _temp_dir) = create_test_pool().await;
        let (user_id, card) = card_fixture(&pool).await;
        let checklist = Checklist::create(&pool, card.id, "Steps", user_id).await.unwrap();
        let checklist_ref = Checklist::find_ref_by_public_id(&pool, &checklist.public_id)
            .await
            .unwrap()
            .unwrap();

        let mut refs = Vec::new();
        for title in ["a", "b", "c"] {
            let item = ChecklistItem::create(&pool, &checklist_ref, title, user_id)
                .await
                .unwrap();
            refs.push(
                ChecklistItem::find_ref_by_public_id(&pool, &item.public_id)
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }

        // refs[1] still says index 1 after "a" goes away
        ChecklistItem::archive(&pool, &refs[0], user_id).await.unwrap();
        ChecklistItem::archive(&pool, &refs[1], user_id).await.unwrap();

        let lists = Checklist::find_by_card_with_items(&pool, card.id).await.unwrap();
        let items: Vec<_> = lists[0]
            .items
            .iter()
            .map(|i| (i.title.as_str(), i.index))
            .collect();
        assert_eq!(items, [("c", 0)]);
    }
}
