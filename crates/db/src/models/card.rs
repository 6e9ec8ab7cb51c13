use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    card_activity::{CardActivity, CardActivityType, NewCardActivity},
    checklist::{Checklist, ChecklistWithItems},
    comment::Comment,
    label::Label,
    ordering::{CARDS, begin_write},
    workspace::WorkspaceMember,
};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    pub description: String,
    pub index: i64,
    pub list_id: i64,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A card with the ancestry needed for access checks and event routing.
#[derive(Debug, Clone, FromRow)]
pub struct CardRef {
    pub id: i64,
    pub public_id: String,
    pub list_id: i64,
    pub list_public_id: String,
    pub board_id: i64,
    pub workspace_id: i64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
pub enum CardPosition {
    Start,
    #[default]
    End,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateCard {
    pub list_public_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub position: CardPosition,
    #[serde(default)]
    pub label_public_ids: Vec<String>,
    #[serde(default)]
    pub member_public_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCard {
    pub title: Option<String>,
    pub description: Option<String>,
    pub list_public_id: Option<String>,
    pub index: Option<i64>,
}

/// Everything a card view needs in one payload.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CardDetail {
    #[serde(flatten)]
    pub card: Card,
    pub list_public_id: String,
    pub labels: Vec<Label>,
    pub members: Vec<WorkspaceMember>,
    pub checklists: Vec<ChecklistWithItems>,
    pub comments: Vec<Comment>,
    pub activities: Vec<CardActivity>,
}

const CARD_COLUMNS: &str =
    r#"id, public_id, title, description, "index", list_id, created_by, created_at, updated_at"#;

impl Card {
    /// Inserts a card at the start or end of `list_id` and attaches the given
    /// labels and members.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        pool: &SqlitePool,
        list_id: i64,
        title: &str,
        description: &str,
        position: CardPosition,
        label_ids: &[i64],
        member_ids: &[i64],
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = begin_write(pool).await?;

        let index = match position {
            CardPosition::Start => {
                CARDS.open_gap(&mut tx, list_id, 0).await?;
                0
            }
            CardPosition::End => CARDS.count(&mut tx, list_id).await?,
        };

        let card = sqlx::query_as::<_, Card>(&format!(
            r#"INSERT INTO cards (public_id, title, description, "index", list_id, created_by)
               VALUES (?, ?, ?, ?, ?, ?)
               RETURNING {CARD_COLUMNS}"#
        ))
        .bind(utils::uid::generate_uid())
        .bind(title)
        .bind(description)
        .bind(index)
        .bind(list_id)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        for &label_id in label_ids {
            sqlx::query("INSERT OR IGNORE INTO card_labels (card_id, label_id) VALUES (?, ?)")
                .bind(card.id)
                .bind(label_id)
                .execute(&mut *tx)
                .await?;
        }
        for &member_id in member_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO card_members (card_id, workspace_member_id) VALUES (?, ?)",
            )
            .bind(card.id)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;
        }

        CardActivity::create(
            &mut *tx,
            &NewCardActivity {
                to_list_id: Some(list_id),
                to_title: Some(card.title.clone()),
                ..NewCardActivity::new(CardActivityType::Created, card.id, created_by)
            },
        )
        .await?;

        tx.commit().await?;
        Ok(card)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Card>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Card>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE public_id = ? AND deleted_at IS NULL"
        ))
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_ref_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<CardRef>, sqlx::Error> {
        sqlx::query_as::<_, CardRef>(
            r#"SELECT c.id, c.public_id, c.list_id, l.public_id AS list_public_id,
                      l.board_id, b.workspace_id
                 FROM cards c
                 JOIN lists l ON l.id = c.list_id
                 JOIN boards b ON b.id = l.board_id
                WHERE c.public_id = ?
                  AND c.deleted_at IS NULL
                  AND l.deleted_at IS NULL
                  AND b.deleted_at IS NULL"#,
        )
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_ref_by_id(pool: &SqlitePool, id: i64) -> Result<Option<CardRef>, sqlx::Error> {
        sqlx::query_as::<_, CardRef>(
            r#"SELECT c.id, c.public_id, c.list_id, l.public_id AS list_public_id,
                      l.board_id, b.workspace_id
                 FROM cards c
                 JOIN lists l ON l.id = c.list_id
                 JOIN boards b ON b.id = l.board_id
                WHERE c.id = ? AND c.deleted_at IS NULL"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Live cards of every live list on the board, ordered by list then card index.
    pub async fn find_by_board(pool: &SqlitePool, board_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Card>(
            r#"SELECT c.id, c.public_id, c.title, c.description, c."index", c.list_id,
                      c.created_by, c.created_at, c.updated_at
                 FROM cards c
                 JOIN lists l ON l.id = c.list_id
                WHERE l.board_id = ? AND l.deleted_at IS NULL AND c.deleted_at IS NULL
                ORDER BY l."index" ASC, c."index" ASC"#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_list(pool: &SqlitePool, list_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Card>(&format!(
            r#"SELECT {CARD_COLUMNS} FROM cards
               WHERE list_id = ? AND deleted_at IS NULL
               ORDER BY "index" ASC"#
        ))
        .bind(list_id)
        .fetch_all(pool)
        .await
    }

    /// Updates title and/or description, recording an activity for each
    /// field that actually changed.
    pub async fn update_details(
        pool: &SqlitePool,
        card: &Card,
        title: Option<&str>,
        description: Option<&str>,
        updated_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query_as::<_, Card>(&format!(
            "UPDATE cards
                SET title = COALESCE(?, title),
                    description = COALESCE(?, description),
                    updated_at = datetime('now', 'subsec')
              WHERE id = ? AND deleted_at IS NULL
              RETURNING {CARD_COLUMNS}"
        ))
        .bind(title)
        .bind(description)
        .bind(card.id)
        .fetch_one(&mut *tx)
        .await?;

        if updated.title != card.title {
            CardActivity::create(
                &mut *tx,
                &NewCardActivity {
                    from_title: Some(card.title.clone()),
                    to_title: Some(updated.title.clone()),
                    ..NewCardActivity::new(CardActivityType::TitleUpdated, card.id, updated_by)
                },
            )
            .await?;
        }
        if updated.description != card.description {
            CardActivity::create(
                &mut *tx,
                &NewCardActivity {
                    from_description: Some(card.description.clone()),
                    to_description: Some(updated.description.clone()),
                    ..NewCardActivity::new(
                        CardActivityType::DescriptionUpdated,
                        card.id,
                        updated_by,
                    )
                },
            )
            .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Moves the card to `target_list_id` at `new_index` (clamped; `None`
    /// appends when changing list and keeps the position otherwise).
    ///
    /// The source list and index are read inside the transaction, so `card`
    /// only identifies the row.
    pub async fn move_to(
        pool: &SqlitePool,
        card: &Card,
        target_list_id: i64,
        new_index: Option<i64>,
        moved_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = begin_write(pool).await?;
        let from = CARDS.position(&mut tx, card.id).await?;

        if target_list_id == from.parent_id {
            if let Some(new_index) = new_index {
                let to = CARDS
                    .move_within(&mut tx, from.parent_id, card.id, from.index, new_index)
                    .await?;
                if to != from.index {
                    CardActivity::create(
                        &mut *tx,
                        &NewCardActivity {
                            from_index: Some(from.index),
                            to_index: Some(to),
                            ..NewCardActivity::new(CardActivityType::IndexUpdated, card.id, moved_by)
                        },
                    )
                    .await?;
                }
            }
        } else {
            CARDS.close_gap(&mut tx, from.parent_id, from.index).await?;
            let count = CARDS.count(&mut tx, target_list_id).await?;
            let to = new_index.unwrap_or(count).clamp(0, count);
            CARDS.open_gap(&mut tx, target_list_id, to).await?;

            sqlx::query(
                r#"UPDATE cards SET list_id = ?, "index" = ?, updated_at = datetime('now', 'subsec')
                   WHERE id = ?"#,
            )
            .bind(target_list_id)
            .bind(to)
            .bind(card.id)
            .execute(&mut *tx)
            .await?;

            CardActivity::create(
                &mut *tx,
                &NewCardActivity {
                    from_list_id: Some(from.parent_id),
                    to_list_id: Some(target_list_id),
                    from_index: Some(from.index),
                    to_index: Some(to),
                    ..NewCardActivity::new(CardActivityType::ListUpdated, card.id, moved_by)
                },
            )
            .await?;
        }

        let moved = sqlx::query_as::<_, Card>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE id = ?"
        ))
        .bind(card.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(moved)
    }

    /// Soft-deletes one card and closes the gap in its list.
    pub async fn archive(pool: &SqlitePool, card: &Card, deleted_by: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = begin_write(pool).await?;
        let at = CARDS.position(&mut tx, card.id).await?;

        sqlx::query(
            "UPDATE cards SET deleted_at = datetime('now', 'subsec'), deleted_by = ?
             WHERE id = ?",
        )
        .bind(deleted_by)
        .bind(card.id)
        .execute(&mut *tx)
        .await?;

        CARDS.close_gap(&mut tx, at.parent_id, at.index).await?;
        CardActivity::create_archived(&mut tx, &[card.id], deleted_by).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Soft-deletes the live cards of the given lists. Returns their ids.
    pub async fn soft_delete_by_list_ids(
        conn: &mut SqliteConnection,
        list_ids: &[i64],
        deleted_by: Uuid,
    ) -> Result<Vec<i64>, sqlx::Error> {
        let mut card_ids = Vec::new();
        for &list_id in list_ids {
            let ids: Vec<i64> = sqlx::query_scalar(
                "UPDATE cards SET deleted_at = datetime('now', 'subsec'), deleted_by = ?
                 WHERE list_id = ? AND deleted_at IS NULL
                 RETURNING id",
            )
            .bind(deleted_by)
            .bind(list_id)
            .fetch_all(&mut *conn)
            .await?;
            card_ids.extend(ids);
        }
        Ok(card_ids)
    }

    /// Adds the label if absent, removes it otherwise. Returns `true` when added.
    pub async fn toggle_label(
        pool: &SqlitePool,
        card_id: i64,
        label_id: i64,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let removed = sqlx::query("DELETE FROM card_labels WHERE card_id = ? AND label_id = ?")
            .bind(card_id)
            .bind(label_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if !removed {
            sqlx::query("INSERT INTO card_labels (card_id, label_id) VALUES (?, ?)")
                .bind(card_id)
                .bind(label_id)
                .execute(&mut *tx)
                .await?;
        }

        let activity_type = if removed {
            CardActivityType::LabelRemoved
        } else {
            CardActivityType::LabelAdded
        };
        CardActivity::create(
            &mut *tx,
            &NewCardActivity {
                label_id: Some(label_id),
                ..NewCardActivity::new(activity_type, card_id, user_id)
            },
        )
        .await?;

        tx.commit().await?;
        Ok(!removed)
    }

    /// Adds the member if absent, removes it otherwise. Returns `true` when added.
    pub async fn toggle_member(
        pool: &SqlitePool,
        card_id: i64,
        workspace_member_id: i64,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let removed = sqlx::query(
            "DELETE FROM card_members WHERE card_id = ? AND workspace_member_id = ?",
        )
        .bind(card_id)
        .bind(workspace_member_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if !removed {
            sqlx::query("INSERT INTO card_members (card_id, workspace_member_id) VALUES (?, ?)")
                .bind(card_id)
                .bind(workspace_member_id)
                .execute(&mut *tx)
                .await?;
        }

        let activity_type = if removed {
            CardActivityType::MemberRemoved
        } else {
            CardActivityType::MemberAdded
        };
        CardActivity::create(
            &mut *tx,
            &NewCardActivity {
                workspace_member_id: Some(workspace_member_id),
                ..NewCardActivity::new(activity_type, card_id, user_id)
            },
        )
        .await?;

        tx.commit().await?;
        Ok(!removed)
    }

    /// `(card_id, label_public_id)` pairs for every live card on the board.
    pub async fn label_links_for_board(
        pool: &SqlitePool,
        board_id: i64,
    ) -> Result<Vec<(i64, String)>, sqlx::Error> {
        sqlx::query_as::<_, (i64, String)>(
            r#"SELECT cl.card_id, lb.public_id
                 FROM card_labels cl
                 JOIN labels lb ON lb.id = cl.label_id
                WHERE lb.board_id = ? AND lb.deleted_at IS NULL"#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    /// `(card_id, workspace_member_public_id)` pairs for every live card on the board.
    pub async fn member_links_for_board(
        pool: &SqlitePool,
        board_id: i64,
    ) -> Result<Vec<(i64, String)>, sqlx::Error> {
        sqlx::query_as::<_, (i64, String)>(
            r#"SELECT cm.card_id, m.public_id
                 FROM card_members cm
                 JOIN cards c ON c.id = cm.card_id
                 JOIN lists l ON l.id = c.list_id
                 JOIN workspace_members m ON m.id = cm.workspace_member_id
                WHERE l.board_id = ? AND m.deleted_at IS NULL"#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    pub async fn detail(pool: &SqlitePool, card: Card) -> Result<CardDetail, sqlx::Error> {
        let list_public_id: String = sqlx::query_scalar("SELECT public_id FROM lists WHERE id = ?")
            .bind(card.list_id)
            .fetch_one(pool)
            .await?;

        let labels = Label::find_by_card(pool, card.id).await?;
        let members = WorkspaceMember::find_by_card(pool, card.id).await?;
        let checklists = Checklist::find_by_card_with_items(pool, card.id).await?;
        let comments = Comment::find_by_card(pool, card.id).await?;
        let activities = CardActivity::find_by_card(pool, card.id).await?;

        Ok(CardDetail {
            card,
            list_public_id,
            labels,
            members,
            checklists,
            comments,
            activities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{board::Board, list::List},
        test_utils::{create_test_pool, create_test_user, create_test_workspace},
    };

    struct Fixture {
        user_id: Uuid,
        board_id: i64,
        lists: Vec<List>,
    }

    async fn fixture(pool: &SqlitePool) -> Fixture {
        let user = create_test_user(pool, "owner@example.com").await;
        let workspace = create_test_workspace(pool, &user, "acme").await;
        let board = Board::create_with_lists_and_labels(
            pool,
            workspace.id,
            "Board",
            "board",
            &["Todo".to_string(), "Done".to_string()],
            &["bug".to_string()],
            user.id,
        )
        .await
        .unwrap();
        let lists = List::find_by_board(pool, board.id).await.unwrap();
        Fixture {
            user_id: user.id,
            board_id: board.id,
            lists,
        }
    }

    async fn add(pool: &SqlitePool, f: &Fixture, list: usize, title: &str) -> Card {
        Card::create(
            pool,
            f.lists[list].id,
            title,
            "",
            CardPosition::End,
            &[],
            &[],
            f.user_id,
        )
        .await
        .unwrap()
    }

    fn titles(cards: &[Card]) -> Vec<&str> {
        cards.iter().map(|c| c.title.as_str()).collect()
    }

    fn indices(cards: &[Card]) -> Vec<i64> {
        cards.iter().map(|c| c.index).collect()
    }

    #[tokio::test]
    async fn create_at_start_shifts_existing_cards() {
        let (pool, _temp_dir) = create_test_pool().await;
        let f = fixture(&pool).await;
        add(&pool, &f, 0, "one").await;
        add(&pool, &f, 0, "two").await;

        let first = Card::create(
            &pool,
            f.lists[0].id,
            "zero",
            "",
            CardPosition::Start,
            &[],
            &[],
            f.user_id,
        )
        .await
        .unwrap();
        assert_eq!(first.index, 0);

        let cards = Card::find_by_list(&pool, f.lists[0].id).await.unwrap();
        assert_eq!(titles(&cards), ["zero", "one", "two"]);
        assert_eq!(indices(&cards), [0, 1, 2]);

        let activities = CardActivity::find_by_card(&pool, first.id).await.unwrap();
        assert_eq!(activities[0].activity_type, CardActivityType::Created);
    }

    #[tokio::test]
    async fn move_across_lists_keeps_both_dense() {
        let (pool, _temp_dir) = create_test_pool().await;
        let f = fixture(&pool).await;
        let a = add(&pool, &f, 0, "a").await;
        add(&pool, &f, 0, "b").await;
        add(&pool, &f, 1, "c").await;

        let moved = Card::move_to(&pool, &a, f.lists[1].id, Some(0), f.user_id)
            .await
            .unwrap();
        assert_eq!(moved.list_id, f.lists[1].id);
        assert_eq!(moved.index, 0);

        let source = Card::find_by_list(&pool, f.lists[0].id).await.unwrap();
        assert_eq!(titles(&source), ["b"]);
        assert_eq!(indices(&source), [0]);
        let target = Card::find_by_list(&pool, f.lists[1].id).await.unwrap();
        assert_eq!(titles(&target), ["a", "c"]);
        assert_eq!(indices(&target), [0, 1]);

        let activities = CardActivity::find_by_card(&pool, a.id).await.unwrap();
        let last = activities.last().unwrap();
        assert_eq!(last.activity_type, CardActivityType::ListUpdated);
        assert_eq!(last.from_list_id, Some(f.lists[0].id));
        assert_eq!(last.to_list_id, Some(f.lists[1].id));
    }

    #[tokio::test]
    async fn move_within_list_records_index_change() {
        let (pool, _temp_dir) = create_test_pool().await;
        let f = fixture(&pool).await;
        let a = add(&pool, &f, 0, "a").await;
        add(&pool, &f, 0, "b").await;
        add(&pool, &f, 0, "c").await;

        Card::move_to(&pool, &a, f.lists[0].id, Some(2), f.user_id)
            .await
            .unwrap();
        let cards = Card::find_by_list(&pool, f.lists[0].id).await.unwrap();
        assert_eq!(titles(&cards), ["b", "c", "a"]);
        assert_eq!(indices(&cards), [0, 1, 2]);

        let activities = CardActivity::find_by_card(&pool, a.id).await.unwrap();
        let last = activities.last().unwrap();
        assert_eq!(last.activity_type, CardActivityType::IndexUpdated);
        assert_eq!((last.from_index, last.to_index), (Some(0), Some(2)));
    }

    #[tokio::test]
    async fn archive_closes_gap() {
        let (pool, _temp_dir) = create_test_pool().await;
        let f = fixture(&pool).await;
        add(&pool, &f, 0, "a").await;
        let b = add(&pool, &f, 0, "b").await;
        add(&pool, &f, 0, "c").await;

        Card::archive(&pool, &b, f.user_id).await.unwrap();
        assert!(Card::find_by_public_id(&pool, &b.public_id).await.unwrap().is_none());

        let cards = Card::find_by_list(&pool, f.lists[0].id).await.unwrap();
        assert_eq!(titles(&cards), ["a", "c"]);
        assert_eq!(indices(&cards), [0, 1]);
    }

    #[tokio::test]
    async fn stale_card_copy_still_moves_from_current_position() {
        let (pool, _temp_dir) = create_test_pool().await;
        let f = fixture(&pool).await;
        add(&pool, &f, 0, "a").await;
        add(&pool, &f, 0, "b").await;
        let c = add(&pool, &f, 0, "c").await;
        let stale = c.clone();

        Card::move_to(&pool, &c, f.lists[0].id, Some(0), f.user_id)
            .await
            .unwrap();
        let moved = Card::move_to(&pool, &stale, f.lists[0].id, Some(1), f.user_id)
            .await
            .unwrap();
        assert_eq!(moved.index, 1);

        let cards = Card::find_by_list(&pool, f.lists[0].id).await.unwrap();
        assert_eq!(titles(&cards), ["a", "c", "b"]);
        assert_eq!(indices(&cards), [0, 1, 2]);

        let activities = CardActivity::find_by_card(&pool, c.id).await.unwrap();
        let last = activities.last().unwrap();
        assert_eq!((last.from_index, last.to_index), (Some(0), Some(1)));
    }

    #[tokio::test]
    async fn stale_card_copy_archives_and_keeps_list_dense() {
        let (pool, _temp_dir) = create_test_pool().await;
        let f = fixture(&pool).await;
        add(&pool, &f, 0, "a").await;
        add(&pool, &f, 0, "b").await;
        let c = add(&pool, &f, 0, "c").await;
        let stale = c.clone();

        Card::move_to(&pool, &c, f.lists[0].id, Some(0), f.user_id)
            .await
            .unwrap();
        Card::archive(&pool, &stale, f.user_id).await.unwrap();

        let cards = Card::find_by_list(&pool, f.lists[0].id).await.unwrap();
        assert_eq!(titles(&cards), ["a", "b"]);
        assert_eq!(indices(&cards), [0, 1]);
    }

    #[tokio::test]
    async fn stale_copy_moved_to_other_list_closes_real_gap() {
        let (pool, _temp_dir) = create_test_pool().await;
        let f = fixture(&pool).await;
        let a = add(&pool, &f, 0, "a").await;
        let b = add(&pool, &f, 0, "b").await;
        add(&pool, &f, 0, "c").await;
        let stale = b.clone();

        Card::archive(&pool, &a, f.user_id).await.unwrap();
        Card::move_to(&pool, &stale, f.lists[1].id, None, f.user_id)
            .await
            .unwrap();

        let source = Card::find_by_list(&pool, f.lists[0].id).await.unwrap();
        assert_eq!(titles(&source), ["c"]);
        assert_eq!(indices(&source), [0]);
        let target = Card::find_by_list(&pool, f.lists[1].id).await.unwrap();
        assert_eq!(titles(&target), ["b"]);
        assert_eq!(indices(&target), [0]);
    }

    #[tokio::test]
    async fn archiving_twice_reports_missing_row() {
        let (pool, _temp_dir) = create_test_pool().await;
        let f = fixture(&pool).await;
        let a = add(&pool, &f, 0, "a").await;

        Card::archive(&pool, &a, f.user_id).await.unwrap();
        let err = Card::archive(&pool, &a, f.user_id).await.unwrap_err();
        assert!(matches!(err, sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn update_details_only_logs_real_changes() {
        let (pool, _temp_dir) = create_test_pool().await;
        let f = fixture(&pool).await;
        let card = add(&pool, &f, 0, "a").await;

        let updated = Card::update_details(&pool, &card, Some("a"), Some("notes"), f.user_id)
            .await
            .unwrap();
        assert_eq!(updated.description, "notes");

        let kinds: Vec<_> = CardActivity::find_by_card(&pool, card.id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.activity_type)
            .collect();
        assert_eq!(
            kinds,
            [CardActivityType::Created, CardActivityType::DescriptionUpdated]
        );
    }

    #[tokio::test]
    async fn toggle_label_adds_then_removes() {
        let (pool, _temp_dir) = create_test_pool().await;
        let f = fixture(&pool).await;
        let card = add(&pool, &f, 0, "a").await;
        let label = Label::find_by_board(&pool, f.board_id).await.unwrap().remove(0);

        assert!(Card::toggle_label(&pool, card.id, label.id, f.user_id).await.unwrap());
        assert_eq!(Label::find_by_card(&pool, card.id).await.unwrap().len(), 1);

        assert!(!Card::toggle_label(&pool, card.id, label.id, f.user_id).await.unwrap());
        assert!(Label::find_by_card(&pool, card.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_member_and_detail() {
        let (pool, _temp_dir) = create_test_pool().await;
        let f = fixture(&pool).await;
        let card = add(&pool, &f, 0, "a").await;
        let workspace_id: i64 = sqlx::query_scalar("SELECT workspace_id FROM boards WHERE id = ?")
            .bind(f.board_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        let member = WorkspaceMember::find_all(&pool, workspace_id)
            .await
            .unwrap()
            .remove(0);

        assert!(Card::toggle_member(&pool, card.id, member.id, f.user_id).await.unwrap());

        let detail = Card::detail(&pool, card).await.unwrap();
        assert_eq!(detail.list_public_id, f.lists[0].public_id);
        assert_eq!(detail.members.len(), 1);
        assert_eq!(detail.members[0].public_id, member.public_id);
        assert_eq!(
            detail.activities.last().map(|a| a.activity_type),
            Some(CardActivityType::MemberAdded)
        );
    }
}
