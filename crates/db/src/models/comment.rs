use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::card_activity::{CardActivity, CardActivityType, NewCardActivity};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub public_id: String,
    pub comment: String,
    pub card_id: i64,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CommentBody {
    pub comment: String,
}

const COMMENT_COLUMNS: &str = "id, public_id, comment, card_id, created_by, created_at, updated_at";

impl Comment {
    pub async fn create(
        pool: &SqlitePool,
        card_id: i64,
        comment: &str,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let created = sqlx::query_as::<_, Comment>(&format!(
            "INSERT INTO card_comments (public_id, comment, card_id, created_by)
             VALUES (?, ?, ?, ?)
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(utils::uid::generate_uid())
        .bind(comment)
        .bind(card_id)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        CardActivity::create(
            &mut *tx,
            &NewCardActivity {
                comment_id: Some(created.id),
                to_comment: Some(created.comment.clone()),
                ..NewCardActivity::new(CardActivityType::CommentAdded, card_id, created_by)
            },
        )
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM card_comments WHERE public_id = ? AND deleted_at IS NULL"
        ))
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_card(pool: &SqlitePool, card_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM card_comments
             WHERE card_id = ? AND deleted_at IS NULL
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        existing: &Comment,
        comment: &str,
        updated_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let updated = sqlx::query_as::<_, Comment>(&format!(
            "UPDATE card_comments SET comment = ?, updated_at = datetime('now', 'subsec')
             WHERE id = ? AND deleted_at IS NULL
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment)
        .bind(existing.id)
        .fetch_one(&mut *tx)
        .await?;

        CardActivity::create(
            &mut *tx,
            &NewCardActivity {
                comment_id: Some(existing.id),
                from_comment: Some(existing.comment.clone()),
                to_comment: Some(updated.comment.clone()),
                ..NewCardActivity::new(
                    CardActivityType::CommentUpdated,
                    existing.card_id,
                    updated_by,
                )
            },
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn soft_delete(
        pool: &SqlitePool,
        existing: &Comment,
        deleted_by: Uuid,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        let affected = sqlx::query(
            "UPDATE card_comments SET deleted_at = datetime('now', 'subsec'), deleted_by = ?
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(deleted_by)
        .bind(existing.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        CardActivity::create(
            &mut *tx,
            &NewCardActivity {
                comment_id: Some(existing.id),
                from_comment: Some(existing.comment.clone()),
                ..NewCardActivity::new(
                    CardActivityType::CommentDeleted,
                    existing.card_id,
                    deleted_by,
                )
            },
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
