//! Dense `"index"` maintenance for ordered children (lists in a board, cards in
//! a list, checklists in a card, items in a checklist).
//!
//! Sibling indices among non-deleted rows always stay `0..n`. Every shift
//! reads the row's current position inside the same write transaction, never
//! from a copy loaded earlier by the caller.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

/// Opens a transaction that takes the write lock immediately, so a position
/// read and the shift that follows cannot interleave with another writer.
pub(crate) async fn begin_write(
    pool: &SqlitePool,
) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// Parent id and index of a live row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub(crate) struct Position {
    pub parent_id: i64,
    pub index: i64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Siblings {
    pub table: &'static str,
    pub parent_column: &'static str,
}

pub(crate) const LISTS: Siblings = Siblings {
    table: "lists",
    parent_column: "board_id",
};

pub(crate) const CARDS: Siblings = Siblings {
    table: "cards",
    parent_column: "list_id",
};

pub(crate) const CHECKLISTS: Siblings = Siblings {
    table: "checklists",
    parent_column: "card_id",
};

pub(crate) const CHECKLIST_ITEMS: Siblings = Siblings {
    table: "checklist_items",
    parent_column: "checklist_id",
};

impl Siblings {
    /// Current position of row `id`; `RowNotFound` once it is deleted.
    pub async fn position(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<Position, sqlx::Error> {
        sqlx::query_as::<_, Position>(&format!(
            r#"SELECT {} AS parent_id, "index" FROM {} WHERE id = ? AND deleted_at IS NULL"#,
            self.parent_column, self.table
        ))
        .bind(id)
        .fetch_one(conn)
        .await
    }

    pub async fn count(
        &self,
        conn: &mut SqliteConnection,
        parent_id: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ? AND deleted_at IS NULL",
            self.table, self.parent_column
        ))
        .bind(parent_id)
        .fetch_one(conn)
        .await
    }

    /// Opens a slot at `at` by shifting every sibling at or after it up one.
    pub async fn open_gap(
        &self,
        conn: &mut SqliteConnection,
        parent_id: i64,
        at: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            r#"UPDATE {} SET "index" = "index" + 1
                WHERE {} = ? AND deleted_at IS NULL AND "index" >= ?"#,
            self.table, self.parent_column
        ))
        .bind(parent_id)
        .bind(at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Closes the slot left at `at` by a removed row.
    pub async fn close_gap(
        &self,
        conn: &mut SqliteConnection,
        parent_id: i64,
        at: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            r#"UPDATE {} SET "index" = "index" - 1
                WHERE {} = ? AND deleted_at IS NULL AND "index" > ?"#,
            self.table, self.parent_column
        ))
        .bind(parent_id)
        .bind(at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Moves row `id` from `from` to `to` within the same parent. `to` is
    /// clamped to the last position. Returns the final index.
    pub async fn move_within(
        &self,
        conn: &mut SqliteConnection,
        parent_id: i64,
        id: i64,
        from: i64,
        to: i64,
    ) -> Result<i64, sqlx::Error> {
        let last = (self.count(&mut *conn, parent_id).await? - 1).max(0);
        let to = to.clamp(0, last);

        if to > from {
            sqlx::query(&format!(
                r#"UPDATE {} SET "index" = "index" - 1
                    WHERE {} = ? AND deleted_at IS NULL AND id != ?
                      AND "index" > ? AND "index" <= ?"#,
                self.table, self.parent_column
            ))
            .bind(parent_id)
            .bind(id)
            .bind(from)
            .bind(to)
            .execute(&mut *conn)
            .await?;
        } else if to < from {
            sqlx::query(&format!(
                r#"UPDATE {} SET "index" = "index" + 1
                    WHERE {} = ? AND deleted_at IS NULL AND id != ?
                      AND "index" >= ? AND "index" < ?"#,
                self.table, self.parent_column
            ))
            .bind(parent_id)
            .bind(id)
            .bind(to)
            .bind(from)
            .execute(&mut *conn)
            .await?;
        }

        sqlx::query(&format!(
            r#"UPDATE {} SET "index" = ?, updated_at = datetime('now', 'subsec') WHERE id = ?"#,
            self.table
        ))
        .bind(to)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(to)
    }
}
