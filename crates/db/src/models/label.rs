use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Colours handed out to new board labels, in order.
pub const LABEL_COLOURS: &[&str] = &[
    "#0d9488", "#65a30d", "#0284c7", "#4f46e5", "#c026d3", "#e11d48", "#ea580c", "#ca8a04",
];

pub const DEFAULT_LABEL_COLOUR: &str = "#0d9488";

/// A board-scoped card label.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub colour_code: Option<String>,
    pub board_id: i64,
    pub created_at: DateTime<Utc>,
}

const LABEL_COLUMNS: &str = "id, public_id, name, colour_code, board_id, created_at";

pub fn colour_for_position(position: usize) -> &'static str {
    LABEL_COLOURS
        .get(position % LABEL_COLOURS.len())
        .copied()
        .unwrap_or(DEFAULT_LABEL_COLOUR)
}

impl Label {
    /// Creates one label per name, colours cycling through [`LABEL_COLOURS`].
    pub async fn bulk_create(
        conn: &mut SqliteConnection,
        board_id: i64,
        names: &[String],
        created_by: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut labels = Vec::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            let label = sqlx::query_as::<_, Label>(&format!(
                "INSERT INTO labels (public_id, name, colour_code, board_id, created_by)
                 VALUES (?, ?, ?, ?, ?)
                 RETURNING {LABEL_COLUMNS}"
            ))
            .bind(utils::uid::generate_uid())
            .bind(name)
            .bind(colour_for_position(position))
            .bind(board_id)
            .bind(created_by)
            .fetch_one(&mut *conn)
            .await?;
            labels.push(label);
        }
        Ok(labels)
    }

    pub async fn find_by_public_id(
        pool: &SqlitePool,
        public_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(&format!(
            "SELECT {LABEL_COLUMNS} FROM labels WHERE public_id = ? AND deleted_at IS NULL"
        ))
        .bind(public_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_board(pool: &SqlitePool, board_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(&format!(
            "SELECT {LABEL_COLUMNS} FROM labels
             WHERE board_id = ? AND deleted_at IS NULL
             ORDER BY id ASC"
        ))
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_card(pool: &SqlitePool, card_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            r#"SELECT l.id, l.public_id, l.name, l.colour_code, l.board_id, l.created_at
                 FROM labels l
                 JOIN card_labels cl ON cl.label_id = l.id
                WHERE cl.card_id = ? AND l.deleted_at IS NULL
                ORDER BY l.id ASC"#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }
}
