use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Audit trail entry kinds recorded against a card.
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "TEXT")]
pub enum CardActivityType {
    #[sqlx(rename = "card.created")]
    #[serde(rename = "card.created")]
    #[strum(serialize = "card.created")]
    Created,
    #[sqlx(rename = "card.updated.title")]
    #[serde(rename = "card.updated.title")]
    #[strum(serialize = "card.updated.title")]
    TitleUpdated,
    #[sqlx(rename = "card.updated.description")]
    #[serde(rename = "card.updated.description")]
    #[strum(serialize = "card.updated.description")]
    DescriptionUpdated,
    #[sqlx(rename = "card.updated.list")]
    #[serde(rename = "card.updated.list")]
    #[strum(serialize = "card.updated.list")]
    ListUpdated,
    #[sqlx(rename = "card.updated.index")]
    #[serde(rename = "card.updated.index")]
    #[strum(serialize = "card.updated.index")]
    IndexUpdated,
    #[sqlx(rename = "card.archived")]
    #[serde(rename = "card.archived")]
    #[strum(serialize = "card.archived")]
    Archived,
    #[sqlx(rename = "card.updated.label.added")]
    #[serde(rename = "card.updated.label.added")]
    #[strum(serialize = "card.updated.label.added")]
    LabelAdded,
    #[sqlx(rename = "card.updated.label.removed")]
    #[serde(rename = "card.updated.label.removed")]
    #[strum(serialize = "card.updated.label.removed")]
    LabelRemoved,
    #[sqlx(rename = "card.updated.member.added")]
    #[serde(rename = "card.updated.member.added")]
    #[strum(serialize = "card.updated.member.added")]
    MemberAdded,
    #[sqlx(rename = "card.updated.member.removed")]
    #[serde(rename = "card.updated.member.removed")]
    #[strum(serialize = "card.updated.member.removed")]
    MemberRemoved,
    #[sqlx(rename = "card.updated.comment.added")]
    #[serde(rename = "card.updated.comment.added")]
    #[strum(serialize = "card.updated.comment.added")]
    CommentAdded,
    #[sqlx(rename = "card.updated.comment.updated")]
    #[serde(rename = "card.updated.comment.updated")]
    #[strum(serialize = "card.updated.comment.updated")]
    CommentUpdated,
    #[sqlx(rename = "card.updated.comment.deleted")]
    #[serde(rename = "card.updated.comment.deleted")]
    #[strum(serialize = "card.updated.comment.deleted")]
    CommentDeleted,
    #[sqlx(rename = "card.updated.checklist.added")]
    #[serde(rename = "card.updated.checklist.added")]
    #[strum(serialize = "card.updated.checklist.added")]
    ChecklistAdded,
    #[sqlx(rename = "card.updated.checklist.renamed")]
    #[serde(rename = "card.updated.checklist.renamed")]
    #[strum(serialize = "card.updated.checklist.renamed")]
    ChecklistRenamed,
    #[sqlx(rename = "card.updated.checklist.deleted")]
    #[serde(rename = "card.updated.checklist.deleted")]
    #[strum(serialize = "card.updated.checklist.deleted")]
    ChecklistDeleted,
    #[sqlx(rename = "card.updated.checklist.item.added")]
    #[serde(rename = "card.updated.checklist.item.added")]
    #[strum(serialize = "card.updated.checklist.item.added")]
    ChecklistItemAdded,
    #[sqlx(rename = "card.updated.checklist.item.updated")]
    #[serde(rename = "card.updated.checklist.item.updated")]
    #[strum(serialize = "card.updated.checklist.item.updated")]
    ChecklistItemUpdated,
    #[sqlx(rename = "card.updated.checklist.item.completed")]
    #[serde(rename = "card.updated.checklist.item.completed")]
    #[strum(serialize = "card.updated.checklist.item.completed")]
    ChecklistItemCompleted,
    #[sqlx(rename = "card.updated.checklist.item.uncompleted")]
    #[serde(rename = "card.updated.checklist.item.uncompleted")]
    #[strum(serialize = "card.updated.checklist.item.uncompleted")]
    ChecklistItemUncompleted,
    #[sqlx(rename = "card.updated.checklist.item.deleted")]
    #[serde(rename = "card.updated.checklist.item.deleted")]
    #[strum(serialize = "card.updated.checklist.item.deleted")]
    ChecklistItemDeleted,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CardActivity {
    pub id: i64,
    pub public_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub activity_type: CardActivityType,
    pub card_id: i64,
    pub from_index: Option<i64>,
    pub to_index: Option<i64>,
    pub from_list_id: Option<i64>,
    pub to_list_id: Option<i64>,
    pub label_id: Option<i64>,
    pub workspace_member_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub from_title: Option<String>,
    pub to_title: Option<String>,
    pub from_description: Option<String>,
    pub to_description: Option<String>,
    pub from_comment: Option<String>,
    pub to_comment: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload; build with [`NewCardActivity::new`] and struct update syntax.
#[derive(Debug, Clone)]
pub struct NewCardActivity {
    pub activity_type: CardActivityType,
    pub card_id: i64,
    pub created_by: Uuid,
    pub from_index: Option<i64>,
    pub to_index: Option<i64>,
    pub from_list_id: Option<i64>,
    pub to_list_id: Option<i64>,
    pub label_id: Option<i64>,
    pub workspace_member_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub from_title: Option<String>,
    pub to_title: Option<String>,
    pub from_description: Option<String>,
    pub to_description: Option<String>,
    pub from_comment: Option<String>,
    pub to_comment: Option<String>,
}

impl NewCardActivity {
    pub fn new(activity_type: CardActivityType, card_id: i64, created_by: Uuid) -> Self {
        Self {
            activity_type,
            card_id,
            created_by,
            from_index: None,
            to_index: None,
            from_list_id: None,
            to_list_id: None,
            label_id: None,
            workspace_member_id: None,
            comment_id: None,
            from_title: None,
            to_title: None,
            from_description: None,
            to_description: None,
            from_comment: None,
            to_comment: None,
        }
    }
}

impl CardActivity {
    pub async fn create<'e, E>(executor: E, data: &NewCardActivity) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"INSERT INTO card_activities (
                   public_id, type, card_id, from_index, to_index, from_list_id, to_list_id,
                   label_id, workspace_member_id, comment_id, from_title, to_title,
                   from_description, to_description, from_comment, to_comment, created_by)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(utils::uid::generate_uid())
        .bind(data.activity_type)
        .bind(data.card_id)
        .bind(data.from_index)
        .bind(data.to_index)
        .bind(data.from_list_id)
        .bind(data.to_list_id)
        .bind(data.label_id)
        .bind(data.workspace_member_id)
        .bind(data.comment_id)
        .bind(&data.from_title)
        .bind(&data.to_title)
        .bind(&data.from_description)
        .bind(&data.to_description)
        .bind(&data.from_comment)
        .bind(&data.to_comment)
        .bind(data.created_by)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// One `card.archived` entry per card.
    pub async fn create_archived(
        conn: &mut sqlx::SqliteConnection,
        card_ids: &[i64],
        created_by: Uuid,
    ) -> Result<(), sqlx::Error> {
        for &card_id in card_ids {
            Self::create(
                &mut *conn,
                &NewCardActivity::new(CardActivityType::Archived, card_id, created_by),
            )
            .await?;
        }
        Ok(())
    }

    pub async fn find_by_card(
        pool: &SqlitePool,
        card_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CardActivity>(
            r#"SELECT id, public_id, type, card_id, from_index, to_index, from_list_id,
                      to_list_id, label_id, workspace_member_id, comment_id, from_title,
                      to_title, from_description, to_description, from_comment, to_comment,
                      created_by, created_at
                 FROM card_activities
                WHERE card_id = ?
                ORDER BY created_at ASC, id ASC"#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }
}
