use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Fields of a card that changed in one update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CardChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_public_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
}

impl CardChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BoardCardPayload {
    pub board_id: i64,
    pub card_public_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_public_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<CardChanges>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BoardListPayload {
    pub board_id: i64,
    pub list_public_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BoardChecklistPayload {
    pub board_id: i64,
    pub card_public_id: String,
}

/// Events delivered to `board:{id}` subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
pub enum BoardEvent {
    #[serde(rename = "card.created")]
    CardCreated(BoardCardPayload),
    #[serde(rename = "card.updated")]
    CardUpdated(BoardCardPayload),
    #[serde(rename = "card.deleted")]
    CardDeleted(BoardCardPayload),
    #[serde(rename = "list.created")]
    ListCreated(BoardListPayload),
    #[serde(rename = "list.updated")]
    ListUpdated(BoardListPayload),
    #[serde(rename = "list.deleted")]
    ListDeleted(BoardListPayload),
    #[serde(rename = "checklist.changed")]
    ChecklistChanged(BoardChecklistPayload),
}

impl BoardEvent {
    /// The wire name carried in the `type` field.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CardCreated(_) => "card.created",
            Self::CardUpdated(_) => "card.updated",
            Self::CardDeleted(_) => "card.deleted",
            Self::ListCreated(_) => "list.created",
            Self::ListUpdated(_) => "list.updated",
            Self::ListDeleted(_) => "list.deleted",
            Self::ChecklistChanged(_) => "checklist.changed",
        }
    }

    pub fn board_id(&self) -> i64 {
        match self {
            Self::CardCreated(p) | Self::CardUpdated(p) | Self::CardDeleted(p) => p.board_id,
            Self::ListCreated(p) | Self::ListUpdated(p) | Self::ListDeleted(p) => p.board_id,
            Self::ChecklistChanged(p) => p.board_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CardCommentPayload {
    pub card_id: i64,
    pub card_public_id: String,
    pub comment_public_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CardLabelPayload {
    pub card_id: i64,
    pub card_public_id: String,
    pub label_public_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CardMemberPayload {
    pub card_id: i64,
    pub card_public_id: String,
    pub workspace_member_public_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CardRefPayload {
    pub card_id: i64,
    pub card_public_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CardUpdatePayload {
    pub card_id: i64,
    pub card_public_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<CardChanges>,
}

/// Events delivered to `card:{id}` subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
pub enum CardEvent {
    #[serde(rename = "comment.added")]
    CommentAdded(CardCommentPayload),
    #[serde(rename = "comment.updated")]
    CommentUpdated(CardCommentPayload),
    #[serde(rename = "comment.deleted")]
    CommentDeleted(CardCommentPayload),
    #[serde(rename = "label.added")]
    LabelAdded(CardLabelPayload),
    #[serde(rename = "label.removed")]
    LabelRemoved(CardLabelPayload),
    #[serde(rename = "member.added")]
    MemberAdded(CardMemberPayload),
    #[serde(rename = "member.removed")]
    MemberRemoved(CardMemberPayload),
    #[serde(rename = "checklist.changed")]
    ChecklistChanged(CardRefPayload),
    #[serde(rename = "updated")]
    Updated(CardUpdatePayload),
    #[serde(rename = "deleted")]
    Deleted(CardUpdatePayload),
}

impl CardEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CommentAdded(_) => "comment.added",
            Self::CommentUpdated(_) => "comment.updated",
            Self::CommentDeleted(_) => "comment.deleted",
            Self::LabelAdded(_) => "label.added",
            Self::LabelRemoved(_) => "label.removed",
            Self::MemberAdded(_) => "member.added",
            Self::MemberRemoved(_) => "member.removed",
            Self::ChecklistChanged(_) => "checklist.changed",
            Self::Updated(_) => "updated",
            Self::Deleted(_) => "deleted",
        }
    }

    pub fn card_id(&self) -> i64 {
        match self {
            Self::CommentAdded(p) | Self::CommentUpdated(p) | Self::CommentDeleted(p) => p.card_id,
            Self::LabelAdded(p) | Self::LabelRemoved(p) => p.card_id,
            Self::MemberAdded(p) | Self::MemberRemoved(p) => p.card_id,
            Self::ChecklistChanged(p) => p.card_id,
            Self::Updated(p) | Self::Deleted(p) => p.card_id,
        }
    }
}

/// Either scope, as written to the SSE `data:` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "scope")]
pub enum AnyEvent {
    #[serde(rename = "board")]
    Board(BoardEvent),
    #[serde(rename = "card")]
    Card(CardEvent),
}

impl AnyEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Board(event) => event.event_type(),
            Self::Card(event) => event.event_type(),
        }
    }
}

impl From<BoardEvent> for AnyEvent {
    fn from(event: BoardEvent) -> Self {
        Self::Board(event)
    }
}

impl From<CardEvent> for AnyEvent {
    fn from(event: CardEvent) -> Self {
        Self::Card(event)
    }
}

/// Channel key. Board and card ids are internal row ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Board(i64),
    Card(i64),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board(id) => write!(f, "board:{id}"),
            Self::Card(id) => write!(f, "card:{id}"),
        }
    }
}

/// An event stamped with the id sent as the SSE `id:` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct TrackedEvent {
    pub id: String,
    pub event: AnyEvent,
}
