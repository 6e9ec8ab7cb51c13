//! Database models for the Kan workspace.
//!
//! Rows carry an internal integer `id` and a 12-char `public_id`; the latter
//! is the only identifier exposed over HTTP. Deleting sets `deleted_at`, and
//! every read filters those rows out.

pub mod board;
pub mod card;
pub mod card_activity;
pub mod checklist;
pub mod comment;
pub mod label;
pub mod list;
pub(crate) mod ordering;
pub mod page;
pub mod user;
pub mod visibility;
pub mod workspace;
