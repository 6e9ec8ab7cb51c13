//! Writes the TypeScript mirror of the API types to `shared/types.ts`.
//!
//! `--check` compares against the file on disk instead and exits non-zero
//! when it is stale.

use std::{env, fs, path::PathBuf, process::ExitCode};

use ts_rs::TS;

fn declarations() -> Vec<String> {
    vec![
        utils::response::ApiResponse::<()>::decl(),
        db::models::user::User::decl(),
        db::models::visibility::Visibility::decl(),
        db::models::workspace::Workspace::decl(),
        db::models::workspace::MemberRole::decl(),
        db::models::workspace::MemberStatus::decl(),
        db::models::workspace::WorkspaceMember::decl(),
        db::models::workspace::CreateWorkspace::decl(),
        db::models::workspace::AddWorkspaceMember::decl(),
        db::models::board::Board::decl(),
        db::models::board::CardSummary::decl(),
        db::models::board::ListWithCards::decl(),
        db::models::board::BoardDetail::decl(),
        db::models::board::CreateBoard::decl(),
        db::models::board::UpdateBoard::decl(),
        db::models::list::List::decl(),
        db::models::list::CreateList::decl(),
        db::models::list::UpdateList::decl(),
        db::models::label::Label::decl(),
        db::models::card::Card::decl(),
        db::models::card::CardPosition::decl(),
        db::models::card::CardDetail::decl(),
        db::models::card::CreateCard::decl(),
        db::models::card::UpdateCard::decl(),
        db::models::card_activity::CardActivityType::decl(),
        db::models::card_activity::CardActivity::decl(),
        db::models::comment::Comment::decl(),
        db::models::comment::CommentBody::decl(),
        db::models::checklist::Checklist::decl(),
        db::models::checklist::ChecklistItem::decl(),
        db::models::checklist::ChecklistWithItems::decl(),
        db::models::checklist::ChecklistName::decl(),
        db::models::checklist::CreateChecklistItem::decl(),
        db::models::checklist::UpdateChecklistItem::decl(),
        db::models::page::Page::decl(),
        db::models::page::PageTag::decl(),
        db::models::page::PageLabel::decl(),
        db::models::page::PageSummary::decl(),
        db::models::page::PageWorkspace::decl(),
        db::models::page::PageDetail::decl(),
        db::models::page::CreatePage::decl(),
        db::models::page::UpdatePage::decl(),
        db::models::page::CreateTagLike::decl(),
        db::models::page::UpdateTagLike::decl(),
        services::services::events::CardChanges::decl(),
        services::services::events::BoardCardPayload::decl(),
        services::services::events::BoardListPayload::decl(),
        services::services::events::BoardChecklistPayload::decl(),
        services::services::events::BoardEvent::decl(),
        services::services::events::CardCommentPayload::decl(),
        services::services::events::CardLabelPayload::decl(),
        services::services::events::CardMemberPayload::decl(),
        services::services::events::CardRefPayload::decl(),
        services::services::events::CardUpdatePayload::decl(),
        services::services::events::CardEvent::decl(),
        services::services::events::AnyEvent::decl(),
        services::services::events::TrackedEvent::decl(),
        server::routes::boards::SlugAvailability::decl(),
        server::routes::boards::SlugQuery::decl(),
        server::routes::boards::BoardFilterQuery::decl(),
        server::routes::pages::PageSlugQuery::decl(),
    ]
}

fn render() -> String {
    let mut out = String::from(
        "// This file was generated by `cargo run --bin generate_types`. Do not edit.\n\n",
    );
    for decl in declarations() {
        out.push_str("export ");
        out.push_str(&decl);
        out.push_str("\n\n");
    }
    out
}

fn output_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../shared/types.ts")
}

fn main() -> ExitCode {
    let path = output_path();
    let rendered = render();

    if env::args().any(|arg| arg == "--check") {
        return match fs::read_to_string(&path) {
            Ok(current) if current == rendered => {
                println!("{} is up to date", path.display());
                ExitCode::SUCCESS
            }
            _ => {
                eprintln!("{} is stale; run generate_types", path.display());
                ExitCode::FAILURE
            }
        };
    }

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        eprintln!("failed to create {}: {e}", parent.display());
        return ExitCode::FAILURE;
    }
    match fs::write(&path, rendered) {
        Ok(()) => {
            println!("wrote {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to write {}: {e}", path.display());
            ExitCode::FAILURE
        }
    }
}
