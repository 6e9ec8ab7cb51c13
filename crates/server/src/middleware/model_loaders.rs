//! Loaders that resolve a path's public id into its row, check that the
//! caller may touch it, and stash the result in request extensions.
//!
//! Missing rows are 404, non-members 403, malformed ids 400.

use std::collections::HashMap;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use db::models::{
    board::Board,
    card::Card,
    checklist::{Checklist, ChecklistItem},
    comment::Comment,
    list::List,
    page::{Page, PageLabel, PageTag},
    user::User,
    workspace::Workspace,
};
use deployment::Deployment;
use services::services::access::assert_user_in_workspace;
use utils::uid::is_valid_public_id;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::RequestContext};

pub(crate) fn public_id_param<'a>(
    params: &'a HashMap<String, String>,
    key: &str,
) -> Result<&'a str, ApiError> {
    let value = params
        .get(key)
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {key}")))?;
    if !is_valid_public_id(value) {
        return Err(ApiError::BadRequest(format!("Invalid {key}")));
    }
    Ok(value)
}

fn caller(request: &Request) -> Result<User, ApiError> {
    request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.user.clone())
        .ok_or(ApiError::Unauthorized)
}

pub async fn load_workspace_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let workspace_id = public_id_param(&params, "workspace_id")?;
    let user = caller(&request)?;
    let pool = &deployment.db().pool;

    let workspace = Workspace::find_by_public_id(pool, workspace_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workspace not found".into()))?;
    let membership = assert_user_in_workspace(pool, user.id, workspace.id, false).await?;

    request.extensions_mut().insert(workspace);
    request.extensions_mut().insert(membership);
    Ok(next.run(request).await)
}

pub async fn load_board_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let board_id = public_id_param(&params, "board_id")?;
    let user = caller(&request)?;
    let pool = &deployment.db().pool;

    let board = Board::find_by_public_id(pool, board_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".into()))?;
    assert_user_in_workspace(pool, user.id, board.workspace_id, false).await?;

    request.extensions_mut().insert(board);
    Ok(next.run(request).await)
}

pub async fn load_list_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let list_id = public_id_param(&params, "list_id")?;
    let user = caller(&request)?;
    let pool = &deployment.db().pool;

    let list_ref = List::find_ref_by_public_id(pool, list_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("List not found".into()))?;
    assert_user_in_workspace(pool, user.id, list_ref.workspace_id, false).await?;
    let list = List::find_by_id(pool, list_ref.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("List not found".into()))?;

    request.extensions_mut().insert(list_ref);
    request.extensions_mut().insert(list);
    Ok(next.run(request).await)
}

pub async fn load_card_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let card_id = public_id_param(&params, "card_id")?;
    let user = caller(&request)?;
    let pool = &deployment.db().pool;

    let card_ref = Card::find_ref_by_public_id(pool, card_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Card not found".into()))?;
    assert_user_in_workspace(pool, user.id, card_ref.workspace_id, false).await?;
    let card = Card::find_by_id(pool, card_ref.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Card not found".into()))?;

    request.extensions_mut().insert(card_ref);
    request.extensions_mut().insert(card);
    Ok(next.run(request).await)
}

pub async fn load_comment_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let comment_id = public_id_param(&params, "comment_id")?;
    let user = caller(&request)?;
    let pool = &deployment.db().pool;

    let comment = Comment::find_by_public_id(pool, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;
    let card_ref = Card::find_ref_by_id(pool, comment.card_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Card not found".into()))?;
    assert_user_in_workspace(pool, user.id, card_ref.workspace_id, false).await?;

    request.extensions_mut().insert(card_ref);
    request.extensions_mut().insert(comment);
    Ok(next.run(request).await)
}

pub async fn load_checklist_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let checklist_id = public_id_param(&params, "checklist_id")?;
    let user = caller(&request)?;
    let pool = &deployment.db().pool;

    let checklist = Checklist::find_ref_by_public_id(pool, checklist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Checklist not found".into()))?;
    assert_user_in_workspace(pool, user.id, checklist.workspace_id, false).await?;

    request.extensions_mut().insert(checklist);
    Ok(next.run(request).await)
}

pub async fn load_checklist_item_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let item_id = public_id_param(&params, "item_id")?;
    let user = caller(&request)?;
    let pool = &deployment.db().pool;

    let item = ChecklistItem::find_ref_by_public_id(pool, item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Checklist item not found".into()))?;
    assert_user_in_workspace(pool, user.id, item.workspace_id, false).await?;

    request.extensions_mut().insert(item);
    Ok(next.run(request).await)
}

pub async fn load_page_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let page_id = public_id_param(&params, "page_id")?;
    let user = caller(&request)?;
    let pool = &deployment.db().pool;

    let page = Page::find_by_public_id(pool, page_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Page not found".into()))?;
    assert_user_in_workspace(pool, user.id, page.workspace_id, false).await?;

    request.extensions_mut().insert(page);
    Ok(next.run(request).await)
}

pub async fn load_page_tag_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let tag_id = public_id_param(&params, "tag_id")?;
    let user = caller(&request)?;
    let pool = &deployment.db().pool;

    let tag = PageTag::find_ref_by_public_id(pool, tag_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tag not found".into()))?;
    assert_user_in_workspace(pool, user.id, tag.workspace_id, false).await?;

    request.extensions_mut().insert(tag);
    Ok(next.run(request).await)
}

pub async fn load_page_label_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let label_id = public_id_param(&params, "label_id")?;
    let user = caller(&request)?;
    let pool = &deployment.db().pool;

    let label = PageLabel::find_by_public_id(pool, label_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Label not found".into()))?;
    assert_user_in_workspace(pool, user.id, label.workspace_id, false).await?;

    request.extensions_mut().insert(label);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_id_param_validates() {
        let mut params = HashMap::new();
        params.insert("board_id".to_string(), "abcdefghijkl".to_string());
        params.insert("card_id".to_string(), "short".to_string());

        assert_eq!(public_id_param(&params, "board_id").unwrap(), "abcdefghijkl");
        assert!(matches!(
            public_id_param(&params, "card_id"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            public_id_param(&params, "list_id"),
            Err(ApiError::BadRequest(_))
        ));
    }
}
