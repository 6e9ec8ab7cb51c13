use std::collections::HashMap;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    middleware::from_fn_with_state,
    response::{IntoResponse, Json as ResponseJson},
    routing::{get, post, put},
};
use db::models::{
    card::{Card, CardDetail, CardRef, CreateCard, UpdateCard},
    comment::{Comment, CommentBody},
    label::Label,
    list::List,
    workspace::WorkspaceMember,
};
use deployment::Deployment;
use services::services::{
    access::assert_user_in_workspace,
    events::{
        BoardCardPayload, BoardEvent, CardChanges, CardCommentPayload, CardEvent,
        CardLabelPayload, CardMemberPayload, CardUpdatePayload, Topic,
    },
};
use utils::response::ApiResponse;

use super::{checklists, sse, validation};
use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{
        RequestContext, load_card_middleware, load_comment_middleware,
        model_loaders::public_id_param,
    },
};

const TITLE_MAX: usize = 2000;
const DESCRIPTION_MAX: usize = 10_000;
const COMMENT_MAX: usize = 5000;

/// POST /api/cards
pub async fn create_card(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateCard>,
) -> Result<ResponseJson<ApiResponse<Card>>, ApiError> {
    validation::require_public_id("listPublicId", &payload.list_public_id)?;
    validation::require_length("title", &payload.title, 1, TITLE_MAX)?;
    validation::require_length("description", &payload.description, 0, DESCRIPTION_MAX)?;
    let pool = &deployment.db().pool;

    let list = List::find_ref_by_public_id(pool, &payload.list_public_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("List not found".to_string()))?;
    assert_user_in_workspace(pool, ctx.user.id, list.workspace_id, false).await?;

    let mut label_ids = Vec::with_capacity(payload.label_public_ids.len());
    for public_id in &payload.label_public_ids {
        validation::require_public_id("labelPublicIds", public_id)?;
        let label = Label::find_by_public_id(pool, public_id)
            .await?
            .filter(|label| label.board_id == list.board_id)
            .ok_or_else(|| ApiError::BadRequest(format!("Label {public_id} not found")))?;
        label_ids.push(label.id);
    }

    let mut member_ids = Vec::with_capacity(payload.member_public_ids.len());
    for public_id in &payload.member_public_ids {
        validation::require_public_id("memberPublicIds", public_id)?;
        let member = WorkspaceMember::find_by_public_id(pool, public_id)
            .await?
            .filter(|member| member.workspace_id == list.workspace_id)
            .ok_or_else(|| ApiError::BadRequest(format!("Member {public_id} not found")))?;
        member_ids.push(member.id);
    }

    let card = Card::create(
        pool,
        list.id,
        &payload.title,
        &payload.description,
        payload.position,
        &label_ids,
        &member_ids,
        ctx.user.id,
    )
    .await?;

    deployment
        .events()
        .emit_board_event(BoardEvent::CardCreated(BoardCardPayload {
            board_id: list.board_id,
            card_public_id: card.public_id.clone(),
            list_public_id: Some(list.public_id),
            changes: None,
        }));

    Ok(ResponseJson(ApiResponse::success(card)))
}

/// GET /api/cards/{card_id}
pub async fn get_card(
    State(deployment): State<DeploymentImpl>,
    Extension(card): Extension<Card>,
) -> Result<ResponseJson<ApiResponse<CardDetail>>, ApiError> {
    let detail = Card::detail(&deployment.db().pool, card).await?;
    Ok(ResponseJson(ApiResponse::success(detail)))
}

/// PUT /api/cards/{card_id}
///
/// Edits the text fields, then moves the card when a list or index is given.
/// The target list must belong to the same board.
pub async fn update_card(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(card_ref): Extension<CardRef>,
    Extension(card): Extension<Card>,
    Json(payload): Json<UpdateCard>,
) -> Result<ResponseJson<ApiResponse<Card>>, ApiError> {
    let pool = &deployment.db().pool;
    if let Some(title) = payload.title.as_deref() {
        validation::require_length("title", title, 1, TITLE_MAX)?;
    }
    if let Some(description) = payload.description.as_deref() {
        validation::require_length("description", description, 0, DESCRIPTION_MAX)?;
    }
    if payload.index.is_some_and(|index| index < 0) {
        return Err(ApiError::BadRequest("index must not be negative".to_string()));
    }

    let (target_list_id, target_list_public_id) = match payload.list_public_id.as_deref() {
        Some(public_id) => {
            validation::require_public_id("listPublicId", public_id)?;
            let target = List::find_ref_by_public_id(pool, public_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("List not found".to_string()))?;
            if target.board_id != card_ref.board_id {
                return Err(ApiError::BadRequest(
                    "Cards can only move between lists of the same board".to_string(),
                ));
            }
            (target.id, target.public_id)
        }
        None => (card.list_id, card_ref.list_public_id.clone()),
    };

    let mut changes = CardChanges::default();
    let mut current = card;

    if payload.title.is_some() || payload.description.is_some() {
        let updated = Card::update_details(
            pool,
            &current,
            payload.title.as_deref(),
            payload.description.as_deref(),
            ctx.user.id,
        )
        .await?;
        if updated.title != current.title {
            changes.title = Some(updated.title.clone());
        }
        if updated.description != current.description {
            changes.description = Some(updated.description.clone());
        }
        current = updated;
    }

    if payload.list_public_id.is_some() || payload.index.is_some() {
        let moved = Card::move_to(pool, &current, target_list_id, payload.index, ctx.user.id)
            .await?;
        if moved.list_id != current.list_id {
            changes.list_public_id = Some(target_list_public_id.clone());
        }
        if moved.index != current.index || moved.list_id != current.list_id {
            changes.index = Some(moved.index);
        }
        current = moved;
    }

    if changes.is_empty() {
        tracing::debug!(card = %current.public_id, "card update changed nothing");
    }

    let events = deployment.events();
    events.emit_board_event(BoardEvent::CardUpdated(BoardCardPayload {
        board_id: card_ref.board_id,
        card_public_id: current.public_id.clone(),
        list_public_id: Some(target_list_public_id),
        changes: Some(changes.clone()),
    }));
    events.emit_card_event(CardEvent::Updated(CardUpdatePayload {
        card_id: card_ref.id,
        card_public_id: current.public_id.clone(),
        changes: Some(changes),
    }));

    Ok(ResponseJson(ApiResponse::success(current)))
}

/// DELETE /api/cards/{card_id}
pub async fn delete_card(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(card_ref): Extension<CardRef>,
    Extension(card): Extension<Card>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    Card::archive(&deployment.db().pool, &card, ctx.user.id).await?;

    let events = deployment.events();
    events.emit_board_event(BoardEvent::CardDeleted(BoardCardPayload {
        board_id: card_ref.board_id,
        card_public_id: card.public_id.clone(),
        list_public_id: Some(card_ref.list_public_id.clone()),
        changes: None,
    }));
    events.emit_card_event(CardEvent::Deleted(CardUpdatePayload {
        card_id: card_ref.id,
        card_public_id: card.public_id,
        changes: None,
    }));

    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/cards/{card_id}/comments
pub async fn add_comment(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(card_ref): Extension<CardRef>,
    Json(payload): Json<CommentBody>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    validation::require_length("comment", &payload.comment, 1, COMMENT_MAX)?;
    let comment =
        Comment::create(&deployment.db().pool, card_ref.id, &payload.comment, ctx.user.id).await?;

    deployment
        .events()
        .emit_card_event(CardEvent::CommentAdded(CardCommentPayload {
            card_id: card_ref.id,
            card_public_id: card_ref.public_id,
            comment_public_id: comment.public_id.clone(),
            comment: Some(comment.comment.clone()),
        }));

    Ok(ResponseJson(ApiResponse::success(comment)))
}

fn require_author(ctx: &RequestContext, comment: &Comment) -> Result<(), ApiError> {
    if comment.created_by == Some(ctx.user.id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Only the author can change this comment".to_string(),
        ))
    }
}

/// PUT /api/cards/comments/{comment_id}
pub async fn update_comment(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(card_ref): Extension<CardRef>,
    Extension(comment): Extension<Comment>,
    Json(payload): Json<CommentBody>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    require_author(&ctx, &comment)?;
    validation::require_length("comment", &payload.comment, 1, COMMENT_MAX)?;
    let updated =
        Comment::update(&deployment.db().pool, &comment, &payload.comment, ctx.user.id).await?;

    deployment
        .events()
        .emit_card_event(CardEvent::CommentUpdated(CardCommentPayload {
            card_id: card_ref.id,
            card_public_id: card_ref.public_id,
            comment_public_id: updated.public_id.clone(),
            comment: Some(updated.comment.clone()),
        }));

    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/cards/comments/{comment_id}
pub async fn delete_comment(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(card_ref): Extension<CardRef>,
    Extension(comment): Extension<Comment>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    require_author(&ctx, &comment)?;
    Comment::soft_delete(&deployment.db().pool, &comment, ctx.user.id).await?;

    deployment
        .events()
        .emit_card_event(CardEvent::CommentDeleted(CardCommentPayload {
            card_id: card_ref.id,
            card_public_id: card_ref.public_id,
            comment_public_id: comment.public_id,
            comment: None,
        }));

    Ok(ResponseJson(ApiResponse::success(())))
}

/// PUT /api/cards/{card_id}/labels/{label_id} - adds the label or removes it
pub async fn toggle_label(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(card_ref): Extension<CardRef>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<bool>>, ApiError> {
    let label_id = public_id_param(&params, "label_id")?;
    let pool = &deployment.db().pool;

    let label = Label::find_by_public_id(pool, label_id)
        .await?
        .filter(|label| label.board_id == card_ref.board_id)
        .ok_or_else(|| ApiError::NotFound("Label not found".to_string()))?;
    let added = Card::toggle_label(pool, card_ref.id, label.id, ctx.user.id).await?;

    let payload = CardLabelPayload {
        card_id: card_ref.id,
        card_public_id: card_ref.public_id,
        label_public_id: label.public_id,
    };
    deployment.events().emit_card_event(if added {
        CardEvent::LabelAdded(payload)
    } else {
        CardEvent::LabelRemoved(payload)
    });

    Ok(ResponseJson(ApiResponse::success(added)))
}

/// PUT /api/cards/{card_id}/members/{member_id} - assigns or unassigns
pub async fn toggle_member(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(card_ref): Extension<CardRef>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<bool>>, ApiError> {
    let member_id = public_id_param(&params, "member_id")?;
    let pool = &deployment.db().pool;

    let member = WorkspaceMember::find_by_public_id(pool, member_id)
        .await?
        .filter(|member| member.workspace_id == card_ref.workspace_id)
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;
    let added = Card::toggle_member(pool, card_ref.id, member.id, ctx.user.id).await?;

    let payload = CardMemberPayload {
        card_id: card_ref.id,
        card_public_id: card_ref.public_id,
        workspace_member_public_id: member.public_id,
    };
    deployment.events().emit_card_event(if added {
        CardEvent::MemberAdded(payload)
    } else {
        CardEvent::MemberRemoved(payload)
    });

    Ok(ResponseJson(ApiResponse::success(added)))
}

/// GET /api/cards/{card_id}/events
pub async fn card_events(
    State(deployment): State<DeploymentImpl>,
    Extension(card_ref): Extension<CardRef>,
    headers: HeaderMap,
) -> impl IntoResponse {
    tracing::debug!(card = %card_ref.public_id, "card subscription opened");
    sse::subscribe(&deployment, Topic::Card(card_ref.id), &headers)
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let card_router = Router::new()
        .route("/", get(get_card).put(update_card).delete(delete_card))
        .route("/comments", post(add_comment))
        .route("/labels/{label_id}", put(toggle_label))
        .route("/members/{member_id}", put(toggle_member))
        .route("/checklists", post(checklists::create_checklist))
        .route("/events", get(card_events))
        .layer(from_fn_with_state(deployment.clone(), load_card_middleware));

    let comment_router = Router::new()
        .route("/", put(update_comment).delete(delete_comment))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_comment_middleware,
        ));

    Router::new()
        .route("/cards", post(create_card))
        .nest("/cards/comments/{comment_id}", comment_router)
        .nest("/cards/{card_id}", card_router)
}
