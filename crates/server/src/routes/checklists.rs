use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{post, put},
};
use db::models::{
    card::CardRef,
    checklist::{
        Checklist, ChecklistItem, ChecklistItemRef, ChecklistName, ChecklistRef,
        CreateChecklistItem, UpdateChecklistItem,
    },
};
use deployment::Deployment;
use services::services::events::{
    BoardChecklistPayload, BoardEvent, CardEvent, CardRefPayload,
};
use utils::response::ApiResponse;

use super::validation;
use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{RequestContext, load_checklist_item_middleware, load_checklist_middleware},
};

const NAME_MAX: usize = 255;
const TITLE_MAX: usize = 500;

/// Every checklist mutation is announced on both the board and the card.
fn emit_checklist_changed(
    deployment: &DeploymentImpl,
    board_id: i64,
    card_id: i64,
    card_public_id: &str,
) {
    let events = deployment.events();
    events.emit_board_event(BoardEvent::ChecklistChanged(BoardChecklistPayload {
        board_id,
        card_public_id: card_public_id.to_string(),
    }));
    events.emit_card_event(CardEvent::ChecklistChanged(CardRefPayload {
        card_id,
        card_public_id: card_public_id.to_string(),
    }));
}

/// POST /api/cards/{card_id}/checklists
pub async fn create_checklist(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(card): Extension<CardRef>,
    Json(payload): Json<ChecklistName>,
) -> Result<ResponseJson<ApiResponse<Checklist>>, ApiError> {
    validation::require_length("name", &payload.name, 1, NAME_MAX)?;
    let checklist =
        Checklist::create(&deployment.db().pool, card.id, &payload.name, ctx.user.id).await?;

    emit_checklist_changed(&deployment, card.board_id, card.id, &card.public_id);
    Ok(ResponseJson(ApiResponse::success(checklist)))
}

/// PUT /api/checklists/{checklist_id}
pub async fn rename_checklist(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(checklist): Extension<ChecklistRef>,
    Json(payload): Json<ChecklistName>,
) -> Result<ResponseJson<ApiResponse<Checklist>>, ApiError> {
    validation::require_length("name", &payload.name, 1, NAME_MAX)?;
    let renamed =
        Checklist::rename(&deployment.db().pool, &checklist, &payload.name, ctx.user.id).await?;

    emit_checklist_changed(
        &deployment,
        checklist.board_id,
        checklist.card_id,
        &checklist.card_public_id,
    );
    Ok(ResponseJson(ApiResponse::success(renamed)))
}

/// DELETE /api/checklists/{checklist_id} - removes the checklist and its items
pub async fn delete_checklist(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(checklist): Extension<ChecklistRef>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    Checklist::archive(&deployment.db().pool, &checklist, ctx.user.id).await?;

    emit_checklist_changed(
        &deployment,
        checklist.board_id,
        checklist.card_id,
        &checklist.card_public_id,
    );
    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/checklists/{checklist_id}/items
pub async fn create_item(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(checklist): Extension<ChecklistRef>,
    Json(payload): Json<CreateChecklistItem>,
) -> Result<ResponseJson<ApiResponse<ChecklistItem>>, ApiError> {
    validation::require_length("title", &payload.title, 1, TITLE_MAX)?;
    let item =
        ChecklistItem::create(&deployment.db().pool, &checklist, &payload.title, ctx.user.id)
            .await?;

    emit_checklist_changed(
        &deployment,
        checklist.board_id,
        checklist.card_id,
        &checklist.card_public_id,
    );
    Ok(ResponseJson(ApiResponse::success(item)))
}

/// PUT /api/checklists/items/{item_id}
pub async fn update_item(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(item): Extension<ChecklistItemRef>,
    Json(payload): Json<UpdateChecklistItem>,
) -> Result<ResponseJson<ApiResponse<ChecklistItem>>, ApiError> {
    if let Some(title) = payload.title.as_deref() {
        validation::require_length("title", title, 1, TITLE_MAX)?;
    }
    let updated = ChecklistItem::update(
        &deployment.db().pool,
        &item,
        payload.title.as_deref(),
        payload.completed,
        ctx.user.id,
    )
    .await?;

    emit_checklist_changed(&deployment, item.board_id, item.card_id, &item.card_public_id);
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/checklists/items/{item_id}
pub async fn delete_item(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(item): Extension<ChecklistItemRef>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ChecklistItem::archive(&deployment.db().pool, &item, ctx.user.id).await?;

    emit_checklist_changed(&deployment, item.board_id, item.card_id, &item.card_public_id);
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let checklist_router = Router::new()
        .route("/", put(rename_checklist).delete(delete_checklist))
        .route("/items", post(create_item))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_checklist_middleware,
        ));

    let item_router = Router::new()
        .route("/", put(update_item).delete(delete_item))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_checklist_item_middleware,
        ));

    Router::new()
        .nest("/checklists/items/{item_id}", item_router)
        .nest("/checklists/{checklist_id}", checklist_router)
}
