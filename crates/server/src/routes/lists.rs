use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{post, put},
};
use db::models::{
    board::Board,
    list::{CreateList, List, ListRef, UpdateList},
};
use deployment::Deployment;
use services::services::{
    access::assert_user_in_workspace,
    events::{BoardEvent, BoardListPayload},
};
use utils::response::ApiResponse;

use super::validation;
use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{RequestContext, load_list_middleware},
};

const NAME_MAX: usize = 255;

/// POST /api/lists - append a list to a board
pub async fn create_list(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateList>,
) -> Result<ResponseJson<ApiResponse<List>>, ApiError> {
    validation::require_public_id("boardPublicId", &payload.board_public_id)?;
    validation::require_length("name", &payload.name, 1, NAME_MAX)?;
    let pool = &deployment.db().pool;

    let board = Board::find_ref_by_public_id(pool, &payload.board_public_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;
    assert_user_in_workspace(pool, ctx.user.id, board.workspace_id, false).await?;

    let list = List::create(pool, &payload.name, board.id, ctx.user.id).await?;

    deployment
        .events()
        .emit_board_event(BoardEvent::ListCreated(BoardListPayload {
            board_id: board.id,
            list_public_id: list.public_id.clone(),
            name: Some(list.name.clone()),
            index: Some(list.index),
        }));

    Ok(ResponseJson(ApiResponse::success(list)))
}

/// PUT /api/lists/{list_id} - rename and/or move
pub async fn update_list(
    State(deployment): State<DeploymentImpl>,
    Extension(list_ref): Extension<ListRef>,
    Json(payload): Json<UpdateList>,
) -> Result<ResponseJson<ApiResponse<List>>, ApiError> {
    let pool = &deployment.db().pool;
    if let Some(name) = payload.name.as_deref() {
        validation::require_length("name", name, 1, NAME_MAX)?;
    }

    let mut result = None;
    if let Some(name) = payload.name.as_deref() {
        result = Some(List::rename(pool, list_ref.id, name).await?);
    }
    if let Some(index) = payload.index {
        result = Some(List::reorder(pool, list_ref.id, index).await?);
    }
    let Some(list) = result else {
        return Err(ApiError::Internal("Failed to update list".to_string()));
    };

    deployment
        .events()
        .emit_board_event(BoardEvent::ListUpdated(BoardListPayload {
            board_id: list_ref.board_id,
            list_public_id: list.public_id.clone(),
            name: payload.name,
            index: payload.index.map(|_| list.index),
        }));

    Ok(ResponseJson(ApiResponse::success(list)))
}

/// DELETE /api/lists/{list_id} - soft deletes the list and its cards
pub async fn delete_list(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(list): Extension<List>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let archived = List::archive(&deployment.db().pool, &list, ctx.user.id).await?;
    tracing::debug!(list = %list.public_id, archived_cards = archived.len(), "list deleted");

    deployment
        .events()
        .emit_board_event(BoardEvent::ListDeleted(BoardListPayload {
            board_id: list.board_id,
            list_public_id: list.public_id,
            name: None,
            index: None,
        }));

    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let list_router = Router::new()
        .route("/", put(update_list).delete(delete_list))
        .layer(from_fn_with_state(deployment.clone(), load_list_middleware));

    Router::new()
        .route("/lists", post(create_list))
        .nest("/lists/{list_id}", list_router)
}
