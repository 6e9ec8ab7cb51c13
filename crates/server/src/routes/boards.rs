use std::collections::HashMap;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    middleware::from_fn_with_state,
    response::{IntoResponse, Json as ResponseJson},
    routing::get,
};
use db::models::{
    board::{Board, BoardDetail, BoardFilters, CreateBoard, UpdateBoard},
    workspace::Workspace,
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::events::Topic;
use ts_rs::TS;
use utils::{
    response::ApiResponse,
    uid::{generate_slug, generate_uid},
};

use super::{sse, validation};
use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{RequestContext, load_board_middleware},
};

const NAME_MAX: usize = 100;
const SLUG_MIN: usize = 3;
const SLUG_MAX: usize = 60;
const PUBLIC_SLUG_MAX: usize = 24;

/// `?members=a,b&labels=c`. A card is shown when it matches any requested
/// member and any requested label.
#[derive(Debug, Default, Deserialize, TS)]
pub struct BoardFilterQuery {
    pub members: Option<String>,
    pub labels: Option<String>,
}

impl BoardFilterQuery {
    fn into_filters(self) -> Result<BoardFilters, ApiError> {
        Ok(BoardFilters {
            members: validation::public_id_list("members", self.members.as_deref())?,
            labels: validation::public_id_list("labels", self.labels.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SlugQuery {
    pub board_slug: String,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct SlugAvailability {
    pub is_reserved: bool,
}

/// GET /api/workspaces/{workspace_id}/boards
pub async fn list_boards(
    State(deployment): State<DeploymentImpl>,
    Extension(workspace): Extension<Workspace>,
) -> Result<ResponseJson<ApiResponse<Vec<Board>>>, ApiError> {
    let boards = Board::find_all_by_workspace(&deployment.db().pool, workspace.id).await?;
    Ok(ResponseJson(ApiResponse::success(boards)))
}

/// POST /api/workspaces/{workspace_id}/boards
///
/// The slug comes from the name and gets a random suffix when taken.
pub async fn create_board(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(workspace): Extension<Workspace>,
    Json(payload): Json<CreateBoard>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    let pool = &deployment.db().pool;
    validation::require_length("name", &payload.name, 1, NAME_MAX)?;
    if payload.lists.iter().any(|name| name.is_empty()) {
        return Err(ApiError::BadRequest("List names cannot be empty".to_string()));
    }
    if payload.labels.iter().any(|name| name.is_empty()) {
        return Err(ApiError::BadRequest("Label names cannot be empty".to_string()));
    }

    let mut slug = generate_slug(&payload.name);
    if slug.is_empty() {
        slug = generate_uid();
    } else if !Board::is_slug_available(pool, workspace.id, &slug, None).await? {
        slug = format!("{slug}-{}", generate_uid());
    }

    let board = Board::create_with_lists_and_labels(
        pool,
        workspace.id,
        &payload.name,
        &slug,
        &payload.lists,
        &payload.labels,
        ctx.user.id,
    )
    .await?;

    tracing::info!(
        board = %board.public_id,
        workspace = %workspace.public_id,
        lists = payload.lists.len(),
        labels = payload.labels.len(),
        "board created"
    );
    Ok(ResponseJson(ApiResponse::success(board)))
}

/// GET /api/boards/{board_id}
pub async fn get_board(
    State(deployment): State<DeploymentImpl>,
    Extension(board): Extension<Board>,
    Query(query): Query<BoardFilterQuery>,
) -> Result<ResponseJson<ApiResponse<BoardDetail>>, ApiError> {
    let filters = query.into_filters()?;
    let detail = Board::detail(&deployment.db().pool, board, &filters).await?;
    Ok(ResponseJson(ApiResponse::success(detail)))
}

/// PUT /api/boards/{board_id}
pub async fn update_board(
    State(deployment): State<DeploymentImpl>,
    Extension(board): Extension<Board>,
    Json(payload): Json<UpdateBoard>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    let pool = &deployment.db().pool;
    if let Some(name) = payload.name.as_deref() {
        validation::require_length("name", name, 1, NAME_MAX)?;
    }
    if let Some(slug) = payload.slug.as_deref() {
        validation::require_slug("slug", slug, SLUG_MIN, SLUG_MAX)?;
        if !Board::is_slug_available(pool, board.workspace_id, slug, Some(board.id)).await? {
            return Err(ApiError::BadRequest(format!(
                "Board slug {slug} is not available"
            )));
        }
    }

    let updated = Board::update(pool, board.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/boards/{board_id} - soft deletes the board with its lists and cards
pub async fn delete_board(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(board): Extension<Board>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let archived = Board::archive(&deployment.db().pool, board.id, ctx.user.id).await?;
    tracing::info!(
        board = %board.public_id,
        archived_cards = archived.len(),
        "board deleted"
    );
    Ok(ResponseJson(ApiResponse::success(())))
}

/// GET /api/boards/{board_id}/check-slug-availability?boardSlug=
pub async fn check_slug_availability(
    State(deployment): State<DeploymentImpl>,
    Extension(board): Extension<Board>,
    Query(query): Query<SlugQuery>,
) -> Result<ResponseJson<ApiResponse<SlugAvailability>>, ApiError> {
    validation::require_slug("boardSlug", &query.board_slug, SLUG_MIN, PUBLIC_SLUG_MAX)?;
    let available = Board::is_slug_available(
        &deployment.db().pool,
        board.workspace_id,
        &query.board_slug,
        Some(board.id),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(SlugAvailability {
        is_reserved: !available,
    })))
}

/// GET /api/boards/{board_id}/events
pub async fn board_events(
    State(deployment): State<DeploymentImpl>,
    Extension(board): Extension<Board>,
    headers: HeaderMap,
) -> impl IntoResponse {
    tracing::debug!(board = %board.public_id, "board subscription opened");
    sse::subscribe(&deployment, Topic::Board(board.id), &headers)
}

/// GET /api/public/workspaces/{workspace_slug}/boards/{board_slug}
///
/// Only public boards are visible here; private ones are 404.
pub async fn get_public_board(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    Query(query): Query<BoardFilterQuery>,
) -> Result<ResponseJson<ApiResponse<BoardDetail>>, ApiError> {
    let pool = &deployment.db().pool;
    let workspace_slug = params.get("workspace_slug").map(String::as_str).unwrap_or("");
    let board_slug = params.get("board_slug").map(String::as_str).unwrap_or("");
    validation::require_slug("workspaceSlug", workspace_slug, SLUG_MIN, PUBLIC_SLUG_MAX)?;
    validation::require_slug("boardSlug", board_slug, SLUG_MIN, PUBLIC_SLUG_MAX)?;
    let filters = query.into_filters()?;

    let workspace = Workspace::find_by_slug(pool, workspace_slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Workspace {workspace_slug} not found")))?;
    let board = Board::find_public_by_slug(pool, workspace.id, board_slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Board {board_slug} not found")))?;

    let detail = Board::detail(pool, board, &filters).await?;
    Ok(ResponseJson(ApiResponse::success(detail)))
}

/// Routes nested under a loaded workspace.
pub fn workspace_router() -> Router<DeploymentImpl> {
    Router::new().route("/boards", get(list_boards).post(create_board))
}

pub fn public_router() -> Router<DeploymentImpl> {
    Router::new().route(
        "/public/workspaces/{workspace_slug}/boards/{board_slug}",
        get(get_public_board),
    )
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let board_router = Router::new()
        .route("/", get(get_board).put(update_board).delete(delete_board))
        .route("/check-slug-availability", get(check_slug_availability))
        .route("/events", get(board_events))
        .layer(from_fn_with_state(deployment.clone(), load_board_middleware));

    Router::new().nest("/boards/{board_id}", board_router)
}
