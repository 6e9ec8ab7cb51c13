use std::collections::HashMap;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::{
    user::User,
    workspace::{AddWorkspaceMember, CreateWorkspace, Workspace, WorkspaceMember},
};
use deployment::Deployment;
use utils::{
    response::ApiResponse,
    uid::{generate_slug, generate_uid},
};

use super::{boards, pages, validation};
use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{RequestContext, load_workspace_middleware, model_loaders::public_id_param},
};

const NAME_MAX: usize = 64;
const SLUG_MIN: usize = 3;
const SLUG_MAX: usize = 24;

fn require_admin(caller: &WorkspaceMember) -> Result<(), ApiError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You must be an admin to perform this action".to_string(),
        ))
    }
}

/// POST /api/workspaces
pub async fn create_workspace(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateWorkspace>,
) -> Result<ResponseJson<ApiResponse<Workspace>>, ApiError> {
    let pool = &deployment.db().pool;
    let name = payload.name.trim();
    validation::require_length("name", name, 1, NAME_MAX)?;

    let slug = match payload.slug.as_deref() {
        Some(requested) => {
            let requested = requested.to_lowercase();
            validation::require_slug("slug", &requested, SLUG_MIN, SLUG_MAX)?;
            if !Workspace::is_slug_available(pool, &requested).await? {
                return Err(ApiError::BadRequest(format!(
                    "Workspace slug {requested} is not available"
                )));
            }
            requested
        }
        None => {
            let generated = generate_slug(name);
            if generated.is_empty() {
                generate_uid()
            } else if Workspace::is_slug_available(pool, &generated).await? {
                generated
            } else {
                format!("{generated}-{}", generate_uid())
            }
        }
    };

    let workspace = Workspace::create(
        pool,
        &generate_uid(),
        name,
        &slug,
        payload.description.as_deref(),
        ctx.user.id,
        &ctx.user.email,
    )
    .await?;

    tracing::info!(workspace = %workspace.public_id, %slug, "workspace created");
    Ok(ResponseJson(ApiResponse::success(workspace)))
}

/// GET /api/workspaces - workspaces the caller is an active member of
pub async fn list_workspaces(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<ResponseJson<ApiResponse<Vec<Workspace>>>, ApiError> {
    let workspaces = Workspace::find_all_for_user(&deployment.db().pool, ctx.user.id).await?;
    Ok(ResponseJson(ApiResponse::success(workspaces)))
}

pub async fn get_workspace(
    Extension(workspace): Extension<Workspace>,
) -> Result<ResponseJson<ApiResponse<Workspace>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(workspace)))
}

pub async fn list_members(
    State(deployment): State<DeploymentImpl>,
    Extension(workspace): Extension<Workspace>,
) -> Result<ResponseJson<ApiResponse<Vec<WorkspaceMember>>>, ApiError> {
    let members = WorkspaceMember::find_all(&deployment.db().pool, workspace.id).await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

/// POST /api/workspaces/{workspace_id}/members
///
/// Existing users join as active members; unknown addresses are recorded as
/// invited.
pub async fn add_member(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(workspace): Extension<Workspace>,
    Extension(caller): Extension<WorkspaceMember>,
    Json(payload): Json<AddWorkspaceMember>,
) -> Result<ResponseJson<ApiResponse<WorkspaceMember>>, ApiError> {
    require_admin(&caller)?;
    let pool = &deployment.db().pool;

    let email = payload.email.trim().to_lowercase();
    validation::require_length("email", &email, 3, 255)?;
    if !email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }

    if WorkspaceMember::find_by_email(pool, workspace.id, &email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "{email} is already a member of this workspace"
        )));
    }

    let user = User::find_by_email(pool, &email).await?;
    let member = WorkspaceMember::add(
        pool,
        workspace.id,
        &email,
        user.map(|u| u.id),
        payload.role,
        ctx.user.id,
    )
    .await?;

    tracing::info!(
        workspace = %workspace.public_id,
        member = %member.public_id,
        status = %member.status,
        "workspace member added"
    );
    Ok(ResponseJson(ApiResponse::success(member)))
}

/// DELETE /api/workspaces/{workspace_id}/members/{member_id}
pub async fn remove_member(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(workspace): Extension<Workspace>,
    Extension(caller): Extension<WorkspaceMember>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    require_admin(&caller)?;
    let member_id = public_id_param(&params, "member_id")?;
    let pool = &deployment.db().pool;

    let member = WorkspaceMember::find_by_public_id(pool, member_id)
        .await?
        .filter(|m| m.workspace_id == workspace.id)
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;
    if member.id == caller.id {
        return Err(ApiError::BadRequest(
            "You cannot remove yourself from a workspace".to_string(),
        ));
    }

    let rows_affected = WorkspaceMember::soft_delete(pool, member.id, ctx.user.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::Database(sqlx::Error::RowNotFound));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let workspace_router = Router::new()
        .route("/", get(get_workspace))
        .route("/members", get(list_members).post(add_member))
        .route("/members/{member_id}", delete(remove_member))
        .merge(boards::workspace_router())
        .merge(pages::workspace_router())
        .layer(from_fn_with_state(
            deployment.clone(),
            load_workspace_middleware,
        ));

    Router::new()
        .route("/workspaces", get(list_workspaces).post(create_workspace))
        .nest("/workspaces/{workspace_id}", workspace_router)
}
