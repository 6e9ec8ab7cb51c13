use std::collections::HashMap;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{
    page::{
        CreatePage, CreateTagLike, Page, PageDetail, PageLabel, PageSummary, PageTag, PageTagRef,
        UpdatePage, UpdateTagLike,
    },
    visibility::Visibility,
    workspace::Workspace,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::access::assert_user_in_workspace;
use ts_rs::TS;
use utils::response::ApiResponse;

use super::{boards::SlugAvailability, validation};
use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{
        OptionalUser, RequestContext, load_page_label_middleware, load_page_middleware,
        load_page_tag_middleware, model_loaders::public_id_param,
    },
};

const DESCRIPTION_MAX: usize = 20_000;
const SLUG_MIN: usize = 3;
const SLUG_MAX: usize = 60;
const COLOUR_MAX: usize = 12;

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct PageSlugQuery {
    pub page_slug: String,
}

fn validate_tag_like(name: Option<&str>, colour_code: Option<&str>) -> Result<(), ApiError> {
    if let Some(name) = name {
        validation::require_length("name", name, 1, usize::MAX)?;
    }
    if let Some(colour) = colour_code {
        validation::require_length("colourCode", colour, 0, COLOUR_MAX)?;
    }
    Ok(())
}

/// Private pages need a member of the page's workspace; public pages are
/// readable by anyone.
async fn ensure_readable(
    deployment: &DeploymentImpl,
    page: &Page,
    viewer: &OptionalUser,
) -> Result<(), ApiError> {
    if page.visibility == Visibility::Public {
        return Ok(());
    }
    let Some(user) = viewer.0.as_ref() else {
        return Err(ApiError::Unauthorized);
    };
    assert_user_in_workspace(&deployment.db().pool, user.id, page.workspace_id, false).await?;
    Ok(())
}

/// GET /api/workspaces/{workspace_id}/pages - newest first
pub async fn list_pages(
    State(deployment): State<DeploymentImpl>,
    Extension(workspace): Extension<Workspace>,
) -> Result<ResponseJson<ApiResponse<Vec<PageSummary>>>, ApiError> {
    let pages = Page::find_all_by_workspace(&deployment.db().pool, workspace.id).await?;
    Ok(ResponseJson(ApiResponse::success(pages)))
}

/// POST /api/workspaces/{workspace_id}/pages
pub async fn create_page(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(workspace): Extension<Workspace>,
    Json(payload): Json<CreatePage>,
) -> Result<ResponseJson<ApiResponse<Page>>, ApiError> {
    validation::require_length("title", &payload.title, 1, usize::MAX)?;
    if let Some(description) = payload.description.as_deref() {
        validation::require_length("description", description, 0, DESCRIPTION_MAX)?;
    }

    let page = Page::create(&deployment.db().pool, workspace.id, &payload, ctx.user.id).await?;
    tracing::info!(page = %page.public_id, workspace = %workspace.public_id, "page created");
    Ok(ResponseJson(ApiResponse::success(page)))
}

/// GET /api/pages/{page_id}
pub async fn get_page(
    State(deployment): State<DeploymentImpl>,
    Extension(viewer): Extension<OptionalUser>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<PageDetail>>, ApiError> {
    let page_id = public_id_param(&params, "page_id")?;
    let pool = &deployment.db().pool;

    let page = Page::find_by_public_id(pool, page_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Page with public ID {page_id} not found")))?;
    ensure_readable(&deployment, &page, &viewer).await?;

    let detail = Page::detail(pool, page).await?;
    Ok(ResponseJson(ApiResponse::success(detail)))
}

/// GET /api/pages/slug/{page_slug}
pub async fn get_page_by_slug(
    State(deployment): State<DeploymentImpl>,
    Extension(viewer): Extension<OptionalUser>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<PageDetail>>, ApiError> {
    let slug = params.get("page_slug").map(String::as_str).unwrap_or("");
    validation::require_length("pageSlug", slug, SLUG_MIN, SLUG_MAX)?;
    let pool = &deployment.db().pool;

    let page = Page::find_by_slug(pool, slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Page not found".to_string()))?;
    ensure_readable(&deployment, &page, &viewer).await?;

    let detail = Page::detail(pool, page).await?;
    Ok(ResponseJson(ApiResponse::success(detail)))
}

/// PUT /api/pages/{page_id}
pub async fn update_page(
    State(deployment): State<DeploymentImpl>,
    Extension(page): Extension<Page>,
    Json(payload): Json<UpdatePage>,
) -> Result<ResponseJson<ApiResponse<Page>>, ApiError> {
    let pool = &deployment.db().pool;
    if let Some(title) = payload.title.as_deref() {
        validation::require_length("title", title, 1, usize::MAX)?;
    }
    if let Some(description) = payload.description.as_deref() {
        validation::require_length("description", description, 0, DESCRIPTION_MAX)?;
    }

    let slug = payload.slug.as_deref().map(str::to_lowercase);
    if let Some(slug) = slug.as_deref() {
        validation::require_slug("slug", slug, SLUG_MIN, SLUG_MAX)?;
        if !Page::is_slug_available(pool, slug, Some(page.id)).await? {
            return Err(ApiError::BadRequest(format!(
                "Page slug {slug} is not available"
            )));
        }
    }

    let changes = UpdatePage { slug, ..payload };
    let updated = Page::update(pool, page.id, &changes).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/pages/{page_id}
pub async fn delete_page(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(page): Extension<Page>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Page::soft_delete(&deployment.db().pool, page.id, ctx.user.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::Internal("Failed to delete page".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// GET /api/pages/{page_id}/check-slug-availability?pageSlug=
pub async fn check_slug_availability(
    State(deployment): State<DeploymentImpl>,
    Extension(page): Extension<Page>,
    Query(query): Query<PageSlugQuery>,
) -> Result<ResponseJson<ApiResponse<SlugAvailability>>, ApiError> {
    validation::require_slug("pageSlug", &query.page_slug, SLUG_MIN, SLUG_MAX)?;
    let available =
        Page::is_slug_available(&deployment.db().pool, &query.page_slug, Some(page.id)).await?;
    Ok(ResponseJson(ApiResponse::success(SlugAvailability {
        is_reserved: !available,
    })))
}

/// POST /api/pages/{page_id}/tags
pub async fn create_tag(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(page): Extension<Page>,
    Json(payload): Json<CreateTagLike>,
) -> Result<ResponseJson<ApiResponse<PageTag>>, ApiError> {
    validate_tag_like(Some(&payload.name), payload.colour_code.as_deref())?;
    let tag = PageTag::create(&deployment.db().pool, page.id, &payload, ctx.user.id).await?;
    Ok(ResponseJson(ApiResponse::success(tag)))
}

/// PUT /api/pages/tags/{tag_id}
pub async fn update_tag(
    State(deployment): State<DeploymentImpl>,
    Extension(tag): Extension<PageTagRef>,
    Json(payload): Json<UpdateTagLike>,
) -> Result<ResponseJson<ApiResponse<PageTag>>, ApiError> {
    validate_tag_like(payload.name.as_deref(), payload.colour_code.as_deref())?;
    let updated = PageTag::update(&deployment.db().pool, tag.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/pages/tags/{tag_id}
pub async fn delete_tag(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(tag): Extension<PageTagRef>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = PageTag::soft_delete(&deployment.db().pool, tag.id, ctx.user.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::Internal("Failed to delete tag".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// GET /api/workspaces/{workspace_id}/page-labels
pub async fn list_labels(
    State(deployment): State<DeploymentImpl>,
    Extension(workspace): Extension<Workspace>,
) -> Result<ResponseJson<ApiResponse<Vec<PageLabel>>>, ApiError> {
    let labels = PageLabel::find_by_workspace(&deployment.db().pool, workspace.id).await?;
    Ok(ResponseJson(ApiResponse::success(labels)))
}

/// POST /api/workspaces/{workspace_id}/page-labels
pub async fn create_label(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(workspace): Extension<Workspace>,
    Json(payload): Json<CreateTagLike>,
) -> Result<ResponseJson<ApiResponse<PageLabel>>, ApiError> {
    validate_tag_like(Some(&payload.name), payload.colour_code.as_deref())?;
    let label =
        PageLabel::create(&deployment.db().pool, workspace.id, &payload, ctx.user.id).await?;
    Ok(ResponseJson(ApiResponse::success(label)))
}

/// PUT /api/page-labels/{label_id}
pub async fn update_label(
    State(deployment): State<DeploymentImpl>,
    Extension(label): Extension<PageLabel>,
    Json(payload): Json<UpdateTagLike>,
) -> Result<ResponseJson<ApiResponse<PageLabel>>, ApiError> {
    validate_tag_like(payload.name.as_deref(), payload.colour_code.as_deref())?;
    let updated = PageLabel::update(&deployment.db().pool, label.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/page-labels/{label_id}
pub async fn delete_label(
    State(deployment): State<DeploymentImpl>,
    Extension(ctx): Extension<RequestContext>,
    Extension(label): Extension<PageLabel>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected =
        PageLabel::soft_delete(&deployment.db().pool, label.id, ctx.user.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::Internal("Failed to delete label".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// PUT /api/pages/{page_id}/labels/{label_id}
pub async fn attach_label(
    State(deployment): State<DeploymentImpl>,
    Extension(page): Extension<Page>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let label_id = public_id_param(&params, "label_id")?;
    let pool = &deployment.db().pool;

    let label = PageLabel::find_by_public_id(pool, label_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Label not found".to_string()))?;
    if label.workspace_id != page.workspace_id {
        return Err(ApiError::Forbidden("Label not in workspace".to_string()));
    }

    PageLabel::attach(pool, page.id, label.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// DELETE /api/pages/{page_id}/labels/{label_id}
///
/// Unknown labels and labels from other workspaces are a no-op.
pub async fn detach_label(
    State(deployment): State<DeploymentImpl>,
    Extension(page): Extension<Page>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let label_id = public_id_param(&params, "label_id")?;
    let pool = &deployment.db().pool;

    if let Some(label) = PageLabel::find_by_public_id(pool, label_id).await?
        && label.workspace_id == page.workspace_id
    {
        PageLabel::detach(pool, page.id, label.id).await?;
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Routes nested under a loaded workspace.
pub fn workspace_router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/pages", get(list_pages).post(create_page))
        .route("/page-labels", get(list_labels).post(create_label))
}

pub fn public_router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/pages/{page_id}", get(get_page))
        .route("/pages/slug/{page_slug}", get(get_page_by_slug))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let page_router = Router::new()
        .route("/", put(update_page).delete(delete_page))
        .route("/check-slug-availability", get(check_slug_availability))
        .route("/tags", post(create_tag))
        .route("/labels/{label_id}", put(attach_label).delete(detach_label))
        .layer(from_fn_with_state(deployment.clone(), load_page_middleware));

    let tag_router = Router::new()
        .route("/", put(update_tag).delete(delete_tag))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_page_tag_middleware,
        ));

    let label_router = Router::new()
        .route("/", put(update_label).delete(delete_label))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_page_label_middleware,
        ));

    Router::new()
        .nest("/pages/tags/{tag_id}", tag_router)
        .nest("/pages/{page_id}", page_router)
        .nest("/page-labels/{label_id}", label_router)
}
