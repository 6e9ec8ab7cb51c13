use axum::{
    Router,
    http::{Request, header::HeaderName},
    middleware::from_fn_with_state,
    routing::{IntoMakeService, get},
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::{DefaultOnFailure, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, field};

use crate::{
    DeploymentImpl,
    middleware::{optional_user, require_user},
};

pub mod boards;
pub mod cards;
pub mod checklists;
pub mod health;
pub mod lists;
pub mod pages;
pub mod sse;
pub mod validation;
pub mod workspaces;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// The `/api` tree with every middleware layer, ready to serve or to drive
/// with `oneshot` in tests.
pub fn app(deployment: &DeploymentImpl) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let request_id = request
                .extensions()
                .get::<RequestId>()
                .and_then(|id| id.header_value().to_str().ok());
            let span = tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = field::Empty
            );
            if let Some(request_id) = request_id {
                span.record("request_id", field::display(request_id));
            }
            span
        })
        .on_response(DefaultOnResponse::new().level(Level::INFO))
        .on_failure(DefaultOnFailure::new().level(Level::ERROR));

    let protected = Router::<DeploymentImpl>::new()
        .merge(workspaces::router(deployment))
        .merge(boards::router(deployment))
        .merge(lists::router(deployment))
        .merge(cards::router(deployment))
        .merge(checklists::router(deployment))
        .merge(pages::router(deployment))
        .route_layer(from_fn_with_state(deployment.clone(), require_user));

    // Readable without a token; a token that is present must still be valid.
    let public = Router::<DeploymentImpl>::new()
        .merge(boards::public_router())
        .merge(pages::public_router())
        .route_layer(from_fn_with_state(deployment.clone(), optional_user));

    let api = Router::<DeploymentImpl>::new()
        .route("/health", get(health::health_check))
        .merge(protected)
        .merge(public);

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            MakeRequestUuid,
        ))
        .with_state(deployment.clone())
}

pub fn router(deployment: DeploymentImpl) -> IntoMakeService<Router> {
    app(&deployment).into_make_service()
}
