pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    body::Body,
    http::{HeaderName, Method, StatusCode},
    middleware,
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    config::{ApiConfig, QuerySource},
    sensors::SensorService,
};
use handlers::ApiDoc;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: SensorService,
    pub uploader_header: HeaderName,
}

pub fn router(service: SensorService, config: &ApiConfig) -> Router {
    let state = AppState {
        service,
        uploader_header: config.uploader_header.clone(),
    };

    let query_route = match config.query_source {
        QuerySource::QueryString => get(handlers::query_readings),
        QuerySource::JsonBody => get(handlers::query_readings_body),
    };

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route(&config.ingest_path, post(handlers::ingest_reading))
        .route("/devices", get(handlers::list_devices))
        .route(&config.query_path, query_route)
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(middleware::map_response(options_no_content))
}

/// Every `OPTIONS` request is answered with an empty 204, keeping the CORS
/// headers the layer above attached.
async fn options_no_content(method: Method, response: Response) -> Response {
    if method != Method::OPTIONS {
        return response;
    }
    let (mut parts, _) = response.into_parts();
    parts.status = StatusCode::NO_CONTENT;
    parts.headers.remove(axum::http::header::CONTENT_TYPE);
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::empty())
}
