use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    Json,
};
use utoipa::OpenApi;

use super::{
    dto::{DevicesResponse, ErrorResponse, MessageResponse, QueryResponse, ReadingDto},
    AppState,
};
use crate::{
    error::Error,
    sensors::{
        ingest::NewReading,
        query::{QueryBody, QueryParams},
    },
};

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Store one reading uploaded by a device.
///
/// The body is parsed as JSON whatever its `Content-Type`. A missing
/// `uploaded_by` is filled from the configured request header, then from a
/// fixed default.
#[utoipa::path(
    post,
    path = "/sensors",
    request_body = NewReading,
    responses(
        (status = 200, description = "Reading stored", body = MessageResponse),
        (status = 400, description = "Malformed payload", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn ingest_reading(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MessageResponse>, Error> {
    let payload = NewReading::from_json(&body)?;
    let request_uploader = headers
        .get(&state.uploader_header)
        .and_then(|v| v.to_str().ok());

    state.service.ingest(payload, request_uploader).await?;

    Ok(Json(MessageResponse {
        message: "Sensor data received and saved successfully".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// List every distinct device id that has uploaded at least one reading.
#[utoipa::path(
    get,
    path = "/devices",
    responses(
        (status = 200, description = "Known devices", body = DevicesResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn list_devices(State(state): State<AppState>) -> Result<Json<DevicesResponse>, Error> {
    let devices = state.service.list_devices().await?;
    Ok(Json(DevicesResponse { devices }))
}

// ---------------------------------------------------------------------------
// Aggregation query
// ---------------------------------------------------------------------------

/// Filter readings and average their measurements.
///
/// All supplied filters must hold. `start_time`/`end_time` are inclusive
/// epoch seconds; `0` or non-numeric values leave that side unbounded.
/// Deployments configured with `QUERY_PARAMS_SOURCE=body` read the same
/// fields from a JSON body instead (see `query_readings_body`).
#[utoipa::path(
    get,
    path = "/sensor_query",
    params(QueryParams),
    responses(
        (status = 200, description = "Averages and matching readings", body = QueryResponse),
        (status = 400, description = "Malformed query string", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn query_readings(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<QueryResponse>, Error> {
    let Query(params) = params.map_err(|e| Error::Client(e.body_text()))?;
    let result = state.service.query(&params.into_filter()).await?;
    Ok(Json(result.into()))
}

/// Body-parameter variant of [`query_readings`]. An empty body applies no
/// filters.
pub async fn query_readings_body(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<QueryResponse>, Error> {
    let params = QueryBody::from_json(&body)?;
    let result = state.service.query(&params.into_filter()).await?;
    Ok(Json(result.into()))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` while the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = MessageResponse),
    ),
    tag = "system"
)]
pub async fn health() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Sensor backend server is running...".to_owned(),
    })
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(ingest_reading, list_devices, query_readings, health),
    components(schemas(
        NewReading,
        QueryBody,
        ReadingDto,
        QueryResponse,
        DevicesResponse,
        MessageResponse,
        ErrorResponse
    )),
    tags(
        (name = "sensors", description = "Sensor ingestion and query endpoints"),
        (name = "system",  description = "System endpoints"),
    ),
    info(
        title = "Sensor Ingest API",
        version = "0.1.0",
        description = "Ingestion and aggregation of environmental sensor readings"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
