use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use super::dto::ErrorResponse;
use crate::error::Error;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Client(msg) => {
                warn!(error = %msg, "Rejected request");
                StatusCode::BAD_REQUEST
            }
            Error::Store(e) => {
                error!(error = %e, "Store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
