//! HTTP request handlers for the NGSI API.

pub mod entities;
pub mod entry_point;
pub mod health;
pub mod subscriptions;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use ngsi_protocol::{NgsiError, NgsiResult, Paginated};
use serde::Serialize;
use tracing::{debug, warn};

use crate::operations::Operation;

/// Record the outcome of an operation and render it.
pub(crate) fn respond(operation: Operation, result: NgsiResult<Response>) -> Response {
    counter!("ngsi_requests_total", "operation" => operation.as_str()).increment(1);

    match result {
        Ok(response) => response,
        Err(err) => {
            if err.status_code() >= 500 && err.status_code() != 501 {
                warn!(operation = %operation, error = %err, "Request failed");
            } else {
                debug!(operation = %operation, error = %err, "Request rejected");
            }
            error_response(&err)
        }
    }
}

/// Render an error as the wire error body with its HTTP status.
pub fn error_response(err: &NgsiError) -> Response {
    counter!("ngsi_errors_total", "code" => err.code()).increment(1);

    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, Json(err.to_error_body())).into_response()
}

pub(crate) fn query_rejection(rejection: QueryRejection) -> NgsiError {
    NgsiError::BadRequest(rejection.body_text())
}

pub(crate) fn json_rejection(rejection: JsonRejection) -> NgsiError {
    NgsiError::BadRequest(rejection.body_text())
}

/// 200 with a JSON body.
pub(crate) fn json<T: Serialize>(value: &T) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

/// 200 with the page items, plus the total count header when requested.
pub(crate) fn paginated<T: Serialize>(page: &Paginated<T>, count: bool) -> Response {
    let mut response = json(&page.items);
    if count {
        response.headers_mut().insert(
            HeaderName::from_static("x-total-count"),
            HeaderValue::from(page.total),
        );
    }
    response
}

/// 201 pointing at the created resource.
pub(crate) fn created(location: &str) -> NgsiResult<Response> {
    let location = HeaderValue::from_str(location)
        .map_err(|_| NgsiError::InternalError(format!("Invalid location: {}", location)))?;

    Ok((StatusCode::CREATED, [(header::LOCATION, location)]).into_response())
}

/// 204 without a body.
pub(crate) fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
