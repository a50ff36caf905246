//! API entry point handler.

use std::sync::Arc;

use axum::{extract::Extension, http::HeaderMap, response::Response};
use ngsi_protocol::EntryPoint;

use super::{json, respond};
use crate::content_negotiation::check_json_accept;
use crate::operations::Operation;
use crate::state::AppState;

/// GET /v2 - Links to the main resources
pub async fn entry_point_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let result = check_json_accept(&headers)
        .map(|()| json(&EntryPoint::new(&state.config.api_root())));

    respond(Operation::EntryPoint, result)
}
