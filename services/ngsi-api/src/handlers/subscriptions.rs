//! Subscription endpoint handlers.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::HeaderMap,
    response::Response,
    Json,
};
use ngsi_protocol::validation::{check_fields, PageParams};
use ngsi_protocol::{NgsiResult, Subscription};

use super::{created, json, json_rejection, no_content, paginated, query_rejection, respond};
use crate::content_negotiation::check_json_accept;
use crate::operations::Operation;
use crate::state::AppState;

/// GET /v2/subscriptions - List subscriptions
pub async fn list_subscriptions_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Response {
    respond(
        Operation::ListSubscriptions,
        list_subscriptions(&state, &headers, params).await,
    )
}

async fn list_subscriptions(
    state: &AppState,
    headers: &HeaderMap,
    params: Result<Query<PageParams>, QueryRejection>,
) -> NgsiResult<Response> {
    check_json_accept(headers)?;
    let Query(params) = params.map_err(query_rejection)?;

    let (offset, limit, count) = params.into_page()?;
    let limit = state.config.pagination.resolve_limit(limit)?;

    let page = state
        .handlers
        .list_subscriptions
        .list_subscriptions(offset, limit)
        .await?;
    Ok(paginated(&page, count))
}

/// POST /v2/subscriptions - Create a subscription
pub async fn create_subscription_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Subscription>, JsonRejection>,
) -> Response {
    respond(
        Operation::CreateSubscription,
        create_subscription(&state, &headers, body).await,
    )
}

async fn create_subscription(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Json<Subscription>, JsonRejection>,
) -> NgsiResult<Response> {
    check_json_accept(headers)?;
    let Json(subscription) = body.map_err(json_rejection)?;
    subscription.validate()?;

    let id = state
        .handlers
        .create_subscription
        .create_subscription(subscription)
        .await?;
    created(&format!("/v2/subscriptions/{}", id))
}

/// GET /v2/subscriptions/:id - Retrieve one subscription
pub async fn retrieve_subscription_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    respond(
        Operation::RetrieveSubscription,
        retrieve_subscription(&state, &id, &headers).await,
    )
}

async fn retrieve_subscription(
    state: &AppState,
    id: &str,
    headers: &HeaderMap,
) -> NgsiResult<Response> {
    check_json_accept(headers)?;
    check_fields([id])?;

    let subscription = state
        .handlers
        .retrieve_subscription
        .retrieve_subscription(id)
        .await?;
    Ok(json(&subscription))
}

/// DELETE /v2/subscriptions/:id - Remove one subscription
pub async fn remove_subscription_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    respond(
        Operation::RemoveSubscription,
        remove_subscription(&state, &id, &headers).await,
    )
}

async fn remove_subscription(
    state: &AppState,
    id: &str,
    headers: &HeaderMap,
) -> NgsiResult<Response> {
    check_json_accept(headers)?;
    check_fields([id])?;

    state
        .handlers
        .remove_subscription
        .remove_subscription(id)
        .await?;
    Ok(no_content())
}
