//! Entity endpoint handlers.

use std::collections::BTreeMap;
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
use ngsi_protocol::validation::{check_fields, check_syntax};
use ngsi_protocol::{Attribute, Entity, EntityParams, NgsiError, NgsiResult};
use serde::Deserialize;

use super::{created, json, json_rejection, no_content, paginated, query_rejection, respond};
use crate::content_negotiation::check_json_accept;
use crate::operations::Operation;
use crate::state::AppState;

/// Parameters addressing a single entity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupParams {
    #[serde(rename = "type")]
    pub type_: Option<String>,

    pub attrs: Option<String>,
}

impl LookupParams {
    fn validate(&self) -> NgsiResult<()> {
        check_fields(self.type_.as_deref())?;
        check_syntax(self.attrs.as_deref())
    }

    fn entity_type(&self) -> Option<&str> {
        self.type_.as_deref().filter(|t| !t.is_empty())
    }

    fn attr_list(&self) -> Vec<String> {
        self.attrs
            .as_deref()
            .filter(|a| !a.is_empty())
            .map(|a| a.split(',').map(str::to_string).collect())
            .unwrap_or_default()
    }
}

fn lookup(params: Result<Query<LookupParams>, QueryRejection>) -> NgsiResult<LookupParams> {
    let Query(params) = params.map_err(query_rejection)?;
    params.validate()?;
    Ok(params)
}

/// GET /v2/entities - List entities matching the filter
pub async fn list_entities_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<EntityParams>, QueryRejection>,
) -> Response {
    respond(
        Operation::ListEntities,
        list_entities(&state, &headers, params).await,
    )
}

async fn list_entities(
    state: &AppState,
    headers: &HeaderMap,
    params: Result<Query<EntityParams>, QueryRejection>,
) -> NgsiResult<Response> {
    check_json_accept(headers)?;
    let Query(params) = params.map_err(query_rejection)?;

    let mut query = params.into_query()?;
    query.limit = state.config.pagination.resolve_limit(query.limit)?;
    let count = query.count;

    let page = state.handlers.list_entities.list_entities(query).await?;
    Ok(paginated(&page, count))
}

/// POST /v2/entities - Create an entity
pub async fn create_entity_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Entity>, JsonRejection>,
) -> Response {
    respond(
        Operation::CreateEntity,
        create_entity(&state, &headers, body).await,
    )
}

async fn create_entity(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Json<Entity>, JsonRejection>,
) -> NgsiResult<Response> {
    check_json_accept(headers)?;
    let Json(entity) = body.map_err(json_rejection)?;

    if entity.type_.is_empty() {
        return Err(NgsiError::BadRequest("entity type is missing".to_string()));
    }
    check_fields(
        [entity.id.as_str(), entity.type_.as_str()]
            .into_iter()
            .chain(entity.attributes().keys().map(String::as_str)),
    )?;

    let location = format!("/v2/entities/{}?type={}", entity.id, entity.type_);
    state.handlers.create_entity.create_entity(entity).await?;
    created(&location)
}

/// GET /v2/entities/:id - Retrieve one entity
pub async fn retrieve_entity_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    params: Result<Query<LookupParams>, QueryRejection>,
) -> Response {
    respond(
        Operation::RetrieveEntity,
        retrieve_entity(&state, &id, &headers, params).await,
    )
}

async fn retrieve_entity(
    state: &AppState,
    id: &str,
    headers: &HeaderMap,
    params: Result<Query<LookupParams>, QueryRejection>,
) -> NgsiResult<Response> {
    check_json_accept(headers)?;
    let params = lookup(params)?;
    check_fields([id])?;

    let entity = state
        .handlers
        .retrieve_entity
        .retrieve_entity(id, params.entity_type(), &params.attr_list())
        .await?;
    Ok(json(&entity))
}

/// DELETE /v2/entities/:id - Remove one entity
pub async fn remove_entity_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    params: Result<Query<LookupParams>, QueryRejection>,
) -> Response {
    respond(
        Operation::RemoveEntity,
        remove_entity(&state, &id, &headers, params).await,
    )
}

async fn remove_entity(
    state: &AppState,
    id: &str,
    headers: &HeaderMap,
    params: Result<Query<LookupParams>, QueryRejection>,
) -> NgsiResult<Response> {
    check_json_accept(headers)?;
    let params = lookup(params)?;
    check_fields([id])?;

    state
        .handlers
        .remove_entity
        .remove_entity(id, params.entity_type())
        .await?;
    Ok(no_content())
}

/// POST /v2/entities/:id/attrs - Append or replace attributes
pub async fn update_attributes_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    params: Result<Query<LookupParams>, QueryRejection>,
    body: Result<Json<BTreeMap<String, Attribute>>, JsonRejection>,
) -> Response {
    respond(
        Operation::UpdateAttributes,
        update_attributes(&state, &id, &headers, params, body).await,
    )
}

async fn update_attributes(
    state: &AppState,
    id: &str,
    headers: &HeaderMap,
    params: Result<Query<LookupParams>, QueryRejection>,
    body: Result<Json<BTreeMap<String, Attribute>>, JsonRejection>,
) -> NgsiResult<Response> {
    check_json_accept(headers)?;
    let params = lookup(params)?;
    check_fields([id])?;
    let Json(attributes) = body.map_err(json_rejection)?;

    if attributes.is_empty() {
        return Err(NgsiError::BadRequest("empty payload".to_string()));
    }
    check_fields(attributes.keys().map(String::as_str))?;

    state
        .handlers
        .update_attributes
        .update_attributes(id, params.entity_type(), attributes)
        .await?;
    Ok(no_content())
}

/// GET /v2/entities/:id/attrs/:attr - Retrieve one attribute
pub async fn retrieve_attribute_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((id, name)): Path<(String, String)>,
    headers: HeaderMap,
    params: Result<Query<LookupParams>, QueryRejection>,
) -> Response {
    respond(
        Operation::RetrieveAttribute,
        retrieve_attribute(&state, &id, &name, &headers, params).await,
    )
}

async fn retrieve_attribute(
    state: &AppState,
    id: &str,
    name: &str,
    headers: &HeaderMap,
    params: Result<Query<LookupParams>, QueryRejection>,
) -> NgsiResult<Response> {
    check_json_accept(headers)?;
    let params = lookup(params)?;
    check_fields([id, name])?;

    let attribute = state
        .handlers
        .retrieve_attribute
        .retrieve_attribute(id, params.entity_type(), name)
        .await?;
    Ok(json(&attribute))
}
