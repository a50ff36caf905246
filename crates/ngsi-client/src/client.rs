//! HTTP transport for NGSI v2 operations.

use std::collections::BTreeMap;

use ngsi_protocol::query::{encode_params, page_params};
use ngsi_protocol::{
    media_types, Attribute, Entity, EntityQuery, EntryPoint, Paginated, RawResponse,
    Subscription, TOTAL_COUNT_HEADER,
};
use reqwest::header::{HeaderMap, ACCEPT, LOCATION};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Client for a single NGSI v2 broker.
#[derive(Debug, Clone)]
pub struct NgsiClient {
    http: Client,
    api_root: String,
}

impl NgsiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http,
            api_root: config.api_root(),
        })
    }

    /// GET /v2
    #[instrument(skip(self))]
    pub async fn entry_point(&self) -> ClientResult<EntryPoint> {
        let raw = self.send(self.http.get(&self.api_root)).await?;
        Ok(raw.decode()?)
    }

    /// GET /v2/entities
    #[instrument(skip(self, query), fields(offset = query.offset, limit = query.limit))]
    pub async fn list_entities(&self, query: &EntityQuery) -> ClientResult<Paginated<Entity>> {
        let url = with_query(
            format!("{}/entities", self.api_root),
            &query.to_query_string(),
        );
        let raw = self.send(self.http.get(url)).await?;
        let page = raw.decode_paginated(query.offset, query.limit)?;
        debug!(items = page.len(), total = page.total, "Listed entities");
        Ok(page)
    }

    /// GET /v2/entities/{id}
    #[instrument(skip(self, attrs))]
    pub async fn get_entity(
        &self,
        id: &str,
        type_: Option<&str>,
        attrs: &[String],
    ) -> ClientResult<Entity> {
        let mut params = type_params(type_);
        if !attrs.is_empty() {
            params.push(("attrs", attrs.join(",")));
        }
        let url = with_query(self.entity_url(id), &encode_params(&params));
        let raw = self.send(self.http.get(url)).await?;
        Ok(raw.decode()?)
    }

    /// POST /v2/entities
    #[instrument(skip(self, entity), fields(id = %entity.id, entity_type = %entity.type_))]
    pub async fn create_entity(&self, entity: &Entity) -> ClientResult<()> {
        let url = format!("{}/entities", self.api_root);
        let raw = self.send(self.http.post(url).json(entity)).await?;
        raw.error_for_status()?;
        debug!(location = ?raw.location, "Created entity");
        Ok(())
    }

    /// POST /v2/entities/{id}/attrs
    #[instrument(skip(self, attributes))]
    pub async fn update_attributes(
        &self,
        id: &str,
        type_: Option<&str>,
        attributes: &BTreeMap<String, Attribute>,
    ) -> ClientResult<()> {
        let url = with_query(
            format!("{}/attrs", self.entity_url(id)),
            &encode_params(&type_params(type_)),
        );
        let raw = self.send(self.http.post(url).json(attributes)).await?;
        raw.error_for_status()?;
        Ok(())
    }

    /// DELETE /v2/entities/{id}
    #[instrument(skip(self))]
    pub async fn delete_entity(&self, id: &str, type_: Option<&str>) -> ClientResult<()> {
        let url = with_query(self.entity_url(id), &encode_params(&type_params(type_)));
        let raw = self.send(self.http.delete(url)).await?;
        raw.error_for_status()?;
        Ok(())
    }

    /// GET /v2/entities/{id}/attrs/{name}
    #[instrument(skip(self))]
    pub async fn get_attribute(
        &self,
        id: &str,
        type_: Option<&str>,
        name: &str,
    ) -> ClientResult<Attribute> {
        let url = with_query(
            format!(
                "{}/attrs/{}",
                self.entity_url(id),
                urlencoding::encode(name)
            ),
            &encode_params(&type_params(type_)),
        );
        let raw = self.send(self.http.get(url)).await?;
        Ok(raw.decode()?)
    }

    /// GET /v2/subscriptions
    #[instrument(skip(self))]
    pub async fn list_subscriptions(
        &self,
        offset: usize,
        limit: usize,
        count: bool,
    ) -> ClientResult<Paginated<Subscription>> {
        let url = with_query(
            format!("{}/subscriptions", self.api_root),
            &encode_params(&page_params(offset, limit, count)),
        );
        let raw = self.send(self.http.get(url)).await?;
        Ok(raw.decode_paginated(offset, limit)?)
    }

    /// POST /v2/subscriptions, returning the new subscription id.
    #[instrument(skip(self, subscription))]
    pub async fn create_subscription(&self, subscription: &Subscription) -> ClientResult<String> {
        let url = format!("{}/subscriptions", self.api_root);
        let raw = self.send(self.http.post(url).json(subscription)).await?;
        raw.error_for_status()?;

        let id = raw
            .location
            .as_deref()
            .and_then(|location| location.rsplit('/').next())
            .filter(|id| !id.is_empty())
            .ok_or(ClientError::MissingLocation("subscription"))?;

        debug!(id = %id, "Created subscription");
        Ok(id.to_string())
    }

    /// GET /v2/subscriptions/{id}
    #[instrument(skip(self))]
    pub async fn get_subscription(&self, id: &str) -> ClientResult<Subscription> {
        let raw = self.send(self.http.get(self.subscription_url(id))).await?;
        Ok(raw.decode()?)
    }

    /// DELETE /v2/subscriptions/{id}
    #[instrument(skip(self))]
    pub async fn delete_subscription(&self, id: &str) -> ClientResult<()> {
        let raw = self.send(self.http.delete(self.subscription_url(id))).await?;
        raw.error_for_status()?;
        Ok(())
    }

    fn entity_url(&self, id: &str) -> String {
        format!("{}/entities/{}", self.api_root, urlencoding::encode(id))
    }

    fn subscription_url(&self, id: &str) -> String {
        format!("{}/subscriptions/{}", self.api_root, urlencoding::encode(id))
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<RawResponse> {
        let response = request.header(ACCEPT, media_types::JSON).send().await?;
        let raw = into_raw(response).await?;
        debug!(status = raw.status, "Broker responded");
        Ok(raw)
    }
}

fn type_params(type_: Option<&str>) -> Vec<(&'static str, String)> {
    type_
        .map(|t| vec![("type", t.to_string())])
        .unwrap_or_default()
}

fn with_query(url: String, query: &str) -> String {
    if query.is_empty() {
        url
    } else {
        format!("{}?{}", url, query)
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn into_raw(response: Response) -> Result<RawResponse, ClientError> {
    let status = response.status();
    let total_count = header_value(response.headers(), TOTAL_COUNT_HEADER);
    let location = header_value(response.headers(), LOCATION.as_str());
    let body = response.bytes().await?;

    Ok(RawResponse {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        total_count,
        location,
        body,
    })
}
