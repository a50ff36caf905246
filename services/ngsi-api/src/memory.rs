//! In-memory backend for entities and subscriptions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use ngsi_protocol::{
    Attribute, Entity, EntityQuery, NgsiError, NgsiResult, Paginated, Subscription,
    SubscriptionStatus,
};
use regex_lite::Regex;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::operations::{
    CreateEntity, CreateSubscription, ListEntities, ListSubscriptions, RemoveEntity,
    RemoveSubscription, RetrieveAttribute, RetrieveEntity, RetrieveSubscription, UpdateAttributes,
};

const ENTITY_NOT_FOUND: &str = "The requested entity has not been found. Check type and id";
const ATTRIBUTE_NOT_FOUND: &str = "The entity does not have such an attribute";
const SUBSCRIPTION_NOT_FOUND: &str = "The requested subscription has not been found. Check id";

/// Entities keyed by (id, type).
type EntityKey = (String, String);

/// Backend keeping everything in process memory.
///
/// Filters it cannot evaluate (`query`, geo-queries, `orderBy`) are
/// answered with `UnsupportedOption`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entities: RwLock<BTreeMap<EntityKey, Entity>>,
    subscriptions: RwLock<BTreeMap<String, Subscription>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend holding the given entities.
    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let entities = entities
            .into_iter()
            .map(|e| ((e.id.clone(), e.type_.clone()), e))
            .collect();
        Self {
            entities: RwLock::new(entities),
            subscriptions: RwLock::default(),
        }
    }

    /// Number of stored entities.
    pub async fn entity_count(&self) -> usize {
        self.entities.read().await.len()
    }
}

/// Find the single entity addressed by id (and type, if given).
fn locate(
    entities: &BTreeMap<EntityKey, Entity>,
    id: &str,
    type_: Option<&str>,
) -> NgsiResult<EntityKey> {
    let mut matches = entities
        .keys()
        .filter(|(entity_id, entity_type)| {
            entity_id == id && type_.map_or(true, |t| t == entity_type)
        });

    let first = matches
        .next()
        .cloned()
        .ok_or_else(|| NgsiError::not_found(ENTITY_NOT_FOUND))?;

    if matches.next().is_some() {
        return Err(NgsiError::conflicting_entities(
            id,
            format!("GET /v2/entities/{}?type={}", id, first.1),
        ));
    }

    Ok(first)
}

fn reject_unevaluated(query: &EntityQuery) -> NgsiResult<()> {
    if query.query.is_some() {
        return Err(NgsiError::UnsupportedOption("query".to_string()));
    }
    if query.geo.is_some() {
        return Err(NgsiError::UnsupportedOption("georel".to_string()));
    }
    if !query.order_by.is_empty() {
        return Err(NgsiError::UnsupportedOption("orderBy".to_string()));
    }
    Ok(())
}

fn compile_patterns(patterns: &[String]) -> NgsiResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|_| {
                NgsiError::BadRequest(format!("Invalid regex for idPattern: {}", pattern))
            })
        })
        .collect()
}

fn paginate<T>(items: impl Iterator<Item = T>, offset: usize, limit: usize) -> Paginated<T> {
    let mut total = 0u64;
    let mut window = Vec::new();
    for (index, item) in items.enumerate() {
        total += 1;
        if index >= offset && window.len() < limit {
            window.push(item);
        }
    }
    Paginated::new(window, offset, limit, total)
}

/// Mark a subscription expired once its expiry time has passed.
fn with_current_status(mut subscription: Subscription) -> Subscription {
    if subscription.is_expired_at(Utc::now()) {
        subscription.status = Some(SubscriptionStatus::Expired);
    }
    subscription
}

#[async_trait]
impl ListEntities for MemoryBackend {
    async fn list_entities(&self, query: EntityQuery) -> NgsiResult<Paginated<Entity>> {
        reject_unevaluated(&query)?;
        let patterns = compile_patterns(&query.id_patterns)?;

        let entities = self.entities.read().await;
        let matching = entities
            .values()
            .filter(|e| query.ids.is_empty() || query.ids.contains(&e.id))
            .filter(|e| patterns.is_empty() || patterns.iter().any(|p| p.is_match(&e.id)))
            .filter(|e| query.types.is_empty() || query.types.contains(&e.type_))
            .cloned()
            .map(|e| e.project(&query.attrs));

        let page = paginate(matching, query.offset, query.limit);
        debug!(items = page.len(), total = page.total, "Listed entities");
        Ok(page)
    }
}

#[async_trait]
impl CreateEntity for MemoryBackend {
    async fn create_entity(&self, entity: Entity) -> NgsiResult<()> {
        let key = (entity.id.clone(), entity.type_.clone());
        let mut entities = self.entities.write().await;

        if entities.contains_key(&key) {
            return Err(NgsiError::unprocessable("Already Exists"));
        }

        debug!(id = %entity.id, entity_type = %entity.type_, "Created entity");
        entities.insert(key, entity);
        Ok(())
    }
}

#[async_trait]
impl RetrieveEntity for MemoryBackend {
    async fn retrieve_entity(
        &self,
        id: &str,
        type_: Option<&str>,
        attrs: &[String],
    ) -> NgsiResult<Entity> {
        let entities = self.entities.read().await;
        let key = locate(&entities, id, type_)?;
        entities
            .get(&key)
            .cloned()
            .map(|e| e.project(attrs))
            .ok_or_else(|| NgsiError::not_found(ENTITY_NOT_FOUND))
    }
}

#[async_trait]
impl RemoveEntity for MemoryBackend {
    async fn remove_entity(&self, id: &str, type_: Option<&str>) -> NgsiResult<()> {
        let mut entities = self.entities.write().await;
        let key = locate(&entities, id, type_)?;
        entities.remove(&key);
        debug!(id, "Removed entity");
        Ok(())
    }
}

#[async_trait]
impl UpdateAttributes for MemoryBackend {
    async fn update_attributes(
        &self,
        id: &str,
        type_: Option<&str>,
        attributes: BTreeMap<String, Attribute>,
    ) -> NgsiResult<()> {
        let mut entities = self.entities.write().await;
        let key = locate(&entities, id, type_)?;

        let Some(stored) = entities.get_mut(&key) else {
            return Err(NgsiError::not_found(ENTITY_NOT_FOUND));
        };

        // Apply to a copy so a rejected name leaves the entity untouched.
        let mut updated = stored.clone();
        for (name, attribute) in attributes {
            updated.insert_attribute(name, attribute)?;
        }
        *stored = updated;
        Ok(())
    }
}

#[async_trait]
impl RetrieveAttribute for MemoryBackend {
    async fn retrieve_attribute(
        &self,
        id: &str,
        type_: Option<&str>,
        name: &str,
    ) -> NgsiResult<Attribute> {
        let entities = self.entities.read().await;
        let key = locate(&entities, id, type_)?;
        entities
            .get(&key)
            .and_then(|e| e.attribute(name))
            .cloned()
            .ok_or_else(|| NgsiError::not_found(ATTRIBUTE_NOT_FOUND))
    }
}

#[async_trait]
impl ListSubscriptions for MemoryBackend {
    async fn list_subscriptions(
        &self,
        offset: usize,
        limit: usize,
    ) -> NgsiResult<Paginated<Subscription>> {
        let subscriptions = self.subscriptions.read().await;
        let all = subscriptions.values().cloned().map(with_current_status);
        Ok(paginate(all, offset, limit))
    }
}

#[async_trait]
impl CreateSubscription for MemoryBackend {
    async fn create_subscription(&self, mut subscription: Subscription) -> NgsiResult<String> {
        subscription.validate()?;

        let id = Uuid::new_v4().simple().to_string();
        subscription.id = Some(id.clone());
        subscription.status.get_or_insert(SubscriptionStatus::Active);

        self.subscriptions
            .write()
            .await
            .insert(id.clone(), subscription);

        debug!(id = %id, "Created subscription");
        Ok(id)
    }
}

#[async_trait]
impl RetrieveSubscription for MemoryBackend {
    async fn retrieve_subscription(&self, id: &str) -> NgsiResult<Subscription> {
        self.subscriptions
            .read()
            .await
            .get(id)
            .cloned()
            .map(with_current_status)
            .ok_or_else(|| NgsiError::not_found(SUBSCRIPTION_NOT_FOUND))
    }
}

#[async_trait]
impl RemoveSubscription for MemoryBackend {
    async fn remove_subscription(&self, id: &str) -> NgsiResult<()> {
        self.subscriptions
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| NgsiError::not_found(SUBSCRIPTION_NOT_FOUND))
    }
}
