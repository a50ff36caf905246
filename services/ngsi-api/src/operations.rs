//! Per-operation handler traits and the registry the router dispatches through.
//!
//! A backend implements the operations it supports. Every operation it does
//! not supply stays registered with [`Unsupported`], which answers
//! `501 UnsupportedOperation` naming the operation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ngsi_protocol::{
    Attribute, Entity, EntityQuery, NgsiError, NgsiResult, Paginated, Subscription,
};

/// Operations served under `/v2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    EntryPoint,
    ListEntities,
    CreateEntity,
    RetrieveEntity,
    RemoveEntity,
    UpdateAttributes,
    RetrieveAttribute,
    ListSubscriptions,
    CreateSubscription,
    RetrieveSubscription,
    RemoveSubscription,
}

impl Operation {
    /// Name used in error descriptions and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::EntryPoint => "entryPoint",
            Operation::ListEntities => "listEntities",
            Operation::CreateEntity => "createEntity",
            Operation::RetrieveEntity => "retrieveEntity",
            Operation::RemoveEntity => "removeEntity",
            Operation::UpdateAttributes => "updateAttributes",
            Operation::RetrieveAttribute => "retrieveAttribute",
            Operation::ListSubscriptions => "listSubscriptions",
            Operation::CreateSubscription => "createSubscription",
            Operation::RetrieveSubscription => "retrieveSubscription",
            Operation::RemoveSubscription => "removeSubscription",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait ListEntities: Send + Sync {
    /// Return one page of matching entities and the total number of matches.
    async fn list_entities(&self, query: EntityQuery) -> NgsiResult<Paginated<Entity>>;
}

#[async_trait]
pub trait CreateEntity: Send + Sync {
    async fn create_entity(&self, entity: Entity) -> NgsiResult<()>;
}

#[async_trait]
pub trait RetrieveEntity: Send + Sync {
    async fn retrieve_entity(
        &self,
        id: &str,
        type_: Option<&str>,
        attrs: &[String],
    ) -> NgsiResult<Entity>;
}

#[async_trait]
pub trait RemoveEntity: Send + Sync {
    async fn remove_entity(&self, id: &str, type_: Option<&str>) -> NgsiResult<()>;
}

#[async_trait]
pub trait UpdateAttributes: Send + Sync {
    /// Append new attributes and replace existing ones.
    async fn update_attributes(
        &self,
        id: &str,
        type_: Option<&str>,
        attributes: BTreeMap<String, Attribute>,
    ) -> NgsiResult<()>;
}

#[async_trait]
pub trait RetrieveAttribute: Send + Sync {
    async fn retrieve_attribute(
        &self,
        id: &str,
        type_: Option<&str>,
        name: &str,
    ) -> NgsiResult<Attribute>;
}

#[async_trait]
pub trait ListSubscriptions: Send + Sync {
    async fn list_subscriptions(
        &self,
        offset: usize,
        limit: usize,
    ) -> NgsiResult<Paginated<Subscription>>;
}

#[async_trait]
pub trait CreateSubscription: Send + Sync {
    /// Store the subscription and return its new id.
    async fn create_subscription(&self, subscription: Subscription) -> NgsiResult<String>;
}

#[async_trait]
pub trait RetrieveSubscription: Send + Sync {
    async fn retrieve_subscription(&self, id: &str) -> NgsiResult<Subscription>;
}

#[async_trait]
pub trait RemoveSubscription: Send + Sync {
    async fn remove_subscription(&self, id: &str) -> NgsiResult<()>;
}

/// Handler registered for every operation nobody implements.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl Unsupported {
    fn reject<T>(operation: Operation) -> NgsiResult<T> {
        Err(NgsiError::UnsupportedOperation(operation.as_str().to_string()))
    }
}

#[async_trait]
impl ListEntities for Unsupported {
    async fn list_entities(&self, _query: EntityQuery) -> NgsiResult<Paginated<Entity>> {
        Self::reject(Operation::ListEntities)
    }
}

#[async_trait]
impl CreateEntity for Unsupported {
    async fn create_entity(&self, _entity: Entity) -> NgsiResult<()> {
        Self::reject(Operation::CreateEntity)
    }
}

#[async_trait]
impl RetrieveEntity for Unsupported {
    async fn retrieve_entity(
        &self,
        _id: &str,
        _type: Option<&str>,
        _attrs: &[String],
    ) -> NgsiResult<Entity> {
        Self::reject(Operation::RetrieveEntity)
    }
}

#[async_trait]
impl RemoveEntity for Unsupported {
    async fn remove_entity(&self, _id: &str, _type: Option<&str>) -> NgsiResult<()> {
        Self::reject(Operation::RemoveEntity)
    }
}

#[async_trait]
impl UpdateAttributes for Unsupported {
    async fn update_attributes(
        &self,
        _id: &str,
        _type: Option<&str>,
        _attributes: BTreeMap<String, Attribute>,
    ) -> NgsiResult<()> {
        Self::reject(Operation::UpdateAttributes)
    }
}

#[async_trait]
impl RetrieveAttribute for Unsupported {
    async fn retrieve_attribute(
        &self,
        _id: &str,
        _type: Option<&str>,
        _name: &str,
    ) -> NgsiResult<Attribute> {
        Self::reject(Operation::RetrieveAttribute)
    }
}

#[async_trait]
impl ListSubscriptions for Unsupported {
    async fn list_subscriptions(
        &self,
        _offset: usize,
        _limit: usize,
    ) -> NgsiResult<Paginated<Subscription>> {
        Self::reject(Operation::ListSubscriptions)
    }
}

#[async_trait]
impl CreateSubscription for Unsupported {
    async fn create_subscription(&self, _subscription: Subscription) -> NgsiResult<String> {
        Self::reject(Operation::CreateSubscription)
    }
}

#[async_trait]
impl RetrieveSubscription for Unsupported {
    async fn retrieve_subscription(&self, _id: &str) -> NgsiResult<Subscription> {
        Self::reject(Operation::RetrieveSubscription)
    }
}

#[async_trait]
impl RemoveSubscription for Unsupported {
    async fn remove_subscription(&self, _id: &str) -> NgsiResult<()> {
        Self::reject(Operation::RemoveSubscription)
    }
}

/// Registry holding one handler per operation.
#[derive(Clone)]
pub struct Handlers {
    pub list_entities: Arc<dyn ListEntities>,
    pub create_entity: Arc<dyn CreateEntity>,
    pub retrieve_entity: Arc<dyn RetrieveEntity>,
    pub remove_entity: Arc<dyn RemoveEntity>,
    pub update_attributes: Arc<dyn UpdateAttributes>,
    pub retrieve_attribute: Arc<dyn RetrieveAttribute>,
    pub list_subscriptions: Arc<dyn ListSubscriptions>,
    pub create_subscription: Arc<dyn CreateSubscription>,
    pub retrieve_subscription: Arc<dyn RetrieveSubscription>,
    pub remove_subscription: Arc<dyn RemoveSubscription>,
}

impl Default for Handlers {
    fn default() -> Self {
        Self::unsupported()
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers").finish_non_exhaustive()
    }
}

impl Handlers {
    /// A registry where every operation is unsupported.
    pub fn unsupported() -> Self {
        let unsupported = Arc::new(Unsupported);
        Self {
            list_entities: unsupported.clone(),
            create_entity: unsupported.clone(),
            retrieve_entity: unsupported.clone(),
            remove_entity: unsupported.clone(),
            update_attributes: unsupported.clone(),
            retrieve_attribute: unsupported.clone(),
            list_subscriptions: unsupported.clone(),
            create_subscription: unsupported.clone(),
            retrieve_subscription: unsupported.clone(),
            remove_subscription: unsupported,
        }
    }

    /// Register a backend for every entity operation.
    pub fn with_entity_backend<B>(self, backend: Arc<B>) -> Self
    where
        B: ListEntities
            + CreateEntity
            + RetrieveEntity
            + RemoveEntity
            + UpdateAttributes
            + RetrieveAttribute
            + 'static,
    {
        self.with_list_entities(backend.clone())
            .with_create_entity(backend.clone())
            .with_retrieve_entity(backend.clone())
            .with_remove_entity(backend.clone())
            .with_update_attributes(backend.clone())
            .with_retrieve_attribute(backend)
    }

    /// Register a backend for every subscription operation.
    pub fn with_subscription_backend<B>(self, backend: Arc<B>) -> Self
    where
        B: ListSubscriptions
            + CreateSubscription
            + RetrieveSubscription
            + RemoveSubscription
            + 'static,
    {
        self.with_list_subscriptions(backend.clone())
            .with_create_subscription(backend.clone())
            .with_retrieve_subscription(backend.clone())
            .with_remove_subscription(backend)
    }

    pub fn with_list_entities(mut self, handler: Arc<dyn ListEntities>) -> Self {
        self.list_entities = handler;
        self
    }

    pub fn with_create_entity(mut self, handler: Arc<dyn CreateEntity>) -> Self {
        self.create_entity = handler;
        self
    }

    pub fn with_retrieve_entity(mut self, handler: Arc<dyn RetrieveEntity>) -> Self {
        self.retrieve_entity = handler;
        self
    }

    pub fn with_remove_entity(mut self, handler: Arc<dyn RemoveEntity>) -> Self {
        self.remove_entity = handler;
        self
    }

    pub fn with_update_attributes(mut self, handler: Arc<dyn UpdateAttributes>) -> Self {
        self.update_attributes = handler;
        self
    }

    pub fn with_retrieve_attribute(mut self, handler: Arc<dyn RetrieveAttribute>) -> Self {
        self.retrieve_attribute = handler;
        self
    }

    pub fn with_list_subscriptions(mut self, handler: Arc<dyn ListSubscriptions>) -> Self {
        self.list_subscriptions = handler;
        self
    }

    pub fn with_create_subscription(mut self, handler: Arc<dyn CreateSubscription>) -> Self {
        self.create_subscription = handler;
        self
    }

    pub fn with_retrieve_subscription(mut self, handler: Arc<dyn RetrieveSubscription>) -> Self {
        self.retrieve_subscription = handler;
        self
    }

    pub fn with_remove_subscription(mut self, handler: Arc<dyn RemoveSubscription>) -> Self {
        self.remove_subscription = handler;
        self
    }
}
