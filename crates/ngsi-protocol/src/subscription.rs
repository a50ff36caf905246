//! Subscriptions to entity changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::NgsiError;
use crate::geo::GeoQuery;
use crate::validation::check_exclusive;

/// Lifecycle status of a subscription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Inactive,
    Expired,
    Failed,
}

/// An entity selector in a subscription subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_pattern: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

impl SubjectEntity {
    /// Select a single entity by id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Select entities by id pattern.
    pub fn by_pattern(pattern: impl Into<String>) -> Self {
        Self {
            id_pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Restrict to a type.
    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.type_ = Some(type_.into());
        self
    }
}

/// Filter expression restricting when a notification fires.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Expression {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub georel: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<String>,
}

impl Expression {
    /// Build an expression from a parsed geo-query.
    pub fn from_geo(geo: &GeoQuery) -> Self {
        Self {
            q: None,
            georel: Some(geo.georel()),
            geometry: Some(geo.geometry_param().to_string()),
            coords: Some(geo.coords_param()),
        }
    }

    /// Parse the geo part of the expression, if any.
    pub fn geo(&self) -> Result<Option<GeoQuery>, NgsiError> {
        match (&self.georel, &self.geometry, &self.coords) {
            (None, None, None) => Ok(None),
            (Some(georel), Some(geometry), Some(coords)) => {
                GeoQuery::parse(georel, geometry, coords).map(Some)
            }
            _ => Err(NgsiError::BadRequest(
                "georel, geometry and coords must be used together".to_string(),
            )),
        }
    }
}

/// Condition triggering notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    /// Attributes whose change triggers a notification (empty means any).
    #[serde(default)]
    pub attrs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<Expression>,
}

/// What the subscription watches.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    pub entities: Vec<SubjectEntity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

/// HTTP endpoint receiving notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpTarget {
    pub url: String,
}

/// How notifications are delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub http: HttpTarget,

    /// Attributes included in notifications (empty means all).
    #[serde(default)]
    pub attrs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs_format: Option<String>,

    /// Set by the broker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times_sent: Option<u64>,

    /// Set by the broker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_notification: Option<DateTime<Utc>>,
}

impl Notification {
    /// Notify the given URL with all attributes.
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            http: HttpTarget { url: url.into() },
            attrs: Vec::new(),
            attrs_format: None,
            times_sent: None,
            last_notification: None,
        }
    }
}

/// A subscription to entity changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    /// Assigned by the broker on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub subject: Subject,

    pub notification: Notification,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,

    /// Minimum seconds between two notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttling: Option<u64>,
}

impl Subscription {
    /// Create a subscription for the given entities.
    pub fn new(entities: Vec<SubjectEntity>, notification: Notification) -> Self {
        Self {
            id: None,
            description: None,
            subject: Subject {
                entities,
                condition: None,
            },
            notification,
            expires: None,
            status: None,
            throttling: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the trigger condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.subject.condition = Some(condition);
        self
    }

    /// Set the expiry time.
    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Set the throttling in seconds.
    pub fn with_throttling(mut self, seconds: u64) -> Self {
        self.throttling = Some(seconds);
        self
    }

    /// Validate an incoming subscription.
    pub fn validate(&self) -> Result<(), NgsiError> {
        if self.subject.entities.is_empty() {
            return Err(NgsiError::BadRequest(
                "subject.entities must not be empty".to_string(),
            ));
        }

        for entity in &self.subject.entities {
            check_exclusive(
                "id",
                entity.id.as_deref(),
                "idPattern",
                entity.id_pattern.as_deref(),
            )?;
            if entity.id.is_none() && entity.id_pattern.is_none() {
                return Err(NgsiError::BadRequest(
                    "subject entity needs id or idPattern".to_string(),
                ));
            }
        }

        if let Some(expression) = self
            .subject
            .condition
            .as_ref()
            .and_then(|c| c.expression.as_ref())
        {
            expression.geo()?;
        }

        Ok(())
    }

    /// Check whether the subscription has expired at the given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.map_or(false, |expires| expires <= now)
    }
}
