//! NGSI v2 Context Broker Protocol
//!
//! This crate provides the types and pure transforms shared by NGSI v2 clients
//! and servers. Nothing in here performs I/O: requests are encoded into query
//! parameters, and completed responses are decoded into typed results.
//!
//! # Components
//!
//! - [`entity`]: entities with open attribute maps and their JSON shape
//! - [`geo`]: the `georel` / `geometry` / `coords` geo-query mini-language
//! - [`query`]: outbound filter and pagination parameters
//! - [`validation`]: serving-side checks on incoming filter parameters
//! - [`responses`]: the wire error body, pagination and response decoding
//! - [`errors`]: the protocol error taxonomy
//! - [`subscription`]: notification subscriptions
//!
//! # Example
//!
//! ```rust
//! use ngsi_protocol::{Attribute, Entity, EntityQuery, GeoQuery};
//!
//! let room = Entity::new("Room1", "Room")
//!     .with_attribute("temperature", Attribute::new(21.7).with_type("Number"))
//!     .unwrap();
//! assert!(room.attribute("temperature").is_some());
//!
//! let geo = GeoQuery::parse("near;maxDistance:1000", "point", "40.41,-3.70").unwrap();
//! let query = EntityQuery::new().with_types(["Room"]).with_geo(geo).with_count(true);
//! assert!(query.to_query_string().contains("options=count"));
//! ```

pub mod entity;
pub mod errors;
pub mod geo;
pub mod query;
pub mod responses;
pub mod subscription;
pub mod validation;

// Re-export commonly used types
pub use entity::{Attribute, Entity, Metadata};
pub use errors::{NgsiError, NgsiResult};
pub use geo::{Coordinate, GeoQuery, Geometry, Modifier, Relation};
pub use query::EntityQuery;
pub use responses::{EntryPoint, ErrorBody, Paginated, RawResponse, ResponseError};
pub use subscription::{Subscription, SubscriptionStatus};
pub use validation::EntityParams;

/// Name of the response header carrying the total number of matching items.
pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// Media types used in NGSI v2 requests and responses
pub mod media_types {
    /// JSON media type
    pub const JSON: &str = "application/json";
    /// Plain text media type (attribute values)
    pub const TEXT_PLAIN: &str = "text/plain";
}
