//! NGSI v2 Client
//!
//! An async client for NGSI v2 context brokers. Requests are encoded with
//! [`ngsi_protocol::EntityQuery`] and responses decoded with
//! [`ngsi_protocol::RawResponse`]; this crate only adds the HTTP transport.
//!
//! # Example
//!
//! ```rust,no_run
//! use ngsi_client::{ClientConfig, NgsiClient};
//! use ngsi_protocol::EntityQuery;
//!
//! # async fn run() -> Result<(), ngsi_client::ClientError> {
//! let client = NgsiClient::new(ClientConfig::new("http://localhost:1026"))?;
//! let rooms = client
//!     .list_entities(&EntityQuery::new().with_types(["Room"]).with_count(true))
//!     .await?;
//! println!("{} of {} rooms", rooms.len(), rooms.total);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::NgsiClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
