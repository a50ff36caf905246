//! NGSI v2 API Service Library
//!
//! This crate provides the HTTP server side of the NGSI v2 context broker
//! protocol: request validation, a registry with one handler per operation,
//! and an in-memory backend.

pub mod config;
pub mod content_negotiation;
pub mod handlers;
pub mod memory;
pub mod operations;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use memory::MemoryBackend;
pub use operations::{Handlers, Operation, Unsupported};
pub use routes::build_router;
pub use state::AppState;
