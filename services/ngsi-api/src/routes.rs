//! Router construction.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

/// Build the application router over the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Entry point
        .route("/v2", get(handlers::entry_point::entry_point_handler))
        .route("/v2/", get(handlers::entry_point::entry_point_handler))
        // Entities
        .route(
            "/v2/entities",
            get(handlers::entities::list_entities_handler)
                .post(handlers::entities::create_entity_handler),
        )
        .route(
            "/v2/entities/:id",
            get(handlers::entities::retrieve_entity_handler)
                .delete(handlers::entities::remove_entity_handler),
        )
        .route(
            "/v2/entities/:id/attrs",
            post(handlers::entities::update_attributes_handler),
        )
        .route(
            "/v2/entities/:id/attrs/:attr",
            get(handlers::entities::retrieve_attribute_handler),
        )
        // Subscriptions
        .route(
            "/v2/subscriptions",
            get(handlers::subscriptions::list_subscriptions_handler)
                .post(handlers::subscriptions::create_subscription_handler),
        )
        .route(
            "/v2/subscriptions/:id",
            get(handlers::subscriptions::retrieve_subscription_handler)
                .delete(handlers::subscriptions::remove_subscription_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
