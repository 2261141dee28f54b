use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::store::traits::AnalyticsStore;

pub fn create_router<S: AnalyticsStore + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Reference data
        .route("/api/stores", get(handlers::list_stores::<S>))
        .route("/api/channels", get(handlers::list_channels::<S>))
        // Dashboards
        .route("/api/summary/daily", get(handlers::daily_summary::<S>))
        .route(
            "/api/products/popular",
            get(handlers::popular_products::<S>),
        )
        .route(
            "/api/analytics/average-ticket",
            get(handlers::average_ticket::<S>),
        )
        .route(
            "/api/analytics/low-margin-products",
            get(handlers::low_margin_products::<S>),
        )
        .route(
            "/api/analytics/delivery-performance",
            get(handlers::delivery_performance::<S>),
        )
        .route(
            "/api/analytics/inactive-customers",
            get(handlers::inactive_customers::<S>),
        )
}

/// Router with state and the CORS policy applied.
pub fn create_app<S: AnalyticsStore + 'static>(store: Arc<S>, cors_permissive: bool) -> Router {
    let cors = if cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };
    create_router::<S>().with_state(store).layer(cors)
}
