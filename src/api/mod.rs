pub mod handlers;
pub mod server;

use crate::core::broker::ServiceBroker;
use crate::domain::ports::ContainerRuntime;
use axum::middleware;
use axum::routing::{get, put};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use server::serve;

pub const CATALOG_PATH: &str = "/v2/catalog";
pub const INSTANCE_PATH: &str = "/v2/service_instances/{instance_id}";
pub const BINDING_PATH: &str = "/v2/service_instances/{instance_id}/service_bindings/{binding_id}";

/// 建立 broker 的 HTTP 路由
pub fn create_router<R: ContainerRuntime + 'static>(broker: Arc<ServiceBroker<R>>) -> Router {
    Router::new()
        .route(CATALOG_PATH, get(handlers::catalog::<R>))
        .route(
            INSTANCE_PATH,
            put(handlers::provision::<R>).delete(handlers::deprovision::<R>),
        )
        .route(
            BINDING_PATH,
            put(handlers::bind::<R>).delete(handlers::unbind::<R>),
        )
        .layer(middleware::from_fn(handlers::log_exchange))
        .layer(TraceLayer::new_for_http())
        .with_state(broker)
}
