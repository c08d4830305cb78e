use std::sync::Arc;
use axum::{middleware, routing::get, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn catalog_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/services", get(list_services).post(create_service))
        .route("/services/{service_id}", get(get_service).put(update_service).delete(delete_service))
        .route("/packages", get(list_packages).post(create_package))
        .route("/packages/{package_id}", get(get_package).delete(delete_package))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
