use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::{appointment_routes, AppointmentBookingService};
use catalog_cell::router::catalog_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;

pub fn create_router(config: Arc<AppConfig>, booking: Arc<AppointmentBookingService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic API is running!" }))
        .nest("/doctors", doctor_routes(config.clone()))
        .nest("/patients", patient_routes(config.clone()))
        .nest("/catalog", catalog_routes(config.clone()))
        .nest("/appointments", appointment_routes(config, booking))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Arc::new(AppConfig::default());
        let booking = Arc::new(AppointmentBookingService::from_config(&config));
        create_router(config, booking)
    }

    #[tokio::test]
    async fn test_liveness_route_is_public() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cell_routes_are_guarded() {
        for uri in ["/doctors", "/patients", "/catalog/services", "/appointments/quote"] {
            let method = if uri.ends_with("quote") { "POST" } else { "GET" };
            let response = app()
                .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} should need a token", uri);
        }
    }
}
