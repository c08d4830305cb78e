use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::AppointmentBookingService;

pub fn appointment_routes(config: Arc<AppConfig>, booking: Arc<AppointmentBookingService>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/with-patient", post(handlers::create_appointment_with_patient))
        .route("/quote", post(handlers::quote_appointment))
        .route("/doctors/{doctor_id}", get(handlers::list_doctor_appointments))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/pay", post(handlers::pay_appointment))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(booking)
}
