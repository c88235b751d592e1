pub mod bookings;
pub mod health;
pub mod stations;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route(
            "/bookings/:id",
            get(bookings::get_booking).patch(bookings::update_booking),
        )
        .route("/bookings/:id/policy", get(bookings::get_booking_policy))
        .route(
            "/bookings/availability/:station_id/date/:date",
            get(bookings::get_availability),
        )
        .route(
            "/bookings/status/:id",
            patch(bookings::update_booking_status),
        )
        .route("/bookings/cancel/:id", patch(bookings::cancel_booking))
        .route("/stations/:id", get(stations::get_station))
        .route("/stations/:id/slots", patch(stations::update_station_slots))
        .with_state(state)
}
