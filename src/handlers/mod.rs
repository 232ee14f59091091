pub mod admin;
pub mod bookings;
pub mod health;
pub mod slots;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/slots", get(slots::get_slots))
        .route("/api/bookings", post(bookings::create_booking))
        .route("/api/memberships", post(bookings::purchase_membership))
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route(
            "/api/bookings/:id/calendar.ics",
            get(bookings::download_ics),
        )
        .route(
            "/api/bookings/:id/reschedule",
            post(bookings::reschedule_booking),
        )
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route(
            "/api/customers/:customer_id/bookings",
            get(bookings::customer_bookings),
        )
        .route("/api/admin/bookings", get(admin::list_bookings))
        .route("/api/admin/bookings/:id", delete(admin::delete_booking))
        .route("/api/admin/overview", get(admin::get_overview))
        .route("/api/admin/analytics", get(admin::get_analytics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
