use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::errors::AppError;
use crate::models::Booking;
use crate::services::aggregation::BookingView;
use crate::services::booking::{self, MembershipPurchase, NewAppointment, NewMembership};
use crate::services::calendar::generate_ics;
use crate::services::cancellation::{self, CancelRequest, CancellationOutcome};
use crate::services::reschedule::{self, RescheduleRequest};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewAppointment>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = booking::book_appointment(
        state.bookings.as_ref(),
        state.payments.as_ref(),
        state.clock.as_ref(),
        &state.config.schedule,
        body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// POST /api/memberships
pub async fn purchase_membership(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewMembership>,
) -> Result<(StatusCode, Json<MembershipPurchase>), AppError> {
    let purchase = booking::purchase_membership(
        state.bookings.as_ref(),
        state.payments.as_ref(),
        state.memberships.as_ref(),
        state.clock.as_ref(),
        state.config.membership_validity_days,
        body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, AppError> {
    let view = booking::get_view(
        state.bookings.as_ref(),
        state.payments.as_ref(),
        state.memberships.as_ref(),
        state.clock.as_ref(),
        &id,
    )
    .await?;
    Ok(Json(view))
}

// GET /api/customers/:customer_id/bookings
pub async fn customer_bookings(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let views = booking::list_for_customer(
        state.bookings.as_ref(),
        state.payments.as_ref(),
        state.memberships.as_ref(),
        state.clock.as_ref(),
        &customer_id,
    )
    .await?;
    Ok(Json(views))
}

// POST /api/bookings/:id/reschedule
pub async fn reschedule_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RescheduleRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = reschedule::reschedule(
        state.bookings.as_ref(),
        state.clock.as_ref(),
        &state.config.schedule,
        &id,
        &body,
    )
    .await?;
    Ok(Json(booking))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CancelRequest>,
) -> Result<Json<CancellationOutcome>, AppError> {
    let outcome = cancellation::cancel(
        state.bookings.as_ref(),
        state.payments.as_ref(),
        state.clock.as_ref(),
        &id,
        &body,
    )
    .await?;
    Ok(Json(outcome))
}

// GET /api/bookings/:id/calendar.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let booking = state
        .bookings
        .find_by_id(&id)
        .await
        .map_err(AppError::into_unavailable)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    let ics = generate_ics(
        &booking,
        &state.config.business_name,
        state.config.schedule.slot_length(),
    )?;
    let filename = format!("booking-{}.ics", booking.code);

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
