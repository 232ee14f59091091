use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::booking::generate_code;
use crate::models::{
    Booking, BookingKind, BookingStatus, Membership, MembershipStatus, Payment, PaymentStatus,
    SlotSchedule,
};
use crate::services::aggregation::{attach_details, BookingView};
use crate::services::clock::Clock;
use crate::services::reschedule::{ensure_not_past, parse_slot_request};
use crate::store::{BookingFilter, BookingStore, MembershipLookup, PaymentLookup};

fn default_payment_method() -> String {
    "card".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub service_name: String,
    pub category: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub amount_cents: i64,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMembership {
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub package_name: String,
    pub sessions: i64,
    pub amount_cents: i64,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipPurchase {
    pub booking: Booking,
    pub membership: Membership,
}

/// Upper bound for a single charge: one million in the currency's major unit.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000;

fn check_amount(amount_cents: i64) -> Result<(), AppError> {
    if amount_cents < 0 {
        return Err(AppError::Validation("amount cannot be negative".to_string()));
    }
    if amount_cents > MAX_AMOUNT_CENTS {
        return Err(AppError::Validation(format!(
            "amount exceeds the {MAX_AMOUNT_CENTS} cent limit"
        )));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Records a paid appointment. Called once the payment provider has captured the charge.
pub async fn book_appointment(
    store: &dyn BookingStore,
    payments: &dyn PaymentLookup,
    clock: &dyn Clock,
    schedule: &SlotSchedule,
    request: NewAppointment,
) -> Result<Booking, AppError> {
    require("customer_id", &request.customer_id)?;
    require("service_name", &request.service_name)?;
    check_amount(request.amount_cents)?;
    let (date, time) =
        parse_slot_request(schedule, request.date.as_deref(), request.time.as_deref())?;
    let now = clock.now();
    ensure_not_past(date, time, now)?;

    let occupied = store
        .occupied_times(date, None)
        .await
        .map_err(AppError::into_unavailable)?;
    if occupied.contains(&time) {
        return Err(AppError::SlotTaken {
            date: date.to_string(),
            time: time.to_string(),
        });
    }

    let payment = payments
        .record_payment(Payment {
            id: new_id(),
            amount_cents: request.amount_cents,
            method: request.payment_method,
            status: PaymentStatus::Succeeded,
        })
        .await
        .map_err(AppError::into_unavailable)?;

    let booking = Booking {
        id: new_id(),
        code: generate_code(),
        customer_id: request.customer_id,
        customer_name: request.customer_name,
        service_name: request.service_name,
        category: request.category,
        kind: BookingKind::Appointment { date, time },
        amount_cents: request.amount_cents,
        payment_id: Some(payment.id.clone()),
        status: BookingStatus::Confirmed,
        cancellation: None,
        created_at: now,
        updated_at: now,
    };

    let booking = match store.create(booking).await {
        Ok(booking) => booking,
        Err(e) => {
            // The slot went between the check and the insert.
            tracing::warn!(payment_id = %payment.id, error = %e, "booking insert failed after payment was recorded");
            return Err(e.into_unavailable());
        }
    };

    tracing::info!(
        booking_id = %booking.id,
        code = %booking.code,
        %date,
        %time,
        "appointment booked"
    );
    Ok(booking)
}

pub async fn purchase_membership(
    store: &dyn BookingStore,
    payments: &dyn PaymentLookup,
    memberships: &dyn MembershipLookup,
    clock: &dyn Clock,
    validity_days: i64,
    request: NewMembership,
) -> Result<MembershipPurchase, AppError> {
    require("customer_id", &request.customer_id)?;
    require("package_name", &request.package_name)?;
    if request.sessions <= 0 {
        return Err(AppError::Validation("sessions must be positive".to_string()));
    }
    check_amount(request.amount_cents)?;

    let now = clock.now();
    let start_date = now.date();
    let end_date = Duration::try_days(validity_days)
        .and_then(|validity| start_date.checked_add_signed(validity))
        .filter(|end| *end > start_date)
        .ok_or_else(|| {
            AppError::Validation(format!("membership validity of {validity_days} days is out of range"))
        })?;

    let payment = payments
        .record_payment(Payment {
            id: new_id(),
            amount_cents: request.amount_cents,
            method: request.payment_method,
            status: PaymentStatus::Succeeded,
        })
        .await
        .map_err(AppError::into_unavailable)?;

    let membership = memberships
        .record_membership(Membership {
            id: new_id(),
            customer_id: request.customer_id.clone(),
            package_name: request.package_name.clone(),
            start_date,
            end_date,
            sessions: request.sessions,
            remaining_sessions: request.sessions,
            status: MembershipStatus::Active,
        })
        .await
        .map_err(AppError::into_unavailable)?;

    let created = store
        .create(Booking {
            id: new_id(),
            code: generate_code(),
            customer_id: request.customer_id,
            customer_name: request.customer_name,
            service_name: request.package_name,
            category: Some("membership".to_string()),
            kind: BookingKind::MembershipPurchase {
                membership_id: membership.id.clone(),
            },
            amount_cents: request.amount_cents,
            payment_id: Some(payment.id.clone()),
            status: BookingStatus::Confirmed,
            cancellation: None,
            created_at: now,
            updated_at: now,
        })
        .await;
    let booking = match created {
        Ok(booking) => booking,
        Err(e) => {
            tracing::warn!(
                payment_id = %payment.id,
                membership_id = %membership.id,
                error = %e,
                "membership booking insert failed after payment and membership were recorded"
            );
            return Err(e.into_unavailable());
        }
    };

    tracing::info!(
        booking_id = %booking.id,
        membership_id = %membership.id,
        "membership purchased"
    );
    Ok(MembershipPurchase {
        booking,
        membership,
    })
}

/// Bookings matching `filter`, joined with payment and membership details.
pub async fn list_views(
    store: &dyn BookingStore,
    payments: &dyn PaymentLookup,
    memberships: &dyn MembershipLookup,
    clock: &dyn Clock,
    filter: &BookingFilter,
) -> Result<Vec<BookingView>, AppError> {
    let bookings = store
        .find(filter)
        .await
        .map_err(AppError::into_unavailable)?;
    Ok(attach_details(bookings, payments, memberships, clock.now()).await)
}

/// A customer's booking history, newest first.
pub async fn list_for_customer(
    store: &dyn BookingStore,
    payments: &dyn PaymentLookup,
    memberships: &dyn MembershipLookup,
    clock: &dyn Clock,
    customer_id: &str,
) -> Result<Vec<BookingView>, AppError> {
    require("customer_id", customer_id)?;
    let filter = BookingFilter {
        customer_id: Some(customer_id.to_string()),
        ..Default::default()
    };
    list_views(store, payments, memberships, clock, &filter).await
}

pub async fn get_view(
    store: &dyn BookingStore,
    payments: &dyn PaymentLookup,
    memberships: &dyn MembershipLookup,
    clock: &dyn Clock,
    booking_id: &str,
) -> Result<BookingView, AppError> {
    let booking = store
        .find_by_id(booking_id)
        .await
        .map_err(AppError::into_unavailable)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    attach_details(vec![booking], payments, memberships, clock.now())
        .await
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
}

/// Permanently removes a booking. Admin only; customers cancel instead.
pub async fn delete_booking(store: &dyn BookingStore, booking_id: &str) -> Result<(), AppError> {
    let removed = store
        .delete_by_id(booking_id)
        .await
        .map_err(AppError::into_unavailable)?;
    if !removed {
        return Err(AppError::NotFound(format!("booking {booking_id}")));
    }
    tracing::info!(booking_id, "booking deleted");
    Ok(())
}
