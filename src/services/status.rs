use chrono::NaiveDateTime;

use crate::models::{
    Booking, BookingKind, BookingStatus, DisplayStatus, Membership, MembershipStatus, Payment,
    PaymentStatus,
};

/// Computes the lifecycle label of `booking` as of `now`.
///
/// Appointments, first match wins:
/// 1. stored `cancelled`;
/// 2. scheduled instant at or before `now` is `completed`;
/// 3. stored `confirmed`, or a succeeded payment, is `confirmed`;
/// 4. stored `pending`;
/// 5. otherwise `upcoming`.
///
/// Membership purchases follow the membership's own status instead of the calendar.
pub fn derive_status(
    booking: &Booking,
    payment: Option<&Payment>,
    membership: Option<&Membership>,
    now: NaiveDateTime,
) -> DisplayStatus {
    if booking.status == BookingStatus::Cancelled {
        return DisplayStatus::Cancelled;
    }

    match &booking.kind {
        BookingKind::Appointment { date, time } => {
            if date.and_time(time.as_naive()) <= now {
                return DisplayStatus::Completed;
            }
            let paid = payment.is_some_and(|p| p.status == PaymentStatus::Succeeded);
            match booking.status {
                BookingStatus::Confirmed => DisplayStatus::Confirmed,
                _ if paid => DisplayStatus::Confirmed,
                BookingStatus::Pending => DisplayStatus::Pending,
                _ => DisplayStatus::Upcoming,
            }
        }
        BookingKind::MembershipPurchase { .. } => match membership {
            Some(m) => match m.effective_status(now.date()) {
                MembershipStatus::Active => DisplayStatus::Active,
                MembershipStatus::Expired => DisplayStatus::Expired,
                MembershipStatus::Cancelled => DisplayStatus::Cancelled,
            },
            None if booking.status == BookingStatus::Pending => DisplayStatus::Pending,
            None => DisplayStatus::Active,
        },
    }
}
